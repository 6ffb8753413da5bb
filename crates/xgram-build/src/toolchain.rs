//! External collaborators: static analysis, bundling and export loading.
//!
//! The pipeline only talks to these through the [`StaticChecker`],
//! [`Bundler`] and [`ExportLoader`] traits. The process-backed
//! implementations here drive `npm`/`tsc`, esbuild and node.

use std::ffi::OsStr;
use std::future::Future;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use xgram_exports::ModuleExports;

use crate::artifact::{Artifact, ArtifactMap, BundleInput};
use crate::config::ToolchainConfig;
use crate::error::{BuildError, Result, StaticCheck};

/// Runs one external static-analysis pass in the project root.
pub trait StaticChecker: Send + Sync {
    fn check(&self, root: &Path, check: StaticCheck) -> impl Future<Output = Result<()>> + Send;
}

/// Compiles module sources into standalone artifacts.
pub trait Bundler: Send + Sync {
    /// Compile every input in one invocation, one artifact per input.
    fn bundle_modules(
        &self,
        root: &Path,
        inputs: &[BundleInput],
        out_dir: &Path,
    ) -> impl Future<Output = Result<ArtifactMap>> + Send;

    /// Compile a single entry source into `outfile`.
    fn bundle_entry(
        &self,
        root: &Path,
        entry: &Path,
        outfile: &Path,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Imports a compiled artifact and reports its exported bindings.
pub trait ExportLoader: Send + Sync {
    fn load(&self, artifact: &Path) -> impl Future<Output = Result<ModuleExports>> + Send;
}

/// A configured program plus its leading arguments.
#[derive(Debug, Clone)]
struct ToolCommand {
    argv: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    fn new(argv: Vec<String>, timeout: Option<Duration>) -> Self {
        Self { argv, timeout }
    }

    fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// Run to completion, capturing stdout and stderr.
    ///
    /// Spawn failures surface as [`BuildError::Io`]; the child is killed if
    /// the timeout elapses.
    async fn output<I, S>(&self, extra: I, cwd: &Path) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command").into());
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .args(extra)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(program = %program, cwd = %cwd.display(), "running external tool");

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| BuildError::Timeout {
                    tool: program.clone(),
                    secs: limit.as_secs(),
                })??,
            None => command.output().await?,
        };
        Ok(output)
    }
}

/// Stdout followed by stderr, lossily decoded.
fn combined_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}

/// Runs the configured lint and type-check commands.
#[derive(Debug, Clone)]
pub struct ProcessStaticChecker {
    lint: ToolCommand,
    type_check: ToolCommand,
}

impl ProcessStaticChecker {
    pub fn new(config: &ToolchainConfig) -> Self {
        Self {
            lint: ToolCommand::new(config.lint.clone(), config.timeout()),
            type_check: ToolCommand::new(config.type_check.clone(), config.timeout()),
        }
    }
}

impl StaticChecker for ProcessStaticChecker {
    async fn check(&self, root: &Path, check: StaticCheck) -> Result<()> {
        let tool = match check {
            StaticCheck::Lint => &self.lint,
            StaticCheck::TypeCheck => &self.type_check,
        };

        let output = match tool.output(std::iter::empty::<&str>(), root).await {
            Ok(output) => output,
            Err(BuildError::Io(e)) => {
                return Err(BuildError::StaticCheckFailed {
                    check,
                    output: format!("failed to run {}: {}", tool.program(), e),
                });
            }
            Err(e) => return Err(e),
        };

        if output.status.success() {
            Ok(())
        } else {
            Err(BuildError::StaticCheckFailed {
                check,
                output: combined_output(&output),
            })
        }
    }
}

/// Bundles with esbuild: ESM for node, `.mjs` outputs, packages left external.
#[derive(Debug, Clone)]
pub struct EsbuildBundler {
    command: ToolCommand,
}

impl EsbuildBundler {
    pub fn new(config: &ToolchainConfig) -> Self {
        Self {
            command: ToolCommand::new(config.bundler.clone(), config.timeout()),
        }
    }

    fn shared_args() -> [&'static str; 7] {
        [
            "--bundle",
            "--format=esm",
            "--platform=node",
            "--packages=external",
            "--minify",
            "--keep-names",
            "--log-level=error",
        ]
    }

    async fn run(&self, root: &Path, args: Vec<String>) -> Result<()> {
        let output = match self.command.output(&args, root).await {
            Ok(output) => output,
            Err(BuildError::Io(e)) => {
                return Err(BuildError::compile(format!(
                    "failed to run {}: {}",
                    self.command.program(),
                    e
                )));
            }
            Err(e) => return Err(e),
        };

        if output.status.success() {
            Ok(())
        } else {
            Err(BuildError::compile(combined_output(&output)))
        }
    }
}

impl Bundler for EsbuildBundler {
    async fn bundle_modules(
        &self,
        root: &Path,
        inputs: &[BundleInput],
        out_dir: &Path,
    ) -> Result<ArtifactMap> {
        if inputs.is_empty() {
            return Ok(ArtifactMap::new());
        }
        tokio::fs::create_dir_all(out_dir).await?;

        let mut args: Vec<String> = inputs
            .iter()
            .map(|input| format!("{}={}", input.id, input.module.path.display()))
            .collect();
        args.extend(Self::shared_args().map(String::from));
        args.push(format!("--outdir={}", out_dir.display()));
        args.push("--out-extension:.js=.mjs".to_string());

        self.run(root, args).await?;

        inputs
            .iter()
            .map(|input| {
                let path = out_dir.join(format!("{}.mjs", input.id));
                if path.is_file() {
                    Ok(Artifact::new(input, path))
                } else {
                    Err(BuildError::compile(format!(
                        "no output was produced for {}",
                        input.module.display_path
                    )))
                }
            })
            .collect()
    }

    async fn bundle_entry(&self, root: &Path, entry: &Path, outfile: &Path) -> Result<()> {
        if let Some(parent) = outfile.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut args = vec![entry.display().to_string()];
        args.extend(Self::shared_args().map(String::from));
        args.push(format!("--outfile={}", outfile.display()));

        self.run(root, args).await?;

        if outfile.is_file() {
            Ok(())
        } else {
            Err(BuildError::compile(format!(
                "no output was produced at {}",
                outfile.display()
            )))
        }
    }
}

/// Prefix of the stdout line carrying the export description.
const EXPORTS_SENTINEL: &str = "__XGRAM_EXPORTS__";

/// Imports the artifact given as the first argument and describes its exports.
const EXPORT_PROBE: &str = r#"
import { pathToFileURL } from "node:url";

const tagged = type => ({ $xgramTypeof: type });

// Plain-data view of an object graph. Values JSON cannot carry and
// back-references become tagged placeholders instead of being dropped.
const encode = (value, ancestors) => {
    switch (typeof value) {
        case "string":
        case "boolean":
            return value;
        case "number":
            return Number.isFinite(value) ? value : tagged("number");
        case "object": {
            if (value === null) {
                return null;
            }
            if (ancestors.includes(value)) {
                return tagged("circular");
            }
            const path = [...ancestors, value];
            if (Array.isArray(value)) {
                return Array.from(value, item => encode(item, path));
            }
            const entries = Object.entries(value).map(([key, item]) => [key, encode(item, path)]);
            for (const symbol of Object.getOwnPropertySymbols(value)) {
                entries.push([String(symbol), encode(value[symbol], path)]);
            }
            return Object.fromEntries(entries);
        }
        default:
            return tagged(typeof value);
    }
};

const describe = value => {
    const type = typeof value;
    switch (type) {
        case "function":
            return { type, value: value.name || null };
        case "symbol":
            return { type, value: value.description ?? null };
        case "bigint":
            return { type, value: value.toString() };
        case "number":
            return { type, value: Number.isFinite(value) ? value : null };
        case "undefined":
            return { type };
        case "object":
            return { type, value: encode(value, []) };
        default:
            return { type, value };
    }
};

const mod = await import(pathToFileURL(process.argv[1]).href);
const described = Object.fromEntries(Object.entries(mod).map(([key, value]) => [key, describe(value)]));
process.stdout.write("\n__XGRAM_EXPORTS__" + JSON.stringify(described) + "\n", () => process.exit(0));
"#;

/// Loads artifacts in a node subprocess.
#[derive(Debug, Clone)]
pub struct NodeExportLoader {
    node: ToolCommand,
}

impl NodeExportLoader {
    pub fn new(config: &ToolchainConfig) -> Self {
        Self {
            node: ToolCommand::new(vec![config.node.clone()], config.timeout()),
        }
    }
}

impl ExportLoader for NodeExportLoader {
    async fn load(&self, artifact: &Path) -> Result<ModuleExports> {
        let cwd = artifact.parent().unwrap_or(Path::new("."));
        let args = [
            OsStr::new("--input-type=module"),
            OsStr::new("--eval"),
            OsStr::new(EXPORT_PROBE),
            artifact.as_os_str(),
        ];

        let output = match self.node.output(args, cwd).await {
            Ok(output) => output,
            Err(BuildError::Io(e)) => {
                return Err(BuildError::load(
                    artifact,
                    format!("failed to run {}: {}", self.node.program(), e),
                ));
            }
            Err(e) => return Err(e),
        };

        if !output.status.success() {
            return Err(BuildError::load(artifact, combined_output(&output).trim()));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
            .map_err(|reason| BuildError::load(artifact, reason))
    }
}

/// Extract the export description from the probe's stdout.
///
/// The module may print during import, so only the last sentinel line counts.
fn parse_probe_output(stdout: &str) -> std::result::Result<ModuleExports, String> {
    let line = stdout
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(EXPORTS_SENTINEL))
        .ok_or_else(|| "the loader produced no export description".to_string())?;
    ModuleExports::from_json(line).map_err(|e| format!("malformed export description: {}", e))
}
