//! Build options and the optional `xgram.toml` project file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{BuildError, Result};

/// Project-level configuration file, looked up in the project root.
pub const CONFIG_FILE: &str = "xgram.toml";

/// Options for one build invocation.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Project root containing `src/`
    pub root: PathBuf,
    /// Leave intermediate artifacts in the scratch directory
    pub keep_scratch: bool,
    /// Whether to log per-module progress
    pub verbose: bool,
}

impl BuildOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            keep_scratch: false,
            verbose: false,
        }
    }

    pub fn keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Contents of `xgram.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub project: ProjectConfig,
    pub toolchain: ToolchainConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// File name suffixes that mark a module source
    pub extensions: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".ts".to_string()],
        }
    }
}

/// Commands used for the external collaborators.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    pub lint: Vec<String>,
    pub type_check: Vec<String>,
    pub bundler: Vec<String>,
    pub node: String,
    /// Upper bound for every external process; unbounded when absent
    pub timeout_secs: Option<u64>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            lint: vec!["npm".into(), "run".into(), "lint".into()],
            type_check: vec!["npx".into(), "tsc".into(), "--noEmit".into()],
            bundler: vec!["npx".into(), "esbuild".into()],
            node: "node".to_string(),
            timeout_secs: None,
        }
    }
}

impl ToolchainConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl BuildConfig {
    /// Load `<root>/xgram.toml`, falling back to defaults when it is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)?;
        Self::parse(&text).map_err(|message| BuildError::Config { path, message })
    }

    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let config: Self = toml::from_str(text).map_err(|e| e.to_string())?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> std::result::Result<(), String> {
        let commands = [
            ("toolchain.lint", &self.toolchain.lint),
            ("toolchain.type_check", &self.toolchain.type_check),
            ("toolchain.bundler", &self.toolchain.bundler),
        ];
        for (name, command) in commands {
            if command.is_empty() {
                return Err(format!("{} must name a program", name));
            }
        }
        if self.project.extensions.iter().any(|ext| ext.is_empty()) {
            return Err("project.extensions must not contain empty suffixes".to_string());
        }
        Ok(())
    }
}
