/// Build driver that orchestrates the production pipeline
///
/// Stages run strictly in sequence; the first failure aborts the build.
/// Export validation is the only stage that fans out, validating every
/// command artifact concurrently before joining.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use xgram_exports::command_contract;

use crate::artifact::{ArtifactMap, BundleInput};
use crate::config::{BuildConfig, BuildOptions};
use crate::declaration::CommandDeclaration;
use crate::error::{BuildError, Result, StageFailure, StaticCheck};
use crate::progress::{SilentObserver, StageObserver};
use crate::project::{Category, Project, StructureMapper};
use crate::synth::{self, SKELETON};
use crate::toolchain::{
    Bundler, EsbuildBundler, ExportLoader, NodeExportLoader, ProcessStaticChecker, StaticChecker,
};

/// Hidden build-scratch directory under the project root.
pub const SCRATCH_DIR: &str = ".xgram";

/// A named step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Map,
    StaticCheck,
    Compile,
    ValidateExports,
    CollectDeclarations,
    Synthesize,
    MergeCompile,
    Cleanup,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 8] = [
        Stage::Map,
        Stage::StaticCheck,
        Stage::Compile,
        Stage::ValidateExports,
        Stage::CollectDeclarations,
        Stage::Synthesize,
        Stage::MergeCompile,
        Stage::Cleanup,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Stage::Map => "Mapping project structure",
            Stage::StaticCheck => "Linting code and validating types",
            Stage::Compile => "Bundling TypeScript",
            Stage::ValidateExports => "Validating module exports",
            Stage::CollectDeclarations => "Collecting command declarations",
            Stage::Synthesize => "Generating entry point",
            Stage::MergeCompile => "Bundling production artifact",
            Stage::Cleanup => "Cleaning up",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Where a build writes its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    pub scratch: PathBuf,
    /// Per-module artifacts
    pub dist: PathBuf,
    /// Synthesized entry source
    pub entry: PathBuf,
    /// Final merged artifact
    pub output: PathBuf,
    /// Build metadata manifest
    pub manifest: PathBuf,
}

impl BuildLayout {
    pub fn new(root: &Path) -> Self {
        let scratch = root.join(SCRATCH_DIR);
        Self {
            dist: scratch.join("dist"),
            entry: scratch.join("virtual-index.ts"),
            output: scratch.join("out").join("index.mjs"),
            manifest: scratch.join("build.json"),
            scratch,
        }
    }
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Final merged artifact
    pub artifact: PathBuf,
    /// Build metadata manifest
    pub manifest: PathBuf,
    /// Declarations wired into the artifact, in command order
    pub commands: Vec<CommandDeclaration>,
}

/// Mutable state threaded through the stages of one build.
///
/// Each field is filled by the stage that produces it; stages only run in
/// [`Stage::ALL`] order, so later stages always see the earlier results.
#[derive(Debug, Default)]
struct BuildContext {
    project: Project,
    artifacts: ArtifactMap,
    declarations: Vec<CommandDeclaration>,
}

#[derive(Serialize)]
struct BuildManifest<'a> {
    artifact: String,
    commands: &'a [CommandDeclaration],
}

/// The X-Gram production build pipeline
pub struct Pipeline<C, B, L> {
    options: BuildOptions,
    layout: BuildLayout,
    mapper: StructureMapper,
    checker: C,
    bundler: B,
    loader: Arc<L>,
    observer: Box<dyn StageObserver>,
}

impl Pipeline<ProcessStaticChecker, EsbuildBundler, NodeExportLoader> {
    /// Pipeline backed by the configured external tools.
    pub fn from_config(options: BuildOptions, config: &BuildConfig) -> Self {
        Pipeline::new(
            options,
            ProcessStaticChecker::new(&config.toolchain),
            EsbuildBundler::new(&config.toolchain),
            NodeExportLoader::new(&config.toolchain),
        )
        .with_mapper(StructureMapper::new(config.project.extensions.clone()))
    }
}

impl<C, B, L> Pipeline<C, B, L>
where
    C: StaticChecker,
    B: Bundler,
    L: ExportLoader + 'static,
{
    pub fn new(options: BuildOptions, checker: C, bundler: B, loader: L) -> Self {
        let layout = BuildLayout::new(&options.root);
        Self {
            options,
            layout,
            mapper: StructureMapper::default(),
            checker,
            bundler,
            loader: Arc::new(loader),
            observer: Box::new(SilentObserver),
        }
    }

    pub fn with_mapper(mut self, mapper: StructureMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_observer(mut self, observer: impl StageObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    /// Run every stage in order.
    ///
    /// Intermediate artifacts are removed whether or not the build succeeds,
    /// unless `keep_scratch` is set.
    pub async fn run(&self) -> std::result::Result<BuildOutput, StageFailure> {
        let mut ctx = BuildContext::default();

        for stage in Stage::ALL {
            self.observer.stage_started(stage);
            tracing::info!(stage = ?stage, "{}", stage.title());

            if let Err(source) = self.run_stage(stage, &mut ctx).await {
                tracing::error!(stage = ?stage, error = %source, "build stage failed");
                self.observer.stage_failed(stage, &source);
                self.discard_intermediates();
                return Err(StageFailure { stage, source });
            }

            self.observer.stage_finished(stage);
        }

        Ok(BuildOutput {
            artifact: self.layout.output.clone(),
            manifest: self.layout.manifest.clone(),
            commands: ctx.declarations,
        })
    }

    async fn run_stage(&self, stage: Stage, ctx: &mut BuildContext) -> Result<()> {
        match stage {
            Stage::Map => self.map(ctx),
            Stage::StaticCheck => self.static_check().await,
            Stage::Compile => self.compile(ctx).await,
            Stage::ValidateExports => self.validate_exports(ctx).await,
            Stage::CollectDeclarations => self.collect_declarations(ctx).await,
            Stage::Synthesize => self.synthesize(ctx).await,
            Stage::MergeCompile => self.merge_compile(ctx).await,
            Stage::Cleanup => self.cleanup().await,
        }
    }

    fn map(&self, ctx: &mut BuildContext) -> Result<()> {
        let project = self.mapper.map(&self.options.root)?;
        if self.options.verbose {
            for command in &project.commands {
                tracing::info!(name = %command.name, path = %command.display_path, "discovered command");
            }
        }
        ctx.project = project;
        Ok(())
    }

    async fn static_check(&self) -> Result<()> {
        self.checker.check(&self.options.root, StaticCheck::Lint).await?;
        self.checker.check(&self.options.root, StaticCheck::TypeCheck).await
    }

    async fn compile(&self, ctx: &mut BuildContext) -> Result<()> {
        let inputs = BundleInput::for_project(&ctx.project);

        remove_dir_if_exists(&self.layout.dist).await?;
        ctx.artifacts = self
            .bundler
            .bundle_modules(&self.options.root, &inputs, &self.layout.dist)
            .await?;

        tracing::debug!(artifacts = ctx.artifacts.len(), "compiled modules");
        Ok(())
    }

    /// Load and validate every command artifact concurrently.
    ///
    /// The first failure aborts the remaining validations.
    async fn validate_exports(&self, ctx: &BuildContext) -> Result<()> {
        let contract = command_contract();

        let mut join_set = JoinSet::new();
        for artifact in ctx.artifacts.in_category(Category::Commands) {
            let loader = Arc::clone(&self.loader);
            let path = artifact.path.clone();
            let display_path = artifact.display_path.clone();

            join_set.spawn(async move {
                let exports = loader.load(&path).await?;
                contract.validate(&exports, &display_path)?;
                tracing::debug!(module = %display_path, "exports match the command contract");
                Ok::<(), BuildError>(())
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let outcome = joined.map_err(|e| BuildError::Task(e.to_string())).and_then(|r| r);
            if let Err(e) = outcome {
                join_set.abort_all();
                return Err(e);
            }
        }

        Ok(())
    }

    async fn collect_declarations(&self, ctx: &mut BuildContext) -> Result<()> {
        let mut declarations = Vec::new();
        for artifact in ctx.artifacts.in_category(Category::Commands) {
            let exports = self.loader.load(&artifact.path).await?;
            let declaration = CommandDeclaration::collect(artifact, &exports)?;
            tracing::debug!(
                trigger = %declaration.trigger,
                prefix = %declaration.prefix,
                "collected command"
            );
            declarations.push(declaration);
        }
        ctx.declarations = declarations;
        Ok(())
    }

    async fn synthesize(&self, ctx: &BuildContext) -> Result<()> {
        let source = synth::synthesize(
            SKELETON,
            &self.layout.scratch,
            &ctx.artifacts,
            &ctx.declarations,
        )?;

        tokio::fs::create_dir_all(&self.layout.scratch).await?;
        tokio::fs::write(&self.layout.entry, source).await?;
        Ok(())
    }

    async fn merge_compile(&self, ctx: &BuildContext) -> Result<()> {
        self.bundler
            .bundle_entry(&self.options.root, &self.layout.entry, &self.layout.output)
            .await?;

        let artifact = self
            .layout
            .output
            .strip_prefix(&self.options.root)
            .unwrap_or(&self.layout.output)
            .to_string_lossy()
            .replace('\\', "/");
        let manifest = BuildManifest {
            artifact,
            commands: &ctx.declarations,
        };
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| BuildError::codegen(format!("build manifest: {}", e)))?;
        tokio::fs::write(&self.layout.manifest, json).await?;
        Ok(())
    }

    async fn cleanup(&self) -> Result<()> {
        if self.options.keep_scratch {
            return Ok(());
        }
        remove_dir_if_exists(&self.layout.dist).await?;
        remove_file_if_exists(&self.layout.entry).await?;
        Ok(())
    }

    /// Best-effort removal of intermediates after a failed stage.
    fn discard_intermediates(&self) {
        if self.options.keep_scratch {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.layout.dist) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.layout.dist.display(), error = %e, "could not remove artifacts");
            }
        }
        if let Err(e) = std::fs::remove_file(&self.layout.entry) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.layout.entry.display(), error = %e, "could not remove entry source");
            }
        }
    }
}

async fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_lives_under_scratch_dir() {
        let layout = BuildLayout::new(Path::new("/bot"));

        assert_eq!(layout.scratch, PathBuf::from("/bot/.xgram"));
        assert_eq!(layout.dist, PathBuf::from("/bot/.xgram/dist"));
        assert_eq!(layout.entry, PathBuf::from("/bot/.xgram/virtual-index.ts"));
        assert_eq!(layout.output, PathBuf::from("/bot/.xgram/out/index.mjs"));
        assert_eq!(layout.manifest, PathBuf::from("/bot/.xgram/build.json"));
    }

    #[test]
    fn test_unmapped_context_has_no_inputs() {
        let ctx = BuildContext::default();
        assert!(BundleInput::for_project(&ctx.project).is_empty());
        assert!(ctx.artifacts.is_empty());
    }

    #[test]
    fn test_stage_titles() {
        assert_eq!(Stage::Map.to_string(), "Mapping project structure");
        assert_eq!(Stage::ALL.first(), Some(&Stage::Map));
        assert_eq!(Stage::ALL.last(), Some(&Stage::Cleanup));
    }
}
