/// X-Gram build pipeline
///
/// Discovers the modules of a convention-laid-out bot project, bundles and
/// validates each one, then synthesizes and bundles a single entry point
/// that wires every command into the bot runtime.

pub mod artifact;
pub mod config;
pub mod declaration;
pub mod driver;
pub mod error;
pub mod progress;
pub mod project;
pub mod synth;
pub mod toolchain;

pub use artifact::{Artifact, ArtifactMap, BundleInput};
pub use config::{BuildConfig, BuildOptions, ProjectConfig, ToolchainConfig};
pub use declaration::{CommandDeclaration, HandlerRef};
pub use driver::{BuildLayout, BuildOutput, Pipeline, Stage};
pub use error::{BuildError, Result, StageFailure, StaticCheck};
pub use progress::{SilentObserver, SpinnerObserver, StageObserver};
pub use project::{map_project, Category, ModuleDescriptor, Project, StructureMapper};
pub use synth::{synthesize, EntryModule};
pub use toolchain::{
    Bundler, EsbuildBundler, ExportLoader, NodeExportLoader, ProcessStaticChecker, StaticChecker,
};
