/// Error types for the X-Gram build pipeline

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use xgram_exports::ExportMismatch;

use crate::driver::Stage;

pub type Result<T> = std::result::Result<T, BuildError>;

/// Which external static-analysis pass failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticCheck {
    Lint,
    TypeCheck,
}

impl StaticCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaticCheck::Lint => "lint",
            StaticCheck::TypeCheck => "type check",
        }
    }

    /// Stage-specific message shown when this pass fails.
    pub fn failure_message(&self) -> &'static str {
        match self {
            StaticCheck::Lint => "Linting failed",
            StaticCheck::TypeCheck => "Type validation failed",
        }
    }
}

impl fmt::Display for StaticCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Expected path {0} was not found")]
    StructurePathNotFound(String),

    #[error("Duplicate {category} module name '{name}': {first} and {second}")]
    DuplicateModule {
        category: String,
        name: String,
        first: String,
        second: String,
    },

    #[error("{}", .check.failure_message())]
    StaticCheckFailed { check: StaticCheck, output: String },

    #[error(transparent)]
    ExportTypeMismatch(#[from] ExportMismatch),

    #[error("Bundling failed: {0}")]
    CompileFailed(String),

    #[error("Could not load exports of {}: {reason}", .path.display())]
    LoadFailed { path: PathBuf, reason: String },

    #[error("Code generation error: {0}")]
    Codegen(String),

    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("Invalid configuration in {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("{tool} did not finish within {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("Validation task failed: {0}")]
    Task(String),
}

impl BuildError {
    pub fn compile(message: impl Into<String>) -> Self {
        BuildError::CompileFailed(message.into())
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        BuildError::Codegen(message.into())
    }

    pub fn load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        BuildError::LoadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Raw tool output worth showing alongside the message, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            BuildError::StaticCheckFailed { output, .. } if !output.trim().is_empty() => {
                Some(output)
            }
            _ => None,
        }
    }
}

/// The first error of a build, labelled with the stage that raised it.
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct StageFailure {
    pub stage: Stage,
    pub source: BuildError,
}

impl StageFailure {
    /// Process exit status for a failed build.
    pub fn exit_code(&self) -> u8 {
        1
    }
}
