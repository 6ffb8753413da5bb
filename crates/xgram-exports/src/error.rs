/// Error types for export contract validation

use std::fmt;

use thiserror::Error;

use crate::value::TypeTag;

/// One field-level failure reported by a deep schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON pointer into the exported value (empty for the value itself).
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "✖ {}", self.message)
        } else {
            write!(f, "✖ {}\n  → at {}", self.message, self.path)
        }
    }
}

/// A module's exports do not satisfy its category's contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportMismatch {
    /// The key is missing or its `typeof` differs from the declaration.
    #[error(
        "File {file} expected to contain an {}export key '{key}' with type {expected}, but {}",
        optional_marker(.required),
        describe_found(.found)
    )]
    Type {
        file: String,
        key: String,
        expected: TypeTag,
        /// `None` when the key is absent or `undefined`.
        found: Option<TypeTag>,
        required: bool,
    },

    /// The value has the right type but its deep schema rejected it.
    #[error(
        "File {file} contains an invalid export value for the '{key}' key. Validation errors:\n{}",
        render_violations(.violations)
    )]
    Schema {
        file: String,
        key: String,
        violations: Vec<SchemaViolation>,
    },
}

impl ExportMismatch {
    pub fn file(&self) -> &str {
        match self {
            ExportMismatch::Type { file, .. } | ExportMismatch::Schema { file, .. } => file,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            ExportMismatch::Type { key, .. } | ExportMismatch::Schema { key, .. } => key,
        }
    }
}

/// A contract definition itself is malformed.
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Invalid deep schema: {0}")]
    InvalidSchema(String),
}

fn optional_marker(required: &bool) -> &'static str {
    if *required { "" } else { "optional " }
}

fn describe_found(found: &Option<TypeTag>) -> String {
    match found {
        Some(tag) => format!("{} was found", tag),
        None => "it was not found".to_string(),
    }
}

fn render_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
