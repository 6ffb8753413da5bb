//! Runtime-facing records collected from validated command modules.

use serde::Serialize;
use xgram_exports::{
    CommandConfig, ExportMismatch, ExportValue, ModuleExports, SchemaViolation, COMMAND_CONFIG_KEY,
    HANDLER_KEY,
};

use crate::artifact::Artifact;
use crate::error::Result;

/// Reference to the export that handles a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerRef {
    /// Positional id of the artifact exporting the handler
    pub artifact: String,
    /// Export key of the handler within that artifact
    pub export: String,
}

/// A command as the bot runtime will register it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDeclaration {
    pub trigger: String,
    pub prefix: String,
    #[serde(skip)]
    pub handler: HandlerRef,
    /// Source path relative to the project root
    pub source: String,
}

impl CommandDeclaration {
    /// Build the declaration for a command artifact from its loaded exports.
    ///
    /// The trigger is the module's logical name; the prefix comes from the
    /// optional `commandConfig` export and falls back to the default prefix.
    pub fn collect(artifact: &Artifact, exports: &ModuleExports) -> Result<Self> {
        let config = match exports.defined(COMMAND_CONFIG_KEY) {
            Some(ExportValue::Object(value)) => serde_json::from_value::<CommandConfig>(value.clone())
                .map_err(|e| ExportMismatch::Schema {
                    file: artifact.display_path.clone(),
                    key: COMMAND_CONFIG_KEY.to_string(),
                    violations: vec![SchemaViolation::new("", e.to_string())],
                })?,
            _ => CommandConfig::default(),
        };

        Ok(Self {
            trigger: artifact.name.clone(),
            prefix: config.prefix().to_string(),
            handler: HandlerRef {
                artifact: artifact.id.clone(),
                export: HANDLER_KEY.to_string(),
            },
            source: artifact.display_path.clone(),
        })
    }
}
