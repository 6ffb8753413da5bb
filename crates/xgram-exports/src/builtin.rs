//! Built-in contracts for the module categories the build understands.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::contract::{DeepSchema, ExportContract, ExportDeclaration};
use crate::value::TypeTag;

/// Activation prefix used when a command does not configure one.
pub const DEFAULT_PREFIX: &str = "/";

/// Export key holding a command's handler.
pub const HANDLER_KEY: &str = "default";

/// Export key holding a command's optional configuration object.
pub const COMMAND_CONFIG_KEY: &str = "commandConfig";

/// The `commandConfig` export of a command module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommandConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl CommandConfig {
    /// The configured prefix, or [`DEFAULT_PREFIX`].
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }
}

static COMMAND_CONTRACT: LazyLock<ExportContract> = LazyLock::new(|| {
    let config_schema = DeepSchema::new(json!({
        "type": "object",
        "properties": {
            "prefix": { "type": "string", "minLength": 1 }
        },
        "additionalProperties": false
    }))
    .expect("built-in commandConfig schema is valid");

    ExportContract::new("command")
        .export(HANDLER_KEY, ExportDeclaration::required(TypeTag::Function))
        .export(
            COMMAND_CONFIG_KEY,
            ExportDeclaration::optional(TypeTag::Object).with_schema(config_schema),
        )
});

/// Contract every module under `src/commands` must satisfy.
///
/// # Panics
///
/// Panics on first use if the embedded `commandConfig` schema fails to
/// compile, which would be a defect in this crate rather than user input.
pub fn command_contract() -> &'static ExportContract {
    &COMMAND_CONTRACT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportMismatch;
    use crate::value::{ExportValue, ModuleExports};

    #[test]
    fn test_function_default_export_is_valid() {
        let exports = ModuleExports::new().with("default", ExportValue::function());
        assert!(command_contract().validate(&exports, "src/commands/greet.ts").is_ok());
    }

    #[test]
    fn test_string_default_export_is_a_type_mismatch() {
        let exports = ModuleExports::new().with("default", ExportValue::String("not a function".into()));
        let err = command_contract()
            .validate(&exports, "src/commands/greet.ts")
            .unwrap_err();

        assert_eq!(
            err,
            ExportMismatch::Type {
                file: "src/commands/greet.ts".into(),
                key: "default".into(),
                expected: TypeTag::Function,
                found: Some(TypeTag::String),
                required: true,
            }
        );
        let message = err.to_string();
        assert!(message.contains("with type function"));
        assert!(message.contains("string was found"));
    }

    #[test]
    fn test_empty_prefix_fails_schema_validation() {
        let exports = ModuleExports::new()
            .with("default", ExportValue::function())
            .with("commandConfig", ExportValue::Object(json!({ "prefix": "" })));
        match command_contract().validate(&exports, "src/commands/greet.ts").unwrap_err() {
            ExportMismatch::Schema { key, violations, .. } => {
                assert_eq!(key, "commandConfig");
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].path, "/prefix");
            }
            other => panic!("Expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_config_field_fails_schema_validation() {
        let exports = ModuleExports::new()
            .with("default", ExportValue::function())
            .with("commandConfig", ExportValue::Object(json!({ "alias": "hi" })));
        let err = command_contract().validate(&exports, "src/commands/greet.ts").unwrap_err();
        assert!(matches!(err, ExportMismatch::Schema { .. }));
    }

    #[test]
    fn test_null_config_is_rejected_by_schema() {
        // typeof null is "object", so only the schema catches it
        let exports = ModuleExports::new()
            .with("default", ExportValue::function())
            .with("commandConfig", ExportValue::Object(serde_json::Value::Null));
        let err = command_contract().validate(&exports, "src/commands/greet.ts").unwrap_err();
        assert!(matches!(err, ExportMismatch::Schema { .. }));
    }

    #[test]
    fn test_command_config_prefix_defaults() {
        assert_eq!(CommandConfig::default().prefix(), "/");
        let config: CommandConfig = serde_json::from_value(json!({ "prefix": "!" })).unwrap();
        assert_eq!(config.prefix(), "!");
    }
}
