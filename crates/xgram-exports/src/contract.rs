/// Declarative export contracts and the generic checker that evaluates them
///
/// A contract is an ordered list of export keys. Each key declares the
/// `typeof` tag it must have, whether it may be absent, and optionally a
/// JSON Schema that the value must satisfy once its type is correct.

use std::fmt;

use serde_json::Value as JsonValue;

use crate::error::{ContractError, ExportMismatch, SchemaViolation};
use crate::value::{ModuleExports, TypeTag};

/// A compiled JSON Schema applied to an export's JSON projection.
pub struct DeepSchema {
    raw: JsonValue,
    validator: jsonschema::Validator,
}

impl DeepSchema {
    /// Compile a JSON Schema document.
    pub fn new(raw: JsonValue) -> Result<Self, ContractError> {
        let validator = jsonschema::validator_for(&raw)
            .map_err(|e| ContractError::InvalidSchema(e.to_string()))?;
        Ok(Self { raw, validator })
    }

    /// The schema document this validator was compiled from.
    pub fn raw(&self) -> &JsonValue {
        &self.raw
    }

    /// Check an instance, collecting every field-level violation.
    pub fn check(&self, instance: &JsonValue) -> Result<(), Vec<SchemaViolation>> {
        let violations: Vec<SchemaViolation> = self
            .validator
            .iter_errors(instance)
            .map(|e| SchemaViolation::new(e.instance_path.to_string(), e.to_string()))
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

impl fmt::Debug for DeepSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepSchema").field("raw", &self.raw).finish()
    }
}

/// What a contract expects under one export key.
#[derive(Debug)]
pub struct ExportDeclaration {
    pub expected: TypeTag,
    pub required: bool,
    pub schema: Option<DeepSchema>,
}

impl ExportDeclaration {
    pub fn required(expected: TypeTag) -> Self {
        Self {
            expected,
            required: true,
            schema: None,
        }
    }

    pub fn optional(expected: TypeTag) -> Self {
        Self {
            expected,
            required: false,
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: DeepSchema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// The export surface required of one module category.
#[derive(Debug)]
pub struct ExportContract {
    name: String,
    entries: Vec<(String, ExportDeclaration)>,
}

impl ExportContract {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Declare a key. Redeclaring a key replaces it in its original position.
    pub fn export(mut self, key: impl Into<String>, declaration: ExportDeclaration) -> Self {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = declaration,
            None => self.entries.push((key, declaration)),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared keys in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ExportDeclaration)> {
        self.entries.iter().map(|(key, decl)| (key.as_str(), decl))
    }

    pub fn get(&self, key: &str) -> Option<&ExportDeclaration> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, decl)| decl)
    }

    /// Validate a module's exports, stopping at the first violation.
    ///
    /// Keys are checked in declaration order. An optional key that is absent
    /// (or `undefined`) is skipped entirely. Otherwise the `typeof` tag must
    /// match, and only then is the deep schema applied.
    pub fn validate(&self, exports: &ModuleExports, file: &str) -> Result<(), ExportMismatch> {
        for (key, decl) in &self.entries {
            let actual = exports.defined(key);
            if !decl.required && actual.is_none() {
                continue;
            }

            let found = actual.map(|value| value.type_tag());
            if found.unwrap_or(TypeTag::Undefined) != decl.expected {
                return Err(ExportMismatch::Type {
                    file: file.to_string(),
                    key: key.clone(),
                    expected: decl.expected,
                    found,
                    required: decl.required,
                });
            }

            if let (Some(schema), Some(value)) = (&decl.schema, actual) {
                schema
                    .check(&value.to_json())
                    .map_err(|violations| ExportMismatch::Schema {
                        file: file.to_string(),
                        key: key.clone(),
                        violations,
                    })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ExportValue;
    use serde_json::json;

    fn contract() -> ExportContract {
        ExportContract::new("sample")
            .export("default", ExportDeclaration::required(TypeTag::Function))
            .export(
                "meta",
                ExportDeclaration::optional(TypeTag::Object).with_schema(
                    DeepSchema::new(json!({
                        "type": "object",
                        "properties": { "level": { "type": "integer", "minimum": 0 } },
                        "additionalProperties": false
                    }))
                    .unwrap(),
                ),
            )
            .export("label", ExportDeclaration::required(TypeTag::String))
    }

    #[test]
    fn test_entries_keep_declaration_order() {
        let contract = contract();
        let keys: Vec<&str> = contract.entries().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["default", "meta", "label"]);
    }

    #[test]
    fn test_redeclared_key_keeps_position() {
        let contract = contract().export("default", ExportDeclaration::optional(TypeTag::Symbol));
        let keys: Vec<&str> = contract.entries().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["default", "meta", "label"]);
        assert_eq!(contract.get("default").map(|d| d.expected), Some(TypeTag::Symbol));
    }

    #[test]
    fn test_first_violation_in_declaration_order_wins() {
        let exports = ModuleExports::new().with("meta", ExportValue::Object(json!({ "level": -1 })));
        let err = contract().validate(&exports, "src/x.ts").unwrap_err();
        assert_eq!(err.key(), "default");
    }

    #[test]
    fn test_optional_absent_key_is_skipped() {
        let exports = ModuleExports::new()
            .with("default", ExportValue::function())
            .with("label", ExportValue::String("x".into()));
        assert!(contract().validate(&exports, "src/x.ts").is_ok());
    }

    #[test]
    fn test_optional_undefined_key_is_skipped() {
        let exports = ModuleExports::new()
            .with("default", ExportValue::function())
            .with("meta", ExportValue::Undefined)
            .with("label", ExportValue::String("x".into()));
        assert!(contract().validate(&exports, "src/x.ts").is_ok());
    }

    #[test]
    fn test_optional_present_with_wrong_type_fails() {
        let exports = ModuleExports::new()
            .with("default", ExportValue::function())
            .with("meta", ExportValue::Number(3.0));
        match contract().validate(&exports, "src/x.ts").unwrap_err() {
            ExportMismatch::Type { key, expected, found, required, .. } => {
                assert_eq!(key, "meta");
                assert_eq!(expected, TypeTag::Object);
                assert_eq!(found, Some(TypeTag::Number));
                assert!(!required);
            }
            other => panic!("Expected type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_key_reports_not_found() {
        let exports = ModuleExports::new().with("default", ExportValue::function());
        let err = contract().validate(&exports, "src/x.ts").unwrap_err();
        assert_eq!(
            err,
            ExportMismatch::Type {
                file: "src/x.ts".into(),
                key: "label".into(),
                expected: TypeTag::String,
                found: None,
                required: true,
            }
        );
        assert!(err.to_string().contains("it was not found"));
    }

    #[test]
    fn test_schema_runs_after_type_check() {
        let exports = ModuleExports::new()
            .with("default", ExportValue::function())
            .with("meta", ExportValue::Object(json!({ "level": -1, "extra": true })))
            .with("label", ExportValue::String("x".into()));
        match contract().validate(&exports, "src/x.ts").unwrap_err() {
            ExportMismatch::Schema { key, violations, .. } => {
                assert_eq!(key, "meta");
                assert_eq!(violations.len(), 2);
            }
            other => panic!("Expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_schema_document_is_rejected() {
        let result = DeepSchema::new(json!({ "type": 12 }));
        assert!(matches!(result, Err(ContractError::InvalidSchema(_))));
    }
}
