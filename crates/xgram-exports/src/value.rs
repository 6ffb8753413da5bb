//! Snapshots of the bindings a compiled module exports.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The JavaScript `typeof` vocabulary shared by contracts and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Number,
    BigInt,
    Boolean,
    Symbol,
    Undefined,
    Object,
    Function,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Number => "number",
            TypeTag::BigInt => "bigint",
            TypeTag::Boolean => "boolean",
            TypeTag::Symbol => "symbol",
            TypeTag::Undefined => "undefined",
            TypeTag::Object => "object",
            TypeTag::Function => "function",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single exported binding as observed after loading a compiled module.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportValue {
    /// Present but `undefined`; treated the same as an absent key.
    Undefined,
    String(String),
    /// Non-finite numbers arrive as NaN.
    Number(f64),
    /// Decimal representation of the bigint.
    BigInt(String),
    Boolean(bool),
    /// Symbol description, if any.
    Symbol(Option<String>),
    /// Callable export. Only the function name survives serialization.
    Function { name: Option<String> },
    /// Any `typeof === "object"` value, including `null` and arrays,
    /// projected to its JSON form.
    Object(JsonValue),
}

impl ExportValue {
    /// Shorthand for an anonymous function export.
    pub fn function() -> Self {
        ExportValue::Function { name: None }
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            ExportValue::Undefined => TypeTag::Undefined,
            ExportValue::String(_) => TypeTag::String,
            ExportValue::Number(_) => TypeTag::Number,
            ExportValue::BigInt(_) => TypeTag::BigInt,
            ExportValue::Boolean(_) => TypeTag::Boolean,
            ExportValue::Symbol(_) => TypeTag::Symbol,
            ExportValue::Function { .. } => TypeTag::Function,
            ExportValue::Object(_) => TypeTag::Object,
        }
    }

    /// JSON projection used as the instance for deep schema validation.
    ///
    /// Values without a JSON form (functions, symbols, undefined) become `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            ExportValue::String(s) => JsonValue::String(s.clone()),
            ExportValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            ExportValue::BigInt(digits) => JsonValue::String(digits.clone()),
            ExportValue::Boolean(b) => JsonValue::Bool(*b),
            ExportValue::Object(value) => value.clone(),
            ExportValue::Undefined | ExportValue::Symbol(_) | ExportValue::Function { .. } => {
                JsonValue::Null
            }
        }
    }
}

/// Wire form produced by the export loader: `{ "type": "<typeof>", "value": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    #[serde(rename = "type")]
    pub tag: TypeTag,
    #[serde(default)]
    pub value: JsonValue,
}

impl From<ExportRecord> for ExportValue {
    fn from(record: ExportRecord) -> Self {
        let text = |value: JsonValue| match value {
            JsonValue::String(s) => Some(s),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        };

        match record.tag {
            TypeTag::Undefined => ExportValue::Undefined,
            TypeTag::String => ExportValue::String(text(record.value).unwrap_or_default()),
            TypeTag::Number => ExportValue::Number(record.value.as_f64().unwrap_or(f64::NAN)),
            TypeTag::BigInt => ExportValue::BigInt(text(record.value).unwrap_or_default()),
            TypeTag::Boolean => ExportValue::Boolean(record.value.as_bool().unwrap_or_default()),
            TypeTag::Symbol => ExportValue::Symbol(text(record.value)),
            TypeTag::Function => ExportValue::Function {
                name: text(record.value).filter(|name| !name.is_empty()),
            },
            TypeTag::Object => ExportValue::Object(record.value),
        }
    }
}

/// Every binding exported by one compiled module, keyed by export name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleExports {
    bindings: HashMap<String, ExportValue>,
}

impl ModuleExports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, convenient for fixtures.
    pub fn with(mut self, key: impl Into<String>, value: ExportValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ExportValue) {
        self.bindings.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ExportValue> {
        self.bindings.get(key)
    }

    /// Like [`get`](Self::get), but an `undefined` binding counts as absent.
    pub fn defined(&self, key: &str) -> Option<&ExportValue> {
        self.get(key).filter(|value| !matches!(value, ExportValue::Undefined))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Parse the loader's JSON description of a module's exports.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        let records: HashMap<String, ExportRecord> = serde_json::from_str(s)?;
        Ok(records.into_iter().map(|(key, record)| (key, ExportValue::from(record))).collect())
    }
}

impl FromIterator<(String, ExportValue)> for ModuleExports {
    fn from_iter<I: IntoIterator<Item = (String, ExportValue)>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().collect(),
        }
    }
}
