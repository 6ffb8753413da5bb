//! Export contracts for X-Gram bot modules.
//!
//! A compiled module is observed as a [`ModuleExports`] snapshot: every
//! exported binding together with its JavaScript `typeof` tag. An
//! [`ExportContract`] declares which keys a module category must (or may)
//! export, their expected type tags, and an optional deep schema for the
//! value itself. Validation is fail-fast and reports an [`ExportMismatch`].

mod builtin;
mod contract;
mod error;
mod value;

pub use builtin::{command_contract, CommandConfig, COMMAND_CONFIG_KEY, DEFAULT_PREFIX, HANDLER_KEY};
pub use contract::{DeepSchema, ExportContract, ExportDeclaration};
pub use error::{ContractError, ExportMismatch, SchemaViolation};
pub use value::{ExportRecord, ExportValue, ModuleExports, TypeTag};
