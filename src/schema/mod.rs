//! Schema system: field definitions, declaration verbs, model catalog

pub mod field;
pub mod registry;
#[allow(clippy::module_inception)]
pub mod schema;

pub use field::{FieldDefinition, FieldOptions, FieldType};
pub use registry::{ModelDefinition, ModelRegistry};
pub use schema::{BoxFuture, PreRemoveHook, Schema};
