//! Field definitions and the per-field options bag
//!
//! Relationship metadata lives on the synthesized field's options, where
//! later introspection (inverse resolution, accessors) can find it. Field
//! type validation and casting belong to the host mapper, not this layer.

use serde::{Deserialize, Serialize};

use crate::relationships::metadata::AssociationDeclaration;

/// Raw field type of a schema path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Singular foreign-key id
    Id,
    /// Ordered sequence of foreign-key ids, duplicates allowed
    IdArray,
    String,
    Number,
    Bool,
    Json,
}

/// Options bag attached to a field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOptions {
    /// Fixed target model for reference fields; absent for polymorphic ids
    pub reference: Option<String>,
    pub required: bool,
    pub index: bool,
    pub polymorphic: bool,
    /// Allowed values, used to restrict polymorphic type strings
    pub enum_values: Option<Vec<String>>,
    /// The association this field was synthesized for
    pub relationship: Option<AssociationDeclaration>,
}

/// A named field within a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    pub options: FieldOptions,
}

impl FieldDefinition {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            options: FieldOptions::default(),
        }
    }

    /// A singular id field referencing `model`
    pub fn id(name: &str, reference: Option<&str>) -> Self {
        let mut field = Self::new(name, FieldType::Id);
        field.options.reference = reference.map(|m| m.to_string());
        field.options.index = true;
        field
    }

    /// An id-array field referencing `model`
    pub fn id_array(name: &str, reference: Option<&str>) -> Self {
        let mut field = Self::new(name, FieldType::IdArray);
        field.options.reference = reference.map(|m| m.to_string());
        field.options.index = true;
        field
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.options.required = required;
        self
    }

    pub fn with_relationship(mut self, declaration: AssociationDeclaration) -> Self {
        self.options.relationship = Some(declaration);
        self
    }

    /// The association declared on this field, if any
    pub fn relationship(&self) -> Option<&AssociationDeclaration> {
        self.options.relationship.as_ref()
    }
}
