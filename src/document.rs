//! Document representation for schema-less collections
//!
//! A `Document` is a concrete model name, a generated id, and a JSON field
//! map. Reference fields store ids as strings; collection reference fields
//! store ordered id arrays (insertion order significant, duplicates allowed).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{RelationError, RelationResult};

/// Identifier assigned to every document at build time
pub type DocumentId = Uuid;

/// A single document instance bound to a concrete model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    model: String,
    fields: Map<String, Value>,
    #[serde(skip)]
    modified: HashSet<String>,
}

impl Document {
    /// Create a new unsaved document from a JSON attribute object.
    ///
    /// `attrs` must be a JSON object or null; a fresh id is generated.
    pub fn new(model: &str, attrs: Value) -> RelationResult<Self> {
        let fields = match attrs {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(RelationError::Serialization(format!(
                    "document attributes must be a JSON object, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            id: Uuid::new_v4(),
            model: model.to_string(),
            fields,
            modified: HashSet::new(),
        })
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// The concrete model name (a discriminator name for subclass documents)
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The document id as a JSON value, the shape used in conditions
    pub fn id_value(&self) -> Value {
        Value::String(self.id.to_string())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.fields.get(path)
    }

    /// Set a field value and mark the path modified
    pub fn set(&mut self, path: &str, value: Value) {
        self.fields.insert(path.to_string(), value);
        self.modified.insert(path.to_string());
    }

    /// Remove a field entirely, leaving it undefined
    pub fn unset(&mut self, path: &str) {
        self.fields.remove(path);
        self.modified.insert(path.to_string());
    }

    /// Store a document id into a singular reference field
    pub fn set_reference(&mut self, path: &str, id: DocumentId) {
        self.set(path, Value::String(id.to_string()));
    }

    /// Read a singular reference field as a document id
    pub fn get_reference(&self, path: &str) -> Option<DocumentId> {
        match self.fields.get(path) {
            Some(Value::String(raw)) => Uuid::parse_str(raw).ok(),
            _ => None,
        }
    }

    /// Read an id-array field, skipping anything that is not a valid id
    pub fn reference_ids(&self, path: &str) -> Vec<DocumentId> {
        match self.fields.get(path) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(raw) => Uuid::parse_str(raw).ok(),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Append an id to an id-array field, creating the array when missing.
    ///
    /// Duplicates are allowed: this mirrors an array of references, not a set.
    pub fn push_reference(&mut self, path: &str, id: DocumentId) {
        let entry = self
            .fields
            .entry(path.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(Value::String(id.to_string()));
        } else {
            *entry = Value::Array(vec![Value::String(id.to_string())]);
        }
        self.modified.insert(path.to_string());
    }

    /// Remove every occurrence of an id from an id-array field
    pub fn pull_reference(&mut self, path: &str, id: DocumentId) {
        let needle = id.to_string();
        if let Some(Value::Array(items)) = self.fields.get_mut(path) {
            items.retain(|item| item.as_str() != Some(needle.as_str()));
            self.modified.insert(path.to_string());
        }
    }

    pub fn contains_reference(&self, path: &str, id: DocumentId) -> bool {
        self.reference_ids(path).contains(&id)
    }

    pub fn mark_modified(&mut self, path: &str) {
        self.modified.insert(path.to_string());
    }

    pub fn is_modified(&self, path: &str) -> bool {
        self.modified.contains(path)
    }

    /// Called by the persistence layer after a successful save
    pub fn clear_modified(&mut self) {
        self.modified.clear();
    }
}
