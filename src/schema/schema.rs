//! Schema definition surface
//!
//! A `Schema` is an ordered list of fields plus pre-remove hooks. The four
//! declaration verbs synthesize the reference fields for an association and
//! write the declaration into the field's options. Field order is preserved:
//! inverse resolution is oldest-declared-field-wins.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::RelationContext;
use crate::document::Document;
use crate::error::{RelationError, RelationResult};
use crate::relationships::dependent;
use crate::relationships::metadata::{
    AssociationDeclaration, AssociationOptions, RelationshipKind,
};
use crate::schema::field::{FieldDefinition, FieldType};

/// Boxed future used by hook callbacks
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Callback invoked before a document of this schema is removed through the
/// context; receives the doomed document and the context
pub type PreRemoveHook = Arc<
    dyn for<'a> Fn(&'a Document, &'a RelationContext) -> BoxFuture<'a, RelationResult<()>>
        + Send
        + Sync,
>;

/// Document schema: ordered fields and removal hooks
#[derive(Clone, Default)]
pub struct Schema {
    fields: Vec<FieldDefinition>,
    pre_remove: Vec<PreRemoveHook>,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("fields", &self.fields)
            .field("pre_remove_hooks", &self.pre_remove.len())
            .finish()
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw field. An existing field with the same name is replaced.
    pub fn add_field(&mut self, field: FieldDefinition) -> &mut Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut FieldDefinition> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Register a pre-remove hook; hooks run in registration order, exactly
    /// once per removal, before the store-level delete
    pub fn pre_remove(&mut self, hook: PreRemoveHook) -> &mut Self {
        self.pre_remove.push(hook);
        self
    }

    pub fn pre_remove_hooks(&self) -> &[PreRemoveHook] {
        &self.pre_remove
    }

    /// Child-side singular reference to a parent document.
    ///
    /// `Tweet.belongs_to("User", opts.with_through("author"))` adds an
    /// `author` id field; a polymorphic declaration adds the sibling
    /// `<path>_type` string field as well.
    pub fn belongs_to(
        &mut self,
        name: &str,
        options: AssociationOptions,
    ) -> RelationResult<&mut Self> {
        self.declare(RelationshipKind::BelongsTo, name, options)
    }

    /// Parent-side singular accessor over a child storing the reverse key
    pub fn has_one(
        &mut self,
        name: &str,
        options: AssociationOptions,
    ) -> RelationResult<&mut Self> {
        self.declare(RelationshipKind::HasOne, name, options)
    }

    /// Parent-side collection accessor over children storing the reverse key
    pub fn has_many(
        &mut self,
        name: &str,
        options: AssociationOptions,
    ) -> RelationResult<&mut Self> {
        self.declare(RelationshipKind::HasMany, name, options)
    }

    /// Symmetric many-to-many: both sides keep an array of the other's ids
    pub fn habtm(&mut self, name: &str, options: AssociationOptions) -> RelationResult<&mut Self> {
        self.declare(RelationshipKind::Habtm, name, options)
    }

    /// Shared declaration path: synthesize the field(s), attach metadata,
    /// wire the dependency hook.
    fn declare(
        &mut self,
        kind: RelationshipKind,
        name: &str,
        options: AssociationOptions,
    ) -> RelationResult<&mut Self> {
        let declaration = AssociationDeclaration::from_options(kind, name, options)?;
        let path = declaration.path_name.clone();
        let reference = if declaration.polymorphic {
            None
        } else {
            Some(declaration.target_model.as_str())
        };

        if self.field(&path).is_none() {
            let field = if kind.is_collection() {
                FieldDefinition::id_array(&path, reference)
            } else {
                FieldDefinition::id(&path, reference)
            }
            .with_required(declaration.required);
            self.add_field(field);
        }

        if declaration.polymorphic && kind == RelationshipKind::BelongsTo {
            let type_path = declaration.type_field();
            if self.field(&type_path).is_none() {
                let mut type_field =
                    FieldDefinition::string(&type_path).with_required(declaration.required);
                type_field.options.polymorphic = true;
                type_field.options.enum_values = declaration.enum_values.clone();
                self.add_field(type_field);
            }
        }

        if declaration.dependent.is_some() {
            dependent::install_dependent_hook(self, &declaration);
        }

        let field = self
            .field_mut(&path)
            .ok_or_else(|| RelationError::Configuration(format!("no field at path '{}'", path)))?;
        field.options.polymorphic |= declaration.polymorphic;
        field.options.relationship = Some(declaration);

        Ok(self)
    }

    /// Relationship declarations in field order
    pub fn relationships(&self) -> impl Iterator<Item = &AssociationDeclaration> {
        self.fields.iter().filter_map(|f| f.relationship())
    }
}
