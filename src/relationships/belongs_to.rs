//! BelongsTo proxy - child-side singular reference to a parent document
//!
//! The owning side here is the child: mutation happens by writing the owner's
//! own reference field (and `_type` sibling for polymorphic declarations) and
//! saving the owner. There is no append/concat/remove surface on this kind.

use serde_json::{json, Value};

use crate::context::RelationContext;
use crate::document::Document;
use crate::error::{RelationError, RelationResult};
use crate::query::Query;
use crate::relationships::metadata::AssociationDeclaration;

/// Ephemeral accessor bound to one owner document and one belongsTo
/// declaration
#[derive(Debug)]
pub struct BelongsTo<'a> {
    pub(crate) owner: &'a mut Document,
    pub(crate) declaration: AssociationDeclaration,
    pub(crate) ctx: &'a RelationContext,
}

impl<'a> BelongsTo<'a> {
    fn path(&self) -> &str {
        &self.declaration.path_name
    }

    /// The referenced model: fixed by the declaration, or read from the
    /// `_type` sibling for polymorphic references
    fn referenced_model(&self) -> RelationResult<String> {
        if !self.declaration.polymorphic {
            return Ok(self.declaration.target_model.clone());
        }
        self.owner
            .get(&self.declaration.type_field())
            .and_then(Value::as_str)
            .map(|model| model.to_string())
            .ok_or_else(|| {
                RelationError::NotFound(format!(
                    "document has no '{}' type set",
                    self.declaration.type_field()
                ))
            })
    }

    /// Instantiate an unsaved target and point the owner's reference field at
    /// it, in memory only.
    ///
    /// A polymorphic declaration has no fixed target model: the concrete
    /// model must come tagged on the attributes (`__t`), restricted by the
    /// declaration's enum when one is set. Non-polymorphic builds route a
    /// `__t` tag within the target's discriminator set as usual.
    pub fn build(&mut self, attrs: Value) -> RelationResult<Document> {
        let target = if self.declaration.polymorphic {
            let mut map = match attrs {
                Value::Object(map) => map,
                Value::Null => serde_json::Map::new(),
                other => {
                    return Err(RelationError::Serialization(format!(
                        "document attributes must be a JSON object, got {}",
                        other
                    )))
                }
            };
            let model = match map.remove(crate::context::DISCRIMINATOR_KEY) {
                Some(Value::String(model)) => model,
                _ => {
                    return Err(RelationError::Configuration(format!(
                        "polymorphic '{}' build needs a '{}' model tag",
                        self.path(),
                        crate::context::DISCRIMINATOR_KEY
                    )))
                }
            };
            if let Some(allowed) = &self.declaration.enum_values {
                if !allowed.iter().any(|candidate| candidate == &model) {
                    return Err(RelationError::TypeMismatch {
                        expected: allowed.join(", "),
                        actual: model,
                    });
                }
            }
            let target = self.ctx.build_document(&model, Value::Object(map))?;
            let type_field = self.declaration.type_field();
            self.owner
                .set(&type_field, Value::String(target.model().to_string()));
            target
        } else {
            self.ctx
                .build_document(&self.declaration.target_model, attrs)?
        };

        let path = self.path().to_string();
        self.owner.set_reference(&path, target.id());
        Ok(target)
    }

    /// Build and persist the target. The owner's reference is set in memory;
    /// the owner itself is left for the caller to save.
    pub async fn create(&mut self, attrs: Value) -> RelationResult<Document> {
        let mut target = self.build(attrs)?;
        self.ctx.save(&mut target).await?;
        Ok(target)
    }

    /// Lazy query for the referenced document, pre-filtered by its id
    pub fn find(&self) -> RelationResult<Query> {
        let path = self.path();
        let id = self.owner.get_reference(path).ok_or_else(|| {
            RelationError::NotFound(format!("document has no '{}' reference set", path))
        })?;
        let model = self.referenced_model()?;
        Ok(self
            .ctx
            .query(&model)?
            .filter(&json!({"_id": id.to_string()})))
    }

    /// Fetch the referenced document, if the reference is set and resolves
    pub async fn find_one(&self) -> RelationResult<Option<Document>> {
        match self.find() {
            Ok(query) => query.find_one().await,
            Err(RelationError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
