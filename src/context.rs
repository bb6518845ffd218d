//! Relation context - the explicit handle tying registry and store together
//!
//! All document lifecycle goes through the context: building routes
//! discriminator tags, saving runs `touch` propagation, and removing runs the
//! schema's pre-remove hooks (the dependency enforcer) before the store-level
//! delete. The context is passed down explicitly; nothing here is global.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::document::{Document, DocumentId};
use crate::error::{RelationError, RelationResult};
use crate::query::Query;
use crate::relationships::metadata::RelationshipKind;
use crate::schema::registry::ModelRegistry;
use crate::store::DocumentStore;

/// Attribute key carrying a discriminator tag on build input
pub const DISCRIMINATOR_KEY: &str = "__t";

/// Revision counter field bumped by `touch` declarations
pub const REVISION_KEY: &str = "__v";

/// Registry plus store handle; cheap to clone, clones share state
#[derive(Clone)]
pub struct RelationContext {
    registry: ModelRegistry,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for RelationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationContext")
            .field("registry", &self.registry)
            .finish()
    }
}

impl RelationContext {
    pub fn new(registry: ModelRegistry, store: Arc<dyn DocumentStore>) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Instantiate an unsaved document of `model` from JSON attributes.
    ///
    /// A `__t` attribute routes the document to the tagged discriminator,
    /// which must be within `model`'s allowed set.
    pub fn build_document(&self, model: &str, attrs: Value) -> RelationResult<Document> {
        let mut attrs = match attrs {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(RelationError::Serialization(format!(
                    "document attributes must be a JSON object, got {}",
                    other
                )))
            }
        };

        let concrete = match attrs.remove(DISCRIMINATOR_KEY) {
            Some(Value::String(tag)) => {
                let allowed = self.registry.allowed_models(model)?;
                if !allowed.contains(&tag) {
                    return Err(RelationError::TypeMismatch {
                        expected: allowed.join(", "),
                        actual: tag,
                    });
                }
                tag
            }
            Some(other) => {
                return Err(RelationError::Serialization(format!(
                    "discriminator tag must be a string, got {}",
                    other
                )))
            }
            None => {
                // target must exist even without a tag
                self.registry.resolve(model)?;
                model.to_string()
            }
        };

        Document::new(&concrete, Value::Object(attrs))
    }

    /// Persist a document, then propagate `touch` declarations to the
    /// referenced parents
    pub async fn save(&self, document: &mut Document) -> RelationResult<()> {
        let definition = self.registry.resolve(document.model())?;
        self.store.save(&definition.collection, document).await?;
        document.clear_modified();
        self.touch_parents(document).await
    }

    /// Remove a document through the full lifecycle: pre-remove hooks first
    /// (dependency cascades), then the store-level delete
    pub async fn remove(&self, document: &Document) -> RelationResult<()> {
        let definition = self.registry.resolve(document.model())?;
        let hooks = definition.schema.pre_remove_hooks().to_vec();
        for hook in hooks {
            hook(document, self).await?;
        }
        self.store
            .delete_by_id(&definition.collection, document.id())
            .await
    }

    /// A lazy query over a model's collection, discriminator-scoped when the
    /// model is one
    pub fn query(&self, model: &str) -> RelationResult<Query> {
        let definition = self.registry.resolve(model)?;
        let scope = definition.base.is_some().then(|| model.to_string());
        Ok(Query::new(self.store.clone(), &definition.collection).scope_model(scope))
    }

    /// Fetch a document by id from a model's collection
    pub async fn find_by_id(
        &self,
        model: &str,
        id: DocumentId,
    ) -> RelationResult<Option<Document>> {
        let collection = self.registry.collection_of(model)?;
        self.store.find_by_id(&collection, id).await
    }

    // Bump the revision counter on every parent referenced through a
    // belongsTo declaration carrying `touch`.
    async fn touch_parents(&self, document: &Document) -> RelationResult<()> {
        let definition = self.registry.resolve(document.model())?;
        let touching: Vec<_> = definition
            .schema
            .relationships()
            .filter(|decl| decl.touch && decl.kind == RelationshipKind::BelongsTo)
            .cloned()
            .collect();

        for declaration in touching {
            let parent_id = match document.get_reference(&declaration.path_name) {
                Some(id) => id,
                None => continue,
            };
            let parent_model = if declaration.polymorphic {
                match document.get(&declaration.type_field()).and_then(Value::as_str) {
                    Some(model) => model.to_string(),
                    None => continue,
                }
            } else {
                declaration.target_model.clone()
            };

            let collection = self.registry.collection_of(&parent_model)?;
            if let Some(mut parent) = self.store.find_by_id(&collection, parent_id).await? {
                let revision = parent
                    .get(REVISION_KEY)
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                parent.set(REVISION_KEY, json!(revision + 1));
                tracing::debug!(
                    parent = %parent_model,
                    id = %parent_id,
                    revision = revision + 1,
                    "touching referenced parent"
                );
                self.store.save(&collection, &parent).await?;
            }
        }
        Ok(())
    }
}
