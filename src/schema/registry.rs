//! Model registry - the process-local model catalog
//!
//! Maps model names to their schema, collection, and discriminator set, and
//! caches inverse-resolution results. The registry is an explicit handle
//! passed down through the context; there is no process-wide singleton.
//! Cloning is cheap, every clone shares the same maps.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{RelationError, RelationResult};
use crate::inflect;
use crate::relationships::inverse::InversePath;
use crate::schema::schema::Schema;

/// A registered model: schema, storage collection, discriminator links
#[derive(Debug, Clone)]
pub struct ModelDefinition {
    pub name: String,
    pub schema: Arc<Schema>,
    /// Collection documents of this model live in (shared with the base for
    /// discriminators)
    pub collection: String,
    /// Base model name, for discriminator models
    pub base: Option<String>,
    /// Registered discriminator names, on base models
    pub discriminators: Vec<String>,
}

/// Thread-safe model catalog with an inverse-resolution cache
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Arc<DashMap<String, ModelDefinition>>,
    inverse_cache: Arc<DashMap<(String, String), Option<InversePath>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under its own collection. Re-registering replaces the
    /// schema and drops stale cached inverse resolutions.
    pub fn register(&self, name: &str, schema: Schema) -> RelationResult<()> {
        if name.trim().is_empty() {
            return Err(RelationError::Configuration("Model name needed".to_string()));
        }

        let definition = ModelDefinition {
            name: name.to_string(),
            schema: Arc::new(schema),
            collection: inflect::collection_name(name),
            base: None,
            discriminators: Vec::new(),
        };
        tracing::debug!(model = name, collection = %definition.collection, "registering model");
        self.models.insert(name.to_string(), definition);
        self.invalidate_inverse_cache(name);
        Ok(())
    }

    /// Register a discriminator model sharing the base model's schema and
    /// collection
    pub fn register_discriminator(&self, name: &str, base: &str) -> RelationResult<()> {
        let base_definition = self.resolve(base)?;
        if base_definition.base.is_some() {
            return Err(RelationError::Configuration(format!(
                "'{}' is itself a discriminator and cannot be a base model",
                base
            )));
        }

        let definition = ModelDefinition {
            name: name.to_string(),
            schema: base_definition.schema.clone(),
            collection: base_definition.collection.clone(),
            base: Some(base.to_string()),
            discriminators: Vec::new(),
        };
        tracing::debug!(model = name, base = base, "registering discriminator");
        self.models.insert(name.to_string(), definition);
        if let Some(mut entry) = self.models.get_mut(base) {
            if !entry.discriminators.iter().any(|d| d == name) {
                entry.discriminators.push(name.to_string());
            }
        }
        self.invalidate_inverse_cache(name);
        Ok(())
    }

    /// Look up a model, failing with a configuration error when unknown
    pub fn resolve(&self, name: &str) -> RelationResult<ModelDefinition> {
        self.models.get(name).map(|entry| entry.clone()).ok_or_else(|| {
            RelationError::Configuration(format!("model '{}' is not registered", name))
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// The base model name for a discriminator, or the name itself
    pub fn base_of(&self, name: &str) -> String {
        self.models
            .get(name)
            .and_then(|entry| entry.base.clone())
            .unwrap_or_else(|| name.to_string())
    }

    /// Collection a model's documents live in
    pub fn collection_of(&self, name: &str) -> RelationResult<String> {
        Ok(self.resolve(name)?.collection)
    }

    /// Allowed concrete model set for a target: the target itself plus its
    /// registered discriminators
    pub fn allowed_models(&self, target: &str) -> RelationResult<Vec<String>> {
        let definition = self.resolve(target)?;
        let mut allowed = vec![definition.name.clone()];
        allowed.extend(definition.discriminators.iter().cloned());
        Ok(allowed)
    }

    pub(crate) fn cached_inverse(
        &self,
        target: &str,
        source: &str,
    ) -> Option<Option<InversePath>> {
        self.inverse_cache
            .get(&(target.to_string(), source.to_string()))
            .map(|entry| entry.clone())
    }

    pub(crate) fn cache_inverse(
        &self,
        target: &str,
        source: &str,
        resolved: Option<InversePath>,
    ) {
        self.inverse_cache
            .insert((target.to_string(), source.to_string()), resolved);
    }

    // A (re)registered model may change either side of a cached pair.
    fn invalidate_inverse_cache(&self, model: &str) {
        self.inverse_cache
            .retain(|(target, source), _| target != model && source != model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationships::metadata::AssociationOptions;

    #[test]
    fn test_register_and_resolve() {
        let registry = ModelRegistry::new();
        registry.register("User", Schema::new()).unwrap();

        let definition = registry.resolve("User").unwrap();
        assert_eq!(definition.collection, "users");
        assert!(registry.resolve("Tweet").is_err());
    }

    #[test]
    fn test_discriminators_share_collection_and_schema() {
        let registry = ModelRegistry::new();
        let mut schema = Schema::new();
        schema
            .belongs_to("User", AssociationOptions::new().with_through("author"))
            .unwrap();
        registry.register("Post", schema).unwrap();
        registry.register_discriminator("VideoPost", "Post").unwrap();

        let video = registry.resolve("VideoPost").unwrap();
        assert_eq!(video.collection, "posts");
        assert!(video.schema.field("author").is_some());
        assert_eq!(registry.base_of("VideoPost"), "Post");
        assert_eq!(
            registry.allowed_models("Post").unwrap(),
            vec!["Post".to_string(), "VideoPost".to_string()]
        );
    }

    #[test]
    fn test_discriminator_of_discriminator_rejected() {
        let registry = ModelRegistry::new();
        registry.register("Post", Schema::new()).unwrap();
        registry.register_discriminator("VideoPost", "Post").unwrap();
        assert!(registry
            .register_discriminator("ShortVideoPost", "VideoPost")
            .is_err());
    }

    #[test]
    fn test_discriminator_requires_registered_base() {
        let registry = ModelRegistry::new();
        assert!(registry.register_discriminator("VideoPost", "Post").is_err());
    }
}
