//! Lazy query over the document store
//!
//! A `Query` accumulates JSON conditions and executes only when asked,
//! so relationship accessors can hand back an unexecuted query that the
//! caller may refine further. Conditions merge without overwriting keys
//! already present, which is what keeps relationship-scoped filters safe
//! from caller input.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::document::{Document, DocumentId};
use crate::error::RelationResult;
use crate::store::DocumentStore;

/// Merge `from` into `to` without overwriting existing keys of `to`.
///
/// Nested objects merge recursively; a key already bound to a non-object
/// value is left untouched.
pub(crate) fn merge_conditions(to: &mut Value, from: &Value) {
    if let (Value::Object(to_map), Value::Object(from_map)) = (to, from) {
        for (key, value) in from_map {
            match to_map.get_mut(key) {
                None => {
                    to_map.insert(key.clone(), value.clone());
                }
                Some(existing) => merge_conditions(existing, value),
            }
        }
    }
}

/// A lazy, chainable find over one collection
#[derive(Clone)]
pub struct Query {
    store: Arc<dyn DocumentStore>,
    collection: String,
    conditions: Value,
    /// Restrict results to one concrete model (discriminator-scoped finds)
    model_scope: Option<String>,
    fields: Option<Vec<String>>,
    limit: Option<usize>,
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("collection", &self.collection)
            .field("conditions", &self.conditions)
            .field("model_scope", &self.model_scope)
            .field("fields", &self.fields)
            .field("limit", &self.limit)
            .finish()
    }
}

impl Query {
    pub fn new(store: Arc<dyn DocumentStore>, collection: &str) -> Self {
        Self {
            store,
            collection: collection.to_string(),
            conditions: json!({}),
            model_scope: None,
            fields: None,
            limit: None,
        }
    }

    /// Merge extra conditions in, never overwriting existing keys
    pub fn filter(mut self, conditions: &Value) -> Self {
        merge_conditions(&mut self.conditions, conditions);
        self
    }

    /// Scope results to a single concrete model name
    pub fn scope_model(mut self, model: Option<String>) -> Self {
        self.model_scope = model;
        self
    }

    /// Project results down to the named fields
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The accumulated conditions, for bulk operations reusing this filter
    pub fn conditions(&self) -> &Value {
        &self.conditions
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Execute the query and return all matching documents
    pub async fn exec(&self) -> RelationResult<Vec<Document>> {
        let mut docs = self.store.find(&self.collection, &self.conditions).await?;

        if let Some(scope) = &self.model_scope {
            docs.retain(|doc| doc.model() == scope);
        }
        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        if let Some(fields) = &self.fields {
            for doc in docs.iter_mut() {
                let keep: Vec<String> = doc
                    .fields()
                    .keys()
                    .filter(|key| !fields.contains(key))
                    .cloned()
                    .collect();
                for key in keep {
                    doc.unset(&key);
                }
            }
        }

        Ok(docs)
    }

    /// Execute the query and return the first match, if any
    pub async fn find_one(&self) -> RelationResult<Option<Document>> {
        let mut docs = self.clone().limit(1).exec().await?;
        Ok(docs.pop())
    }

    /// Execute a by-id find within this query's constraints
    pub async fn find_by_id(&self, id: DocumentId) -> RelationResult<Option<Document>> {
        self.clone()
            .filter(&json!({"_id": id.to_string()}))
            .find_one()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_merge_does_not_overwrite() {
        let mut safe = json!({"author": "me"});
        merge_conditions(&mut safe, &json!({"author": "attacker", "title": "x"}));
        assert_eq!(safe, json!({"author": "me", "title": "x"}));
    }

    #[test]
    fn test_merge_keeps_existing_scalar_on_nested_conflict() {
        // {_id: "x"} must survive a later {_id: {$in: [..]}} merge
        let mut safe = json!({"_id": "x"});
        merge_conditions(&mut safe, &json!({"_id": {"$in": ["y"]}}));
        assert_eq!(safe, json!({"_id": "x"}));
    }

    #[tokio::test]
    async fn test_lazy_execution_and_refinement() {
        let store = Arc::new(MemoryStore::new());
        for title in ["a", "b"] {
            let doc = Document::new("Tweet", json!({"author": "me", "title": title})).unwrap();
            store.save("tweets", &doc).await.unwrap();
        }

        let query = Query::new(store.clone(), "tweets").filter(&json!({"author": "me"}));
        let all = query.clone().exec().await.unwrap();
        assert_eq!(all.len(), 2);

        let refined = query.filter(&json!({"title": "b"})).exec().await.unwrap();
        assert_eq!(refined.len(), 1);
        assert_eq!(refined[0].get("title"), Some(&json!("b")));
    }

    #[tokio::test]
    async fn test_select_projects_fields() {
        let store = Arc::new(MemoryStore::new());
        let doc = Document::new("Tweet", json!({"author": "me", "title": "a"})).unwrap();
        store.save("tweets", &doc).await.unwrap();

        let found = Query::new(store, "tweets")
            .select(&["title"])
            .find_one()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("title"), Some(&json!("a")));
        assert!(found.get("author").is_none());
    }

    #[tokio::test]
    async fn test_model_scope_filters_concrete_type() {
        let store = Arc::new(MemoryStore::new());
        store
            .save("posts", &Document::new("Post", json!({})).unwrap())
            .await
            .unwrap();
        store
            .save("posts", &Document::new("VideoPost", json!({})).unwrap())
            .await
            .unwrap();

        let scoped = Query::new(store, "posts")
            .scope_model(Some("VideoPost".to_string()))
            .exec()
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].model(), "VideoPost");
    }
}
