//! Document store abstraction
//!
//! The association layer treats persistence as a black box behind the
//! `DocumentStore` trait: plain finds with JSON conditions, by-id lookups,
//! single-document saves and removals, and bulk updates limited to `$unset`.
//! `MemoryStore` is the in-process backend used by tests and demos.
//!
//! Condition matching follows document-store semantics: a scalar condition
//! value matches a field that equals it or an array field that contains it,
//! and `{"$in": [..]}` matches any listed value.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::document::{Document, DocumentId};
use crate::error::{RelationError, RelationResult};

/// Bulk update operations the association layer relies on
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Remove the named fields from every matched document
    Unset(Vec<String>),
}

/// Persistence primitives consumed from the document mapper
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find every document in a collection matching the JSON conditions
    async fn find(&self, collection: &str, conditions: &Value) -> RelationResult<Vec<Document>>;

    /// Look up a single document by id
    async fn find_by_id(
        &self,
        collection: &str,
        id: DocumentId,
    ) -> RelationResult<Option<Document>>;

    /// Insert or replace a single document
    async fn save(&self, collection: &str, document: &Document) -> RelationResult<()>;

    /// Remove a single document by id, no hooks involved
    async fn delete_by_id(&self, collection: &str, id: DocumentId) -> RelationResult<()>;

    /// Remove every matching document in one pass, no hooks involved
    async fn delete_many(&self, collection: &str, conditions: &Value) -> RelationResult<u64>;

    /// Apply a bulk update to every matching document (`multi: true` semantics)
    async fn update_many(
        &self,
        collection: &str,
        conditions: &Value,
        op: &UpdateOp,
    ) -> RelationResult<u64>;
}

/// In-memory `DocumentStore` keeping insertion order per collection
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    collections: Arc<DashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in a collection
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, conditions: &Value) -> RelationResult<Vec<Document>> {
        let docs = match self.collections.get(collection) {
            Some(docs) => docs,
            None => return Ok(Vec::new()),
        };
        Ok(docs
            .iter()
            .filter(|doc| matches_conditions(doc, conditions))
            .cloned()
            .collect())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: DocumentId,
    ) -> RelationResult<Option<Document>> {
        let docs = match self.collections.get(collection) {
            Some(docs) => docs,
            None => return Ok(None),
        };
        Ok(docs.iter().find(|doc| doc.id() == id).cloned())
    }

    async fn save(&self, collection: &str, document: &Document) -> RelationResult<()> {
        let mut docs = self
            .collections
            .entry(collection.to_string())
            .or_default();
        match docs.iter_mut().find(|doc| doc.id() == document.id()) {
            Some(existing) => *existing = document.clone(),
            None => docs.push(document.clone()),
        }
        Ok(())
    }

    async fn delete_by_id(&self, collection: &str, id: DocumentId) -> RelationResult<()> {
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.retain(|doc| doc.id() != id);
        }
        Ok(())
    }

    async fn delete_many(&self, collection: &str, conditions: &Value) -> RelationResult<u64> {
        let mut removed = 0;
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.retain(|doc| {
                if matches_conditions(doc, conditions) {
                    removed += 1;
                    false
                } else {
                    true
                }
            });
        }
        Ok(removed)
    }

    async fn update_many(
        &self,
        collection: &str,
        conditions: &Value,
        op: &UpdateOp,
    ) -> RelationResult<u64> {
        let mut updated = 0;
        if let Some(mut docs) = self.collections.get_mut(collection) {
            for doc in docs.iter_mut() {
                if !matches_conditions(doc, conditions) {
                    continue;
                }
                match op {
                    UpdateOp::Unset(fields) => {
                        for field in fields {
                            doc.unset(field);
                        }
                    }
                }
                updated += 1;
            }
        }
        Ok(updated)
    }
}

/// Evaluate a JSON condition object against a document
pub fn matches_conditions(doc: &Document, conditions: &Value) -> bool {
    let map = match conditions {
        Value::Object(map) => map,
        Value::Null => return true,
        _ => return false,
    };

    map.iter().all(|(key, expected)| {
        if key == "_id" {
            matches_value(&doc.id_value(), expected)
        } else {
            match doc.get(key) {
                Some(actual) => matches_value(actual, expected),
                None => expected.is_null(),
            }
        }
    })
}

fn matches_value(actual: &Value, expected: &Value) -> bool {
    if let Value::Object(operator) = expected {
        if let Some(Value::Array(candidates)) = operator.get("$in") {
            return candidates.iter().any(|candidate| equals_or_contains(actual, candidate));
        }
        return false;
    }
    equals_or_contains(actual, expected)
}

// Scalar equality, with array-membership semantics on array fields.
fn equals_or_contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| item == expected),
        other => other == expected,
    }
}

/// Convert an opaque backend failure message into the error channel
pub fn store_error(message: impl Into<String>) -> RelationError {
    RelationError::Store(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(model: &str, attrs: Value) -> Document {
        Document::new(model, attrs).unwrap()
    }

    #[tokio::test]
    async fn test_save_find_and_delete() {
        let store = MemoryStore::new();
        let tweet = doc("Tweet", json!({"title": "hi"}));
        store.save("tweets", &tweet).await.unwrap();

        let found = store.find_by_id("tweets", tweet.id()).await.unwrap();
        assert_eq!(found.as_ref().map(|d| d.id()), Some(tweet.id()));

        store.delete_by_id("tweets", tweet.id()).await.unwrap();
        assert!(store.find_by_id("tweets", tweet.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_by_id() {
        let store = MemoryStore::new();
        let mut tweet = doc("Tweet", json!({"title": "first"}));
        store.save("tweets", &tweet).await.unwrap();
        tweet.set("title", json!("second"));
        store.save("tweets", &tweet).await.unwrap();

        assert_eq!(store.len("tweets"), 1);
        let found = store.find_by_id("tweets", tweet.id()).await.unwrap().unwrap();
        assert_eq!(found.get("title"), Some(&json!("second")));
    }

    #[test]
    fn test_scalar_equality_matching() {
        let tweet = doc("Tweet", json!({"author": "abc"}));
        assert!(matches_conditions(&tweet, &json!({"author": "abc"})));
        assert!(!matches_conditions(&tweet, &json!({"author": "xyz"})));
        assert!(!matches_conditions(&tweet, &json!({"missing": "abc"})));
    }

    #[test]
    fn test_array_membership_matching() {
        let post = doc("Post", json!({"categories": ["a", "b"]}));
        assert!(matches_conditions(&post, &json!({"categories": "a"})));
        assert!(!matches_conditions(&post, &json!({"categories": "c"})));
    }

    #[test]
    fn test_in_operator_matching() {
        let tweet = doc("Tweet", json!({"author": "abc"}));
        assert!(matches_conditions(
            &tweet,
            &json!({"author": {"$in": ["xyz", "abc"]}})
        ));
        assert!(!matches_conditions(
            &tweet,
            &json!({"author": {"$in": ["xyz"]}})
        ));
        assert!(matches_conditions(
            &tweet,
            &json!({"_id": {"$in": [tweet.id().to_string()]}})
        ));
    }

    #[tokio::test]
    async fn test_update_many_unsets_fields() {
        let store = MemoryStore::new();
        let a = doc("Tweet", json!({"author": "abc", "title": "a"}));
        let b = doc("Tweet", json!({"author": "abc", "title": "b"}));
        let c = doc("Tweet", json!({"author": "other", "title": "c"}));
        for tweet in [&a, &b, &c] {
            store.save("tweets", tweet).await.unwrap();
        }

        let updated = store
            .update_many(
                "tweets",
                &json!({"author": "abc"}),
                &UpdateOp::Unset(vec!["author".to_string()]),
            )
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let survivors = store.find("tweets", &json!({"author": "other"})).await.unwrap();
        assert_eq!(survivors.len(), 1);
        let nullified = store.find_by_id("tweets", a.id()).await.unwrap().unwrap();
        assert!(nullified.get("author").is_none());
        assert_eq!(nullified.get("title"), Some(&json!("a")));
    }

    #[tokio::test]
    async fn test_delete_many_counts() {
        let store = MemoryStore::new();
        for title in ["a", "b"] {
            store
                .save("tweets", &doc("Tweet", json!({"author": "abc", "title": title})))
                .await
                .unwrap();
        }
        let removed = store
            .delete_many("tweets", &json!({"author": "abc"}))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.is_empty("tweets"));
    }
}
