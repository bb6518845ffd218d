//! # docrel: Relational associations for schema-less documents
//!
//! An extension layer over a document-database mapper that adds
//! relational-style associations (belongsTo, hasOne, hasMany, habtm) to
//! schema-less collections: schema augmentation with reference fields,
//! lazy inverse resolution, relationship proxies for safe traversal and
//! mutation, and dependent removal cascades (delete, destroy, nullify).
//!
//! Persistence is a black box behind the `DocumentStore` trait; an
//! in-memory backend ships for tests and demos.

pub mod context;
pub mod document;
pub mod error;
pub mod inflect;
pub mod query;
pub mod relationships;
pub mod schema;
pub mod store;


// Re-export the core surface
pub use context::{RelationContext, DISCRIMINATOR_KEY, REVISION_KEY};
pub use document::{Document, DocumentId};
pub use error::{RelationError, RelationResult};
pub use query::Query;
pub use relationships::{
    AssociationDeclaration, AssociationOptions, BelongsTo, DependentPolicy, Habtm, HasMany,
    HasOne, Related, RelationshipKind,
};
pub use schema::registry::{ModelDefinition, ModelRegistry};
pub use schema::schema::Schema;
pub use store::{DocumentStore, MemoryStore, UpdateOp};
