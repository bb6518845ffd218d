//! Relational associations over schema-less documents
//!
//! Declarations live on the schema (`metadata`), linkage is resolved lazily
//! (`inverse`, `collection`), and all mutation goes through the per-kind
//! proxies handed out by the accessor factory. The `dependent` module wires
//! removal cascades into schema hooks.

pub mod accessor;
pub mod belongs_to;
pub mod collection;
pub mod dependent;
pub mod habtm;
pub mod has_many;
pub mod has_one;
pub mod inverse;
pub mod metadata;

pub use accessor::Related;
pub use belongs_to::BelongsTo;
pub use habtm::Habtm;
pub use has_many::HasMany;
pub use has_one::HasOne;
pub use inverse::InversePath;
pub use metadata::{AssociationDeclaration, AssociationOptions, DependentPolicy, RelationshipKind};
