//! Shared behavior for collection relationships
//!
//! HasMany and HABTM differ in the shape of the inverse field: a scalar
//! foreign key versus an id-array on the child. Both proxies resolve their
//! linkage into a `CollectionLink` carrying that shape, and use the same
//! attach/detach and type-check helpers parameterized by it.

use serde_json::{json, Value};

use crate::context::RelationContext;
use crate::document::{Document, DocumentId};
use crate::error::{RelationError, RelationResult};
use crate::query::{merge_conditions, Query};
use crate::relationships::inverse::{require_inverse, InversePath};
use crate::relationships::metadata::{AssociationDeclaration, RelationshipKind};

/// Shape of the inverse field on the child side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InverseShape {
    /// Singular foreign key (belongsTo/hasOne inverse)
    Scalar,
    /// Id-array (habtm inverse)
    Array,
}

/// Resolved child-side linkage for a collection association
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CollectionLink {
    pub field_name: String,
    /// `<as>_type` sibling, for polymorphic-`as` linkage
    pub type_field: Option<String>,
    pub shape: InverseShape,
}

impl CollectionLink {
    fn from_inverse(inverse: InversePath) -> Self {
        let shape = match inverse.kind {
            RelationshipKind::Habtm | RelationshipKind::HasMany => InverseShape::Array,
            RelationshipKind::BelongsTo | RelationshipKind::HasOne => InverseShape::Scalar,
        };
        Self {
            field_name: inverse.field_name,
            type_field: None,
            shape,
        }
    }
}

/// Resolve how a collection association reaches the child side: the `as`
/// pair, an explicit `inverse_of`, or the inverse scan.
pub(crate) fn resolve_link(
    ctx: &RelationContext,
    declaration: &AssociationDeclaration,
    parent_model: &str,
) -> RelationResult<CollectionLink> {
    if let Some(as_field) = &declaration.as_field {
        return Ok(CollectionLink {
            field_name: as_field.clone(),
            type_field: declaration.as_type_field(),
            shape: InverseShape::Scalar,
        });
    }

    if let Some(field) = &declaration.inverse_of {
        let shape = match declaration.kind {
            RelationshipKind::Habtm => InverseShape::Array,
            _ => InverseShape::Scalar,
        };
        return Ok(CollectionLink {
            field_name: field.clone(),
            type_field: None,
            shape,
        });
    }

    let inverse = require_inverse(ctx.registry(), &declaration.target_model, parent_model)?;
    Ok(CollectionLink::from_inverse(inverse))
}

/// Reject children whose concrete model is outside the association's allowed
/// discriminator set
pub(crate) fn ensure_allowed(
    ctx: &RelationContext,
    target_model: &str,
    child_model: &str,
) -> RelationResult<()> {
    let allowed = ctx.registry().allowed_models(target_model)?;
    if allowed.iter().any(|model| model == child_model) {
        Ok(())
    } else {
        Err(RelationError::TypeMismatch {
            expected: allowed.join(", "),
            actual: child_model.to_string(),
        })
    }
}

/// Write the parent linkage onto a child document, in memory only
pub(crate) fn attach_child(
    child: &mut Document,
    link: &CollectionLink,
    parent_id: DocumentId,
    parent_model: &str,
) {
    match link.shape {
        InverseShape::Scalar => {
            child.set_reference(&link.field_name, parent_id);
            if let Some(type_field) = &link.type_field {
                child.set(type_field, Value::String(parent_model.to_string()));
            }
        }
        InverseShape::Array => child.push_reference(&link.field_name, parent_id),
    }
}

/// Drop the parent linkage from a child document, in memory only
pub(crate) fn detach_child(child: &mut Document, link: &CollectionLink, parent_id: DocumentId) {
    match link.shape {
        InverseShape::Scalar => {
            child.unset(&link.field_name);
            if let Some(type_field) = &link.type_field {
                child.unset(type_field);
            }
        }
        InverseShape::Array => child.pull_reference(&link.field_name, parent_id),
    }
}

/// Conditions selecting children attached to this parent through `link`
pub(crate) fn link_conditions(
    link: &CollectionLink,
    parent_id: DocumentId,
    parent_model: &str,
) -> Value {
    let mut conditions = json!({ link.field_name.clone(): parent_id.to_string() });
    if let Some(type_field) = &link.type_field {
        merge_conditions(
            &mut conditions,
            &json!({ type_field.clone(): parent_model }),
        );
    }
    conditions
}

/// The `{_id: {$in: [...]}}` constraint over the parent's forward array
pub(crate) fn forward_array_conditions(parent: &Document, path: &str) -> Value {
    let ids: Vec<Value> = parent
        .reference_ids(path)
        .iter()
        .map(|id| Value::String(id.to_string()))
        .collect();
    json!({"_id": {"$in": ids}})
}

/// A query over the association's target collection, discriminator-scoped
/// when the target is one
pub(crate) fn target_query(
    ctx: &RelationContext,
    declaration: &AssociationDeclaration,
) -> RelationResult<Query> {
    ctx.query(&declaration.target_model)
}
