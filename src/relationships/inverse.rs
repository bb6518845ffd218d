//! Inverse resolution - discovering the opposite side of a relationship
//!
//! Given a declared association, the inverse is found by scanning the target
//! model's schema fields for relationship metadata pointing back at the
//! source model. First match wins, in field declaration order: when a target
//! model references the source through two fields, the oldest-declared field
//! is picked silently (a warning is logged). Declaring sides can bypass the
//! scan entirely with `inverse_of` or `as`.

use serde::{Deserialize, Serialize};

use crate::error::{RelationError, RelationResult};
use crate::relationships::metadata::RelationshipKind;
use crate::schema::registry::ModelRegistry;

/// The resolved opposite side of a relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InversePath {
    pub field_name: String,
    pub kind: RelationshipKind,
}

/// Find the field on `target_model` whose relationship metadata references
/// `source_model` (or its base, for discriminator sources).
///
/// Returns `Ok(None)` when no field matches; callers that require an inverse
/// turn that into a `MissingInverse` error. Results are cached per
/// `(target, source)` pair in the registry.
pub fn resolve_inverse(
    registry: &ModelRegistry,
    target_model: &str,
    source_model: &str,
) -> RelationResult<Option<InversePath>> {
    if let Some(cached) = registry.cached_inverse(target_model, source_model) {
        return Ok(cached);
    }

    let target = registry.resolve(target_model)?;
    let source_base = registry.base_of(source_model);

    let mut candidates = target.schema.fields().iter().filter_map(|field| {
        let declaration = field.relationship()?;
        if declaration.target_model == source_model || declaration.target_model == source_base {
            Some(InversePath {
                field_name: field.name.clone(),
                kind: declaration.kind,
            })
        } else {
            None
        }
    });

    let resolved = candidates.next();
    if let (Some(first), Some(second)) = (&resolved, candidates.next()) {
        tracing::warn!(
            target = target_model,
            source = source_model,
            picked = %first.field_name,
            ignored = %second.field_name,
            "ambiguous inverse: multiple fields reference the source model, \
             oldest declaration wins; disambiguate with inverse_of"
        );
    }

    registry.cache_inverse(target_model, source_model, resolved.clone());
    Ok(resolved)
}

/// Like `resolve_inverse`, but an absent inverse is an error
pub fn require_inverse(
    registry: &ModelRegistry,
    target_model: &str,
    source_model: &str,
) -> RelationResult<InversePath> {
    resolve_inverse(registry, target_model, source_model)?.ok_or_else(|| {
        RelationError::MissingInverse(
            "Parent model not referenced anywhere in the Child Schema".to_string(),
        )
    })
}
