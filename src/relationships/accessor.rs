//! Proxy factory
//!
//! Relationship proxies are ephemeral: looked up by path on a document's
//! schema and rebuilt per access. `RelationContext::relation` returns the
//! kind-dispatched `Related` enum; the typed constructors fail fast when the
//! path declares a different kind.

use crate::context::RelationContext;
use crate::document::Document;
use crate::error::{RelationError, RelationResult};
use crate::relationships::belongs_to::BelongsTo;
use crate::relationships::habtm::Habtm;
use crate::relationships::has_many::HasMany;
use crate::relationships::has_one::HasOne;
use crate::relationships::metadata::{AssociationDeclaration, RelationshipKind};

/// A relationship proxy of whichever kind the path declares
#[derive(Debug)]
pub enum Related<'a> {
    BelongsTo(BelongsTo<'a>),
    HasOne(HasOne<'a>),
    HasMany(HasMany<'a>),
    Habtm(Habtm<'a>),
}

impl<'a> Related<'a> {
    pub fn kind(&self) -> RelationshipKind {
        match self {
            Related::BelongsTo(_) => RelationshipKind::BelongsTo,
            Related::HasOne(_) => RelationshipKind::HasOne,
            Related::HasMany(_) => RelationshipKind::HasMany,
            Related::Habtm(_) => RelationshipKind::Habtm,
        }
    }
}

impl RelationContext {
    fn declaration_at(
        &self,
        document: &Document,
        path: &str,
    ) -> RelationResult<AssociationDeclaration> {
        let definition = self.registry().resolve(document.model())?;
        definition
            .schema
            .field(path)
            .and_then(|field| field.relationship())
            .cloned()
            .ok_or_else(|| {
                RelationError::Configuration(format!(
                    "Path '{}' doesn't contain a relationship",
                    path
                ))
            })
    }

    /// The proxy for whatever relationship `path` declares on the document's
    /// schema
    pub fn relation<'a>(
        &'a self,
        document: &'a mut Document,
        path: &str,
    ) -> RelationResult<Related<'a>> {
        let declaration = self.declaration_at(document, path)?;
        Ok(match declaration.kind {
            RelationshipKind::BelongsTo => Related::BelongsTo(BelongsTo {
                owner: document,
                declaration,
                ctx: self,
            }),
            RelationshipKind::HasOne => Related::HasOne(HasOne {
                owner: document,
                declaration,
                ctx: self,
            }),
            RelationshipKind::HasMany => Related::HasMany(HasMany {
                parent: document,
                declaration,
                ctx: self,
            }),
            RelationshipKind::Habtm => Related::Habtm(Habtm {
                parent: document,
                declaration,
                ctx: self,
            }),
        })
    }

    /// Typed accessor; fails when `path` declares another kind
    pub fn belongs_to<'a>(
        &'a self,
        document: &'a mut Document,
        path: &str,
    ) -> RelationResult<BelongsTo<'a>> {
        match self.relation(document, path)? {
            Related::BelongsTo(proxy) => Ok(proxy),
            other => Err(kind_mismatch(path, RelationshipKind::BelongsTo, other.kind())),
        }
    }

    /// Typed accessor; fails when `path` declares another kind
    pub fn has_one<'a>(
        &'a self,
        document: &'a mut Document,
        path: &str,
    ) -> RelationResult<HasOne<'a>> {
        match self.relation(document, path)? {
            Related::HasOne(proxy) => Ok(proxy),
            other => Err(kind_mismatch(path, RelationshipKind::HasOne, other.kind())),
        }
    }

    /// Typed accessor; fails when `path` declares another kind
    pub fn has_many<'a>(
        &'a self,
        document: &'a mut Document,
        path: &str,
    ) -> RelationResult<HasMany<'a>> {
        match self.relation(document, path)? {
            Related::HasMany(proxy) => Ok(proxy),
            other => Err(kind_mismatch(path, RelationshipKind::HasMany, other.kind())),
        }
    }

    /// Typed accessor; fails when `path` declares another kind
    pub fn habtm<'a>(
        &'a self,
        document: &'a mut Document,
        path: &str,
    ) -> RelationResult<Habtm<'a>> {
        match self.relation(document, path)? {
            Related::Habtm(proxy) => Ok(proxy),
            other => Err(kind_mismatch(path, RelationshipKind::Habtm, other.kind())),
        }
    }
}

fn kind_mismatch(path: &str, expected: RelationshipKind, actual: RelationshipKind) -> RelationError {
    RelationError::Configuration(format!(
        "Path '{}' declares a {} relationship, not {}",
        path,
        actual.as_str(),
        expected.as_str()
    ))
}
