//! Association metadata - declaration options and the stored declaration
//!
//! An `AssociationOptions` value is what callers hand to the declaration
//! verbs; `AssociationDeclaration` is the fully-resolved form written onto
//! the synthesized schema field, immutable from then on.

use serde::{Deserialize, Serialize};

use crate::error::{RelationError, RelationResult};
use crate::inflect;

/// The four association kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    BelongsTo,
    HasOne,
    HasMany,
    Habtm,
}

impl RelationshipKind {
    /// Returns true for kinds backed by an ordered id-array field
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany | Self::Habtm)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BelongsTo => "belongsTo",
            Self::HasOne => "hasOne",
            Self::HasMany => "hasMany",
            Self::Habtm => "habtm",
        }
    }
}

/// Policy applied to associated children when the parent side is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependentPolicy {
    /// Direct low-level removal, bypassing child hooks and cascades
    Delete,
    /// Per-document removal through the full lifecycle, child hooks included
    Destroy,
    /// Unset the foreign key, keeping the child document
    Nullify,
}

impl DependentPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Destroy => "destroy",
            Self::Nullify => "nullify",
        }
    }
}

/// Caller-facing options for the declaration verbs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssociationOptions {
    /// Explicit target model name, when it cannot be classified from the
    /// association name
    pub model_name: Option<String>,
    /// Override for the field name the association occupies on the owner
    pub through: Option<String>,
    pub polymorphic: bool,
    pub dependent: Option<DependentPolicy>,
    /// Keep the owning side's array field in sync (collection kinds)
    pub set_parent: Option<bool>,
    /// Keep the child side's array field in sync (habtm)
    pub set_child: Option<bool>,
    /// Polymorphic foreign-key name used on the inverse side
    pub as_field: Option<String>,
    /// Explicit inverse foreign-key field, bypassing inverse resolution
    pub inverse_of: Option<String>,
    pub required: bool,
    /// Restricts the polymorphic type string
    pub enum_values: Option<Vec<String>>,
    /// Bump the referenced parent's revision when the owner is saved
    pub touch: bool,
}

impl AssociationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model_name = Some(model.to_string());
        self
    }

    pub fn with_through(mut self, path: &str) -> Self {
        self.through = Some(path.to_string());
        self
    }

    pub fn with_polymorphic(mut self) -> Self {
        self.polymorphic = true;
        self
    }

    pub fn with_dependent(mut self, policy: DependentPolicy) -> Self {
        self.dependent = Some(policy);
        self
    }

    pub fn with_set_parent(mut self, set_parent: bool) -> Self {
        self.set_parent = Some(set_parent);
        self
    }

    pub fn with_set_child(mut self, set_child: bool) -> Self {
        self.set_child = Some(set_child);
        self
    }

    pub fn with_as(mut self, as_field: &str) -> Self {
        self.as_field = Some(as_field.to_string());
        self
    }

    pub fn with_inverse_of(mut self, field: &str) -> Self {
        self.inverse_of = Some(field.to_string());
        self
    }

    pub fn with_required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_enum(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn with_touch(mut self) -> Self {
        self.touch = true;
        self
    }
}

/// A resolved association, attached to the synthesized schema field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationDeclaration {
    pub kind: RelationshipKind,
    /// Target model name, resolved lazily through the registry; need not be
    /// registered yet at declaration time
    pub target_model: String,
    /// Field name the association occupies on the owning document
    pub path_name: String,
    pub polymorphic: bool,
    pub dependent: Option<DependentPolicy>,
    pub set_parent: bool,
    pub set_child: bool,
    pub as_field: Option<String>,
    pub inverse_of: Option<String>,
    pub required: bool,
    pub enum_values: Option<Vec<String>>,
    pub touch: bool,
}

impl AssociationDeclaration {
    /// Resolve options into a declaration for `name`, applying naming
    /// defaults, then validate.
    ///
    /// `name` is either a path name ("tweets") or a model name ("User");
    /// the target model is classified from it unless `model_name` is given,
    /// and the path defaults to the pluralized lowercase target for
    /// collection kinds or the lowercase target for singular kinds.
    pub fn from_options(
        kind: RelationshipKind,
        name: &str,
        options: AssociationOptions,
    ) -> RelationResult<Self> {
        if name.trim().is_empty() {
            return Err(RelationError::Configuration("Model name needed".to_string()));
        }

        let target_model = options
            .model_name
            .clone()
            .unwrap_or_else(|| inflect::classify(name));

        let path_name = match (&options.through, kind) {
            (Some(path), _) => path.clone(),
            (None, RelationshipKind::BelongsTo) if options.polymorphic => name.to_string(),
            (None, kind) if kind.is_collection() => {
                inflect::pluralize(&target_model.to_lowercase())
            }
            _ => target_model.to_lowercase(),
        };

        let declaration = Self {
            kind,
            target_model,
            path_name,
            polymorphic: options.polymorphic,
            dependent: options.dependent,
            set_parent: options.set_parent.unwrap_or(true),
            set_child: options.set_child.unwrap_or(true),
            as_field: options.as_field,
            inverse_of: options.inverse_of,
            required: options.required,
            enum_values: options.enum_values,
            touch: options.touch,
        };
        declaration.validate()?;
        Ok(declaration)
    }

    /// Fail fast on invalid option combinations
    pub fn validate(&self) -> RelationResult<()> {
        if self.target_model.trim().is_empty() {
            return Err(RelationError::Configuration("Model name needed".to_string()));
        }

        if self.kind == RelationshipKind::Habtm && !self.set_child {
            if let Some(policy @ (DependentPolicy::Nullify | DependentPolicy::Destroy)) =
                self.dependent
            {
                return Err(RelationError::Configuration(format!(
                    "dependent cannot be set to '{}' while setChild is false",
                    policy.as_str()
                )));
            }
        }

        if self.kind == RelationshipKind::BelongsTo
            && self.polymorphic
            && self.path_name.trim().is_empty()
        {
            return Err(RelationError::Configuration(
                "polymorphic belongsTo requires a path name".to_string(),
            ));
        }

        Ok(())
    }

    /// The sibling field carrying the concrete model name, for polymorphic
    /// associations
    pub fn type_field(&self) -> String {
        format!("{}_type", self.path_name)
    }

    /// The `<as>_type` sibling on the inverse side, when `as` is set
    pub fn as_type_field(&self) -> Option<String> {
        self.as_field.as_ref().map(|name| format!("{}_type", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_path_defaults() {
        let decl = AssociationDeclaration::from_options(
            RelationshipKind::HasMany,
            "tweets",
            AssociationOptions::new(),
        )
        .unwrap();
        assert_eq!(decl.target_model, "Tweet");
        assert_eq!(decl.path_name, "tweets");

        let decl = AssociationDeclaration::from_options(
            RelationshipKind::Habtm,
            "Post",
            AssociationOptions::new(),
        )
        .unwrap();
        assert_eq!(decl.target_model, "Post");
        assert_eq!(decl.path_name, "posts");
    }

    #[test]
    fn test_singular_path_defaults_and_through() {
        let decl = AssociationDeclaration::from_options(
            RelationshipKind::BelongsTo,
            "User",
            AssociationOptions::new().with_through("author"),
        )
        .unwrap();
        assert_eq!(decl.target_model, "User");
        assert_eq!(decl.path_name, "author");

        let decl = AssociationDeclaration::from_options(
            RelationshipKind::HasOne,
            "Profile",
            AssociationOptions::new(),
        )
        .unwrap();
        assert_eq!(decl.path_name, "profile");
    }

    #[test]
    fn test_polymorphic_belongs_to_keeps_association_name() {
        let decl = AssociationDeclaration::from_options(
            RelationshipKind::BelongsTo,
            "playable",
            AssociationOptions::new().with_polymorphic(),
        )
        .unwrap();
        assert_eq!(decl.path_name, "playable");
        assert_eq!(decl.type_field(), "playable_type");
    }

    #[test]
    fn test_missing_model_name_fails_fast() {
        let err = AssociationDeclaration::from_options(
            RelationshipKind::HasMany,
            "  ",
            AssociationOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, RelationError::Configuration(_)));
        assert!(err.to_string().contains("Model name needed"));
    }

    #[test]
    fn test_habtm_set_child_false_conflicts_name_the_policy() {
        for policy in [DependentPolicy::Nullify, DependentPolicy::Destroy] {
            let err = AssociationDeclaration::from_options(
                RelationshipKind::Habtm,
                "Post",
                AssociationOptions::new()
                    .with_set_child(false)
                    .with_dependent(policy),
            )
            .unwrap_err();
            assert!(err.to_string().contains(policy.as_str()));
        }

        // delete stays allowed on an asymmetric habtm
        assert!(AssociationDeclaration::from_options(
            RelationshipKind::Habtm,
            "Post",
            AssociationOptions::new()
                .with_set_child(false)
                .with_dependent(DependentPolicy::Delete),
        )
        .is_ok());
    }
}
