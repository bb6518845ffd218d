//! Error types for the association layer
//!
//! One structured error enum covers declaration-time configuration problems
//! and runtime relationship failures. Persistence errors from the underlying
//! store are carried opaquely in `Store` and never wrapped further.

/// Result type alias for relationship operations
pub type RelationResult<T> = Result<T, RelationError>;

/// Error types for relationship operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RelationError {
    /// Invalid association declaration or option combination (fails fast at
    /// declaration time)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Supplied document's concrete model is outside the association's
    /// allowed discriminator set
    #[error("Wrong Model type: expected one of [{expected}], got '{actual}'")]
    TypeMismatch { expected: String, actual: String },

    /// The target model has no field referencing the source model
    #[error("Missing inverse: {0}")]
    MissingInverse(String),

    /// The supplied id does not belong to the relationship being mutated
    #[error("Not a member: {0}")]
    NotAMember(String),

    /// A by-id lookup that must succeed came back empty
    #[error("Not found: {0}")]
    NotFound(String),

    /// Opaque persistence error, surfaced unchanged from the store
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RelationError {
    fn from(err: serde_json::Error) -> Self {
        RelationError::Serialization(err.to_string())
    }
}
