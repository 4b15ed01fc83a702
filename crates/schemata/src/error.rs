//! Error types for schema compilation and document assembly

use thiserror::Error;

use crate::descriptor::Identity;
use crate::metadata::MetadataError;
use crate::validate::ValidationError;

/// Everything that can abort a compilation pass.
///
/// All variants are terminal: the pass fails as a whole and no partial
/// document is returned.
#[derive(Error, Debug)]
pub enum CompileError {
    /// A descriptor the compiler has no rule for
    #[error("unsupported shape: {0}")]
    UnsupportedShape(String),

    /// A dictionary whose key is not text
    #[error("unsupported dictionary key type {key} in {context}")]
    UnsupportedKeyType {
        /// Description of the offending key descriptor
        key: String,
        /// Where the dictionary was found
        context: String,
    },

    /// Two distinct identities normalize to the same schema name
    #[error("schema name {name:?} is claimed by both {existing} and {incoming}")]
    NameCollision {
        name: String,
        existing: String,
        incoming: String,
    },

    /// One identity compiled from two different definitions
    #[error("{identity} is defined twice with different shapes (schema {name:?})")]
    ConflictingDefinition { name: String, identity: Identity },

    /// A [`TypeDescriptor::Named`](crate::descriptor::TypeDescriptor::Named)
    /// reference whose definition never appeared in the pass
    #[error("{identity} is referenced but never defined")]
    UndefinedShape { identity: Identity },

    /// The metadata provider failed
    #[error("metadata lookup failed")]
    MetadataLookupFailed(#[from] MetadataError),

    /// An enum declares the same literal twice under the reject policy
    #[error("enum {identity} declares value {value} more than once")]
    DuplicateEnumValue { identity: Identity, value: String },

    /// A route that cannot be placed into the table
    #[error("invalid route {method} {pattern}: {reason}")]
    InvalidRoute {
        method: String,
        pattern: String,
        reason: String,
    },

    /// The assembled document failed validation
    #[error(transparent)]
    ValidationFailed(#[from] ValidationError),
}

impl CompileError {
    /// Create an unsupported shape error
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedShape(msg.into())
    }
}

/// Result type alias for compilation operations
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = CompileError::UnsupportedKeyType {
            key: "integer".to_string(),
            context: "WithMaps.amounts".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unsupported dictionary key type integer in WithMaps.amounts"
        );

        let err = CompileError::NameCollision {
            name: "a_b_User".to_string(),
            existing: "a/b.User".to_string(),
            incoming: "a.b/User".to_string(),
        };
        assert!(err.to_string().contains("a_b_User"));
    }

    #[test]
    fn metadata_errors_keep_their_source() {
        use std::error::Error as _;

        let err = CompileError::from(MetadataError::new("models", "package not found"));
        assert_eq!(err.to_string(), "metadata lookup failed");
        assert!(err.source().unwrap().to_string().contains("package not found"));
    }
}
