//! Resolution error types.

use crate::scope::ScopeId;

/// Failures raised by the core. Absent keys are never errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Override data or declarations that cannot be placed in a tree.
    #[error("malformed hierarchy: {entity}: {reason}")]
    MalformedHierarchy { entity: String, reason: String },

    /// A consumer asked about a scope that is not part of the tree.
    #[error("scope {0} is not part of the resolved tree")]
    MissingScope(ScopeId),
}

impl ResolveError {
    pub(crate) fn malformed(entity: impl ToString, reason: impl Into<String>) -> Self {
        ResolveError::MalformedHierarchy {
            entity: entity.to_string(),
            reason: reason.into(),
        }
    }

    /// The offending entity identifier, for `MalformedHierarchy`.
    pub fn entity(&self) -> Option<&str> {
        match self {
            ResolveError::MalformedHierarchy { entity, .. } => Some(entity),
            ResolveError::MissingScope(_) => None,
        }
    }
}
