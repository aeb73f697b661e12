//! Error taxonomy for the query engine.

use thiserror::Error;

use super::entity::EntityKind;

/// Engine errors.
///
/// Everything except [`EngineError::Persistence`] is the caller's fault and
/// is detected before the store is touched, or (for referential violations)
/// reported by the store and rolled back.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("referential violation: {0}")]
    ReferentialViolation(String),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("persistence error: {context}")]
    Persistence {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl EngineError {
    /// Classify a store error.
    ///
    /// Foreign-key violations become [`EngineError::ReferentialViolation`];
    /// everything else, including statement timeouts and unique violations,
    /// is a [`EngineError::Persistence`] error carrying the cause.
    pub fn from_store(context: &'static str, source: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &source
            && db.is_foreign_key_violation()
        {
            return Self::ReferentialViolation(format!("{context}: {}", db.message()));
        }
        Self::Persistence { context, source }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the caller can fix the request (4xx) rather than the server (5xx).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Persistence { .. })
    }
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_persistence() {
        let err = EngineError::from_store("failed to count items", sqlx::Error::PoolTimedOut);
        assert!(matches!(
            err,
            EngineError::Persistence {
                context: "failed to count items",
                ..
            }
        ));
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "persistence error: failed to count items");
    }

    #[test]
    fn caller_errors_are_client_errors() {
        assert!(EngineError::InvalidPagination("size".into()).is_client_error());
        assert!(
            EngineError::NotFound {
                kind: EntityKind::Item,
                id: 7
            }
            .is_client_error()
        );
        assert!(EngineError::ReferentialViolation("x".into()).is_client_error());
        assert!(EngineError::validation("sku", "must not be empty").is_client_error());
    }

    #[test]
    fn messages() {
        let err = EngineError::NotFound {
            kind: EntityKind::Category,
            id: 42,
        };
        assert_eq!(err.to_string(), "category 42 not found");

        let err = EngineError::validation("sku", "must not be empty");
        assert_eq!(err.to_string(), "invalid sku: must not be empty");
    }
}
