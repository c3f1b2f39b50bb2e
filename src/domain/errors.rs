//! Domain errors for the watchpost engine.

use thiserror::Error;

/// Domain-level errors that can occur in the watchpost engine.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition { from: String, to: String, reason: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_maps_to_serialization() {
        let err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let domain: DomainError = err.into();
        assert!(matches!(domain, DomainError::SerializationError(_)));
    }

    #[test]
    fn test_state_transition_message() {
        let err = DomainError::InvalidStateTransition {
            from: "running".to_string(),
            to: "running".to_string(),
            reason: "tick already in progress".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from running to running: tick already in progress"
        );
    }
}
