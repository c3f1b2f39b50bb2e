//! Narrator port - remote generation of the displayed status message.

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::models::NarrativeContext;

/// Errors a narrator can report.
#[derive(Error, Debug)]
pub enum NarratorError {
    /// Network absent, host unreachable, or the narrator is not configured
    #[error("Narrator unavailable: {0}")]
    Unavailable(String),

    /// The narrator answered with a non-success status
    #[error("Narrator rejected request ({status}): {body}")]
    Rejected { status: StatusCode, body: String },

    /// The response could not be understood
    #[error("Malformed narrator response: {0}")]
    Malformed(String),

    /// The response held no text
    #[error("Narrator returned no text")]
    Empty,

    /// The narrator did not answer in time
    #[error("Narrator request timed out")]
    Timeout,
}

impl NarratorError {
    /// Returns true if the failure means the narrator could not be reached
    pub fn is_offline(&self) -> bool {
        matches!(self, NarratorError::Unavailable(_))
    }
}

impl From<reqwest::Error> for NarratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NarratorError::Timeout
        } else if err.is_connect() || err.is_request() {
            NarratorError::Unavailable(err.to_string())
        } else if err.is_decode() {
            NarratorError::Malformed(err.to_string())
        } else {
            NarratorError::Unavailable(err.to_string())
        }
    }
}

/// Generates a short status message from a context snapshot.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Get the narrator type name.
    fn name(&self) -> &'static str;

    /// Produce a status message for the given context.
    async fn narrate(&self, context: &NarrativeContext) -> Result<String, NarratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_offline() {
        assert!(NarratorError::Unavailable("no route".to_string()).is_offline());
        assert!(!NarratorError::Timeout.is_offline());
        assert!(!NarratorError::Empty.is_offline());
        assert!(!NarratorError::Rejected {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: String::new(),
        }
        .is_offline());
    }
}
