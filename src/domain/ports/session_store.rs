//! Session store port - durable session snapshot.

use crate::domain::errors::DomainResult;
use crate::domain::models::SessionState;

/// Result of reading the persisted snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedSnapshot {
    /// Nothing has been persisted yet.
    Absent,
    /// A well-formed snapshot.
    Decoded(SessionState),
    /// A snapshot exists but could not be decoded.
    Corrupt { reason: String },
}

/// Durable storage for the single session snapshot.
///
/// `save` overwrites the previous snapshot all-or-nothing; a reader never
/// observes a partially written document.
pub trait SessionStore: Send + Sync {
    /// Human-readable location, for logs.
    fn describe(&self) -> String;

    fn load(&self) -> DomainResult<LoadedSnapshot>;

    fn save(&self, state: &SessionState) -> DomainResult<()>;
}

/// Decode a snapshot document.
///
/// Blank documents count as absent. Unknown keys are ignored and missing
/// keys take their defaults; anything else that fails to parse is corrupt.
pub fn decode_snapshot(content: &str) -> LoadedSnapshot {
    if content.trim().is_empty() {
        return LoadedSnapshot::Absent;
    }
    match serde_json::from_str::<SessionState>(content) {
        Ok(state) => LoadedSnapshot::Decoded(state),
        Err(e) => LoadedSnapshot::Corrupt {
            reason: e.to_string(),
        },
    }
}

/// Encode a snapshot document.
pub fn encode_snapshot(state: &SessionState) -> DomainResult<String> {
    Ok(serde_json::to_string_pretty(state)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_is_absent() {
        assert_eq!(decode_snapshot("  \n"), LoadedSnapshot::Absent);
    }

    #[test]
    fn test_garbage_is_corrupt() {
        assert!(matches!(
            decode_snapshot("{\"uptimeSeconds\": "),
            LoadedSnapshot::Corrupt { .. }
        ));
        assert!(matches!(
            decode_snapshot("[1, 2, 3]"),
            LoadedSnapshot::Corrupt { .. }
        ));
    }

    #[test]
    fn test_wrong_field_type_is_corrupt() {
        assert!(matches!(
            decode_snapshot(r#"{"uptimeSeconds": "many"}"#),
            LoadedSnapshot::Corrupt { .. }
        ));
    }

    #[test]
    fn test_encode_decode() {
        let state = SessionState {
            uptime_seconds: 77,
            total_processed: 1_234,
            ..Default::default()
        };
        let text = encode_snapshot(&state).unwrap();
        assert_eq!(decode_snapshot(&text), LoadedSnapshot::Decoded(state));
    }
}
