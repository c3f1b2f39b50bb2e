//! Narrative cycle domain models.

use serde::{Deserialize, Serialize};

/// An encoded still frame supplied by a capture source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedFrame {
    /// MIME type, e.g. `image/jpeg`.
    pub media_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

/// Context payload handed to the narrator.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeContext {
    /// Descriptor of what the dashboard is watching.
    pub target: String,
    pub uptime: String,
    pub current_time: String,
    pub phase: String,
    /// Newest event messages, newest first, joined with `; `.
    pub recent_events: String,
    pub coverage_index: f64,
    pub lock_strength: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<CapturedFrame>,
}

impl NarrativeContext {
    /// Render the textual part of the context as a prompt body.
    pub fn to_prompt(&self) -> String {
        let recent = if self.recent_events.is_empty() {
            "none"
        } else {
            self.recent_events.as_str()
        };
        format!(
            "Target: {}\nUptime: {}\nCurrent time: {}\nPhase: {}\nCoverage: {:.1}%\nLock: {:.1}%\nRecent events: {}\nVisual: {}",
            self.target,
            self.uptime,
            self.current_time,
            self.phase,
            self.coverage_index,
            self.lock_strength,
            recent,
            if self.frame.is_some() { "attached" } else { "unavailable" },
        )
    }
}

/// Phase of the narrative trigger state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrativePhase {
    Ready,
    Capturing,
    Requesting,
    Applying,
    FallingBack,
}

impl NarrativePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Capturing => "capturing",
            Self::Requesting => "requesting",
            Self::Applying => "applying",
            Self::FallingBack => "falling_back",
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Self::Ready => 0,
            Self::Capturing => 1,
            Self::Requesting => 2,
            Self::Applying => 3,
            Self::FallingBack => 4,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Capturing,
            2 => Self::Requesting,
            3 => Self::Applying,
            4 => Self::FallingBack,
            _ => Self::Ready,
        }
    }
}

/// Why a cycle used a fallback message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FallbackReason {
    /// The narrator could not be reached.
    Offline(String),
    /// The narrator answered with an error.
    NarratorError(String),
    /// The narrator answered with nothing usable.
    UnusableResponse(String),
    /// The narrator did not answer in time.
    TimedOut,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offline(detail) => write!(f, "narrator offline: {detail}"),
            Self::NarratorError(detail) => write!(f, "narrator error: {detail}"),
            Self::UnusableResponse(detail) => write!(f, "unusable response: {detail}"),
            Self::TimedOut => f.write_str("narrator timed out"),
        }
    }
}

/// Result of one narrative trigger invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CycleOutcome {
    /// The narrator's text is now displayed.
    Applied { message: String },
    /// A fallback message is now displayed.
    FellBack { message: String, reason: FallbackReason },
    /// Another cycle was already in flight.
    Skipped,
}

impl CycleOutcome {
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Applied { message } | Self::FellBack { message, .. } => Some(message),
            Self::Skipped => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> NarrativeContext {
        NarrativeContext {
            target: "Relay mast".to_string(),
            uptime: "00:01:00".to_string(),
            current_time: "12:00:00".to_string(),
            phase: "SCANNING".to_string(),
            recent_events: String::new(),
            coverage_index: 12.345,
            lock_strength: 3.0,
            frame: None,
        }
    }

    #[test]
    fn test_prompt_renders_fields() {
        let prompt = context().to_prompt();
        assert!(prompt.contains("Target: Relay mast"));
        assert!(prompt.contains("Coverage: 12.3%"));
        assert!(prompt.contains("Recent events: none"));
        assert!(prompt.contains("Visual: unavailable"));
    }

    #[test]
    fn test_frame_omitted_from_payload_when_absent() {
        let value = serde_json::to_value(context()).unwrap();
        assert!(value.get("frame").is_none());
    }

    #[test]
    fn test_phase_round_trips_through_u8() {
        for phase in [
            NarrativePhase::Ready,
            NarrativePhase::Capturing,
            NarrativePhase::Requesting,
            NarrativePhase::Applying,
            NarrativePhase::FallingBack,
        ] {
            assert_eq!(NarrativePhase::from_u8(phase.to_u8()), phase);
        }
    }

    #[test]
    fn test_outcome_message() {
        assert_eq!(CycleOutcome::Skipped.message(), None);
        let outcome = CycleOutcome::FellBack {
            message: "holding".to_string(),
            reason: FallbackReason::TimedOut,
        };
        assert_eq!(outcome.message(), Some("holding"));
    }
}
