//! Frame source port - optional visual capture.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::CapturedFrame;

/// Errors a frame source can report.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Capture I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Latest frame is stale ({age_secs}s old)")]
    Stale { age_secs: u64 },

    #[error("Unsupported frame format: {0}")]
    Unsupported(String),
}

/// Supplies the most recent visual frame, if one is available.
///
/// `Ok(None)` means the source works but has nothing to offer right now.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn capture(&self) -> Result<Option<CapturedFrame>, CaptureError>;
}
