//! Mock frame source for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::models::CapturedFrame;
use crate::domain::ports::{CaptureError, FrameSource};

/// What the mock source does on every capture.
#[derive(Debug, Clone)]
pub enum MockCapture {
    Frame(CapturedFrame),
    Nothing,
    Fail(String),
    /// Never answer within any reasonable timeout.
    Hang,
}

/// Frame source with a fixed behaviour.
pub struct MockFrameSource {
    behaviour: MockCapture,
    calls: AtomicUsize,
}

impl MockFrameSource {
    pub fn new(behaviour: MockCapture) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSource for MockFrameSource {
    async fn capture(&self) -> Result<Option<CapturedFrame>, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            MockCapture::Frame(frame) => Ok(Some(frame.clone())),
            MockCapture::Nothing => Ok(None),
            MockCapture::Fail(reason) => Err(CaptureError::Unsupported(reason.clone())),
            MockCapture::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
        }
    }
}
