//! Mock narrator for testing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Mutex;

use crate::domain::models::NarrativeContext;
use crate::domain::ports::{Narrator, NarratorError};

/// Scripted reply of the mock narrator.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this text
    Text(String),
    /// Behave as if the network were down
    Offline,
    /// Answer with an HTTP error status
    Status(u16),
    /// Answer successfully but with no text
    Empty,
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    fn into_result(self) -> Result<String, NarratorError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Offline => Err(NarratorError::Unavailable("mock network down".to_string())),
            Self::Status(code) => Err(NarratorError::Rejected {
                status: StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body: "mock error".to_string(),
            }),
            Self::Empty => Err(NarratorError::Empty),
        }
    }
}

/// Mock narrator for testing.
///
/// Replies are taken from the script in order; once it runs dry the default
/// reply is used. An optional delay keeps calls in flight long enough to
/// observe concurrency.
pub struct MockNarrator {
    default_reply: MockReply,
    script: Mutex<VecDeque<MockReply>>,
    delay: Option<Duration>,
    contexts: Mutex<Vec<NarrativeContext>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockNarrator {
    pub fn new(default_reply: MockReply) -> Self {
        Self {
            default_reply,
            script: Mutex::new(VecDeque::new()),
            delay: None,
            contexts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(MockReply::text(text))
    }

    pub fn with_script(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            ..self
        }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..self
        }
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls ever in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Contexts received, oldest first.
    pub async fn contexts(&self) -> Vec<NarrativeContext> {
        self.contexts.lock().await.clone()
    }
}

/// Counts a call as finished when dropped, including when the caller
/// cancels it mid-flight.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for MockNarrator {
    fn default() -> Self {
        Self::replying("Mock narration.")
    }
}

#[async_trait]
impl Narrator for MockNarrator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn narrate(&self, context: &NarrativeContext) -> Result<String, NarratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);
        self.contexts.lock().await.push(context.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.default_reply.clone());
        reply.into_result()
    }
}
