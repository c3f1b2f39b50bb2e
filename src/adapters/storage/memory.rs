//! In-memory session store.
//!
//! Keeps the encoded document rather than the struct so loads exercise the
//! same codec as the file store. Used by tests and by ephemeral runs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::SessionState;
use crate::domain::ports::session_store::{decode_snapshot, encode_snapshot};
use crate::domain::ports::{LoadedSnapshot, SessionStore};

/// Session store holding the snapshot document in memory.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    document: Mutex<Option<String>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a raw document, e.g. to simulate corruption.
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
            ..Default::default()
        }
    }

    /// Seed the store with an encoded state.
    pub fn with_state(state: &SessionState) -> DomainResult<Self> {
        Ok(Self::with_document(encode_snapshot(state)?))
    }

    /// The raw stored document.
    pub fn document(&self) -> Option<String> {
        self.document.lock().ok().and_then(|doc| doc.clone())
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl SessionStore for InMemorySessionStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn load(&self) -> DomainResult<LoadedSnapshot> {
        let document = self
            .document
            .lock()
            .map_err(|_| DomainError::Persistence("memory store lock poisoned".to_string()))?;
        Ok(document
            .as_deref()
            .map_or(LoadedSnapshot::Absent, decode_snapshot))
    }

    fn save(&self, state: &SessionState) -> DomainResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(DomainError::Persistence("simulated save failure".to_string()));
        }
        let encoded = encode_snapshot(state)?;
        let mut document = self
            .document
            .lock()
            .map_err(|_| DomainError::Persistence("memory store lock poisoned".to_string()))?;
        *document = Some(encoded);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
