//! File-backed session snapshot.
//!
//! The snapshot is a single pretty-printed JSON document. Saves go through a
//! temp file in the same directory followed by an atomic rename, so a crash
//! mid-write leaves the previous snapshot intact.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::SessionState;
use crate::domain::ports::session_store::{decode_snapshot, encode_snapshot};
use crate::domain::ports::{LoadedSnapshot, SessionStore};

/// Session store writing a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSessionStore {
    path: PathBuf,
}

impl JsonFileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl SessionStore for JsonFileSessionStore {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> DomainResult<LoadedSnapshot> {
        let content = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadedSnapshot::Absent);
            }
            Err(e) => {
                return Err(DomainError::Persistence(format!(
                    "Failed to read session file {}: {e}",
                    self.path.display()
                )));
            }
        };

        // Invalid UTF-8 is just another form of corruption.
        match String::from_utf8(content) {
            Ok(text) => Ok(decode_snapshot(&text)),
            Err(e) => Ok(LoadedSnapshot::Corrupt {
                reason: e.to_string(),
            }),
        }
    }

    fn save(&self, state: &SessionState) -> DomainResult<()> {
        let content = encode_snapshot(state)?;
        let parent_dir = self.parent_dir();
        std::fs::create_dir_all(&parent_dir)?;

        let mut temp_file = NamedTempFile::new_in(&parent_dir).map_err(|e| {
            DomainError::Persistence(format!("Temp file error: {e}"))
        })?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| DomainError::Persistence(format!("Failed to write temp session file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| DomainError::Persistence(format!("Failed to flush temp session file: {e}")))?;
        temp_file.persist(&self.path).map_err(|e| {
            DomainError::Persistence(format!("Failed to write session file: {}", e.error))
        })?;

        debug!(path = %self.path.display(), bytes = content.len(), "session snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::LogLevel;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_absent() {
        let dir = tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path().join("session.json"));
        assert_eq!(store.load().unwrap(), LoadedSnapshot::Absent);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("session.json");
        let store = JsonFileSessionStore::new(&path);
        store.save(&SessionState::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path().join("session.json"));
        let mut state = SessionState {
            uptime_seconds: 321,
            last_active_timestamp: 1_700_000_000_123,
            total_processed: 98_765,
            precision_rate: 91.25,
            coverage_index: 44.5,
            lock_strength: 12.75,
            ..Default::default()
        };
        state.event_log.append("Tracking started", LogLevel::Success);

        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), LoadedSnapshot::Decoded(state));
    }

    #[test]
    fn test_overwrite_replaces_previous() {
        let dir = tempdir().unwrap();
        let store = JsonFileSessionStore::new(dir.path().join("session.json"));
        store
            .save(&SessionState {
                uptime_seconds: 1,
                ..Default::default()
            })
            .unwrap();
        store
            .save(&SessionState {
                uptime_seconds: 2,
                ..Default::default()
            })
            .unwrap();

        let LoadedSnapshot::Decoded(state) = store.load().unwrap() else {
            panic!("expected decoded snapshot");
        };
        assert_eq!(state.uptime_seconds, 2);
        // Only the snapshot itself remains; no temp files leak.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFileSessionStore::new(&path);
        assert!(matches!(store.load().unwrap(), LoadedSnapshot::Corrupt { .. }));
    }

    #[test]
    fn test_invalid_utf8_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let store = JsonFileSessionStore::new(&path);
        assert!(matches!(store.load().unwrap(), LoadedSnapshot::Corrupt { .. }));
    }

    #[test]
    fn test_empty_file_is_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "").unwrap();
        let store = JsonFileSessionStore::new(&path);
        assert_eq!(store.load().unwrap(), LoadedSnapshot::Absent);
    }
}
