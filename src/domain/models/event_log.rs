//! Bounded, newest-first operational event log.
//!
//! Entries are only ever prepended. Once the log is full the oldest entries
//! fall off the end; existing entries are never reordered or edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smallest permitted log capacity.
pub const MIN_EVENT_LOG_CAPACITY: usize = 50;
/// Largest permitted log capacity.
pub const MAX_EVENT_LOG_CAPACITY: usize = 100;
/// Capacity used when nothing else is configured.
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = MIN_EVENT_LOG_CAPACITY;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    /// Top severity tag, reserved for conditions the operator must see.
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Whether this level reports a problem.
    pub fn is_problem(&self) -> bool {
        matches!(self, Self::Warning | Self::Error | Self::Critical)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    /// Wall-clock time of the append, `HH:MM:SS` UTC.
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    fn new(message: impl Into<String>, level: LogLevel, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: at.format("%H:%M:%S").to_string(),
            level,
            message: message.into(),
        }
    }
}

/// Append-only, size-capped event log ordered newest-first.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    capacity: usize,
}

// Capacity is configuration, not content; it is not persisted.
impl PartialEq for EventLog {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    /// Create an empty log. The capacity is clamped into the permitted range.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.clamp(MIN_EVENT_LOG_CAPACITY, MAX_EVENT_LOG_CAPACITY),
        }
    }

    /// Rebuild a log from decoded entries, keeping the newest `capacity`.
    pub fn from_entries(mut entries: Vec<LogEntry>, capacity: usize) -> Self {
        let mut log = Self::with_capacity(capacity);
        entries.truncate(log.capacity);
        log.entries = entries;
        log
    }

    /// Append an entry stamped with the current time.
    pub fn append(&mut self, message: impl Into<String>, level: LogLevel) -> &LogEntry {
        self.append_at(message, level, Utc::now())
    }

    /// Append an entry stamped with `at`.
    pub fn append_at(
        &mut self,
        message: impl Into<String>,
        level: LogLevel,
        at: DateTime<Utc>,
    ) -> &LogEntry {
        self.entries.insert(0, LogEntry::new(message, level, at));
        self.entries.truncate(self.capacity);
        &self.entries[0]
    }

    /// Change the capacity, dropping the oldest entries if it shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.clamp(MIN_EVENT_LOG_CAPACITY, MAX_EVENT_LOG_CAPACITY);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry, if any.
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.first()
    }

    /// Messages of the newest `count` entries, newest first.
    pub fn recent_messages(&self, count: usize) -> Vec<&str> {
        self.entries
            .iter()
            .take(count)
            .map(|e| e.message.as_str())
            .collect()
    }
}

impl Serialize for EventLog {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EventLog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Trimmed to the configured capacity once the owner applies it.
        let entries = Vec::<LogEntry>::deserialize(deserializer)?;
        Ok(Self::from_entries(entries, MAX_EVENT_LOG_CAPACITY))
    }
}
