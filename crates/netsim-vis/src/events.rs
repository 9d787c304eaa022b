//! Rolling event log shown next to the canvas.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of entries kept.
pub const DEFAULT_LOG_CAPACITY: usize = 10;

/// One human-readable log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    pub message: String,
}

/// Bounded log of the most recent events, newest first.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl EventLog {
    /// Create a log that keeps at most `capacity` entries (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a message stamped with the current time.
    pub fn push(&mut self, message: impl Into<String>) {
        self.push_at(now_ms(), message);
    }

    /// Record a message with an explicit timestamp.
    pub fn push_at(&mut self, timestamp_ms: u64, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "netsim_vis::events", "{}", message);

        self.entries.push_front(LogEntry {
            timestamp_ms,
            message,
        });
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy of the entries, newest first.
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}

/// Current timestamp in milliseconds.
fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first() {
        let mut log = EventLog::default();
        log.push_at(1, "first");
        log.push_at(2, "second");

        let messages: Vec<_> = log.entries().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["second", "first"]);
        assert_eq!(log.latest().map(|e| e.timestamp_ms), Some(2));
    }

    #[test]
    fn keeps_only_capacity_entries() {
        let mut log = EventLog::default();
        for i in 0..25 {
            log.push_at(i, format!("event {}", i));
        }

        assert_eq!(log.len(), DEFAULT_LOG_CAPACITY);
        assert_eq!(log.latest().map(|e| e.message.as_str()), Some("event 24"));
        assert_eq!(log.entries().last().map(|e| e.message.as_str()), Some("event 15"));
    }

    #[test]
    fn zero_capacity_keeps_one() {
        let mut log = EventLog::new(0);
        log.push("a");
        log.push("b");
        assert_eq!(log.len(), 1);
        assert_eq!(log.capacity(), 1);
    }

    #[test]
    fn push_stamps_current_time() {
        let mut log = EventLog::default();
        log.push("now");
        assert!(log.latest().is_some_and(|e| e.timestamp_ms > 0));
    }
}
