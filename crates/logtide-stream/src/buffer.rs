use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use logtide_types::{LogEvent, LogLevel};

/// Default number of events kept in memory
pub const DEFAULT_CAPACITY: usize = 200;

/// Shared, immutable handle to a buffered event
pub type ArcLogEvent = Arc<LogEvent>;

/// Bounded, newest-first buffer of log events.
///
/// Cloning yields another handle to the same storage, so a renderer can take
/// snapshots while the supervisor that owns the session keeps pushing.
#[derive(Clone)]
pub struct StreamBuffer {
    /// Newest entry at the front
    entries: Arc<RwLock<VecDeque<ArcLogEvent>>>,

    /// Maximum number of entries held
    capacity: usize,

    /// Next event ID
    next_id: Arc<AtomicU64>,
}

impl StreamBuffer {
    /// Create a new buffer holding at most `capacity` events (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity + 1))),
            capacity,
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Insert at the front, dropping the oldest entry once over capacity
    pub fn push(&self, mut event: LogEvent) {
        event.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.entries.write();
        entries.push_front(Arc::new(event));
        while entries.len() > self.capacity {
            entries.pop_back();
        }
    }

    /// Copy of the current contents, newest first
    pub fn snapshot(&self) -> Vec<ArcLogEvent> {
        self.entries.read().iter().cloned().collect()
    }

    /// Remove every entry and restart IDs
    pub fn clear(&self) {
        self.entries.write().clear();
        self.next_id.store(0, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get entry count per log level
    pub fn level_counts(&self) -> LevelCounts {
        let entries = self.entries.read();
        let mut counts = LevelCounts::default();

        for event in entries.iter() {
            match event.level {
                LogLevel::Error => counts.error += 1,
                LogLevel::Warn => counts.warn += 1,
                LogLevel::Info => counts.info += 1,
                LogLevel::Debug => counts.debug += 1,
            }
        }

        counts
    }

    /// Export buffered events as text lines, newest first
    pub fn export_lines(&self) -> String {
        self.entries
            .read()
            .iter()
            .map(|e| format!("{} {:<5} {}", e.timestamp.to_rfc3339(), e.level, e.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Counts per log level
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelCounts {
    pub error: usize,
    pub warn: usize,
    pub info: usize,
    pub debug: usize,
}

impl LevelCounts {
    pub fn total(&self) -> usize {
        self.error + self.warn + self.info + self.debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(n: usize) -> LogEvent {
        LogEvent::new(LogLevel::Info, format!("event {n}"), Utc::now())
    }

    #[test]
    fn test_newest_first() {
        let buffer = StreamBuffer::new(10);
        buffer.push(event(1));
        buffer.push(event(2));
        buffer.push(event(3));

        let messages: Vec<_> = buffer.snapshot().iter().map(|e| e.message.clone()).collect();
        assert_eq!(messages, vec!["event 3", "event 2", "event 1"]);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let buffer = StreamBuffer::new(5);
        for n in 0..50 {
            buffer.push(event(n));
            assert!(buffer.len() <= 5);
            assert_eq!(buffer.snapshot()[0].message, format!("event {n}"));
        }
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let buffer = StreamBuffer::default();
        for n in 1..=201 {
            buffer.push(event(n));
        }

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), DEFAULT_CAPACITY);
        assert!(snapshot.iter().all(|e| e.message != "event 1"));
        assert_eq!(snapshot.first().unwrap().message, "event 201");
        assert_eq!(snapshot.last().unwrap().message, "event 2");
    }

    #[test]
    fn test_snapshot_is_detached() {
        let buffer = StreamBuffer::new(3);
        buffer.push(event(1));
        let before = buffer.snapshot();

        buffer.push(event(2));
        buffer.push(event(3));
        buffer.push(event(4));

        assert_eq!(before.len(), 1);
        assert_eq!(before[0].message, "event 1");
    }

    #[test]
    fn test_clear_resets_ids() {
        let buffer = StreamBuffer::new(4);
        buffer.push(event(1));
        buffer.push(event(2));
        assert_eq!(buffer.snapshot()[0].id, 1);

        buffer.clear();
        assert!(buffer.is_empty());

        buffer.push(event(3));
        assert_eq!(buffer.snapshot()[0].id, 0);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let buffer = StreamBuffer::new(0);
        buffer.push(event(1));
        buffer.push(event(2));
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.snapshot()[0].message, "event 2");
    }

    #[test]
    fn test_level_counts() {
        let buffer = StreamBuffer::new(10);
        buffer.push(LogEvent::new(LogLevel::Error, "a", Utc::now()));
        buffer.push(LogEvent::new(LogLevel::Error, "b", Utc::now()));
        buffer.push(LogEvent::new(LogLevel::Debug, "c", Utc::now()));

        let counts = buffer.level_counts();
        assert_eq!(counts.error, 2);
        assert_eq!(counts.debug, 1);
        assert_eq!(counts.total(), 3);
    }
}
