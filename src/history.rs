//! Bounded ring of recent command invocations.
//!
//! FIFO with a configurable capacity (default 1000): when full, the oldest
//! entry is evicted on append. Entries carry everything the predictor and
//! the workflow learner need to reconstruct context later.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_HISTORY_SIZE;

/// One recorded command invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Monotonic per-session id.
    pub id: u64,
    /// The raw command line as typed.
    pub command_line: String,
    /// The parsed command (first token).
    pub command: String,
    /// Remaining tokens, in order.
    pub arguments: Vec<String>,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub working_directory: String,
    pub success: bool,
}

struct Inner {
    entries: VecDeque<HistoryEntry>,
    next_id: u64,
    capacity: usize,
}

/// Thread-safe bounded command history.
pub struct CommandHistory {
    inner: Mutex<Inner>,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }
}

impl CommandHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity.min(1024)),
                next_id: 1,
                capacity: capacity.max(1),
            }),
        }
    }

    /// Append an entry, assigning it the next id. Evicts the oldest entry
    /// when the ring is full. Returns the stored entry.
    pub fn append(
        &self,
        command_line: &str,
        command: &str,
        arguments: Vec<String>,
        timestamp: i64,
        working_directory: &str,
        success: bool,
    ) -> HistoryEntry {
        let mut inner = self.inner.lock().expect("history lock poisoned");
        let entry = HistoryEntry {
            id: inner.next_id,
            command_line: command_line.to_string(),
            command: command.to_string(),
            arguments,
            timestamp,
            working_directory: working_directory.to_string(),
            success,
        };
        inner.next_id += 1;
        if inner.entries.len() == inner.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(entry.clone());
        entry
    }

    /// The last `n` entries, newest first.
    pub fn get_recent(&self, n: usize) -> Vec<HistoryEntry> {
        let inner = self.inner.lock().expect("history lock poisoned");
        inner.entries.iter().rev().take(n).cloned().collect()
    }

    /// The most recent entry, if any.
    pub fn last(&self) -> Option<HistoryEntry> {
        let inner = self.inner.lock().expect("history lock poisoned");
        inner.entries.back().cloned()
    }

    /// All entries, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        let inner = self.inner.lock().expect("history lock poisoned");
        inner.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("history lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().expect("history lock poisoned").capacity
    }

    pub fn clear(&self) {
        self.inner
            .lock()
            .expect("history lock poisoned")
            .entries
            .clear();
    }
}
