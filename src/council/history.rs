//! Run history - a bounded, newest-first ring
//!
//! Explicit capacity, single writer, no process-wide singleton. The server
//! owns one behind its shared state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Persisted summary of one completed council run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub prompt: String,
    pub models: Vec<String>,
    pub final_answer: String,
    pub ts: DateTime<Utc>,
}

/// Bounded collection of run summaries, newest first.
#[derive(Debug)]
pub struct HistoryRing {
    capacity: usize,
    items: VecDeque<RunSummary>,
}

impl HistoryRing {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, items: VecDeque::with_capacity(capacity) }
    }

    /// Prepend an entry, evicting the oldest beyond capacity.
    pub fn append(&mut self, summary: RunSummary) {
        self.items.push_front(summary);
        self.items.truncate(self.capacity);
    }

    /// All entries, newest first.
    pub fn all(&self) -> Vec<RunSummary> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str) -> RunSummary {
        RunSummary {
            id: id.to_string(),
            prompt: "p".to_string(),
            models: vec!["a".to_string()],
            final_answer: "f".to_string(),
            ts: Utc::now(),
        }
    }

    #[test]
    fn newest_first_with_eviction_at_capacity() {
        let mut ring = HistoryRing::new(2);
        ring.append(summary("1"));
        ring.append(summary("2"));
        ring.append(summary("3"));

        let all = ring.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "3");
        assert_eq!(all[1].id, "2");
    }

    #[test]
    fn empty_ring_reports_empty() {
        let ring = HistoryRing::new(5);
        assert!(ring.is_empty());
        assert!(ring.all().is_empty());
    }
}
