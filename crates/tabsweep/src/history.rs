//! Recently evicted tabs.
//!
//! The scheduler reports every successful eviction to a [`HistorySink`]
//! exactly once. [`ClosedTabHistory`] is the stock sink: newest first,
//! de-duplicated by resource, capped at a configurable length.

use chrono::{DateTime, Local};
use serde::Serialize;
use url::Url;

/// Receiver of eviction records.
pub trait HistorySink {
    fn record_evicted(&mut self, uri: Option<&Url>, label: &str);

    /// Apply a new length cap after a configuration change.
    fn resize(&mut self, max_entries: usize) {
        let _ = max_entries;
    }
}

/// One evicted tab.
#[derive(Serialize, Debug, Clone)]
pub struct ClosedTab {
    pub uri: Option<Url>,
    pub label: String,
    pub closed_at: DateTime<Local>,
}

impl ClosedTab {
    /// Identity used for de-duplication: the resource, else the label.
    fn identity(&self) -> &str {
        self.uri.as_ref().map_or(self.label.as_str(), Url::as_str)
    }
}

/// Bounded, newest-first list of evicted tabs.
#[derive(Debug, Clone)]
pub struct ClosedTabHistory {
    entries: Vec<ClosedTab>,
    /// Maximum retained entries. `0` keeps everything.
    max_entries: usize,
}

impl Default for ClosedTabHistory {
    fn default() -> Self {
        Self::new(crate::DEFAULT_MAX_HISTORY)
    }
}

impl ClosedTabHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[ClosedTab] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Change the cap, trimming the oldest entries if needed.
    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries;
        self.trim();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, entry: ClosedTab) {
        let identity = entry.identity().to_string();
        self.entries.retain(|e| e.identity() != identity);
        self.entries.insert(0, entry);
        self.trim();
    }

    fn trim(&mut self) {
        if self.max_entries > 0 && self.entries.len() > self.max_entries {
            self.entries.truncate(self.max_entries);
        }
    }
}

impl HistorySink for ClosedTabHistory {
    fn record_evicted(&mut self, uri: Option<&Url>, label: &str) {
        self.push(ClosedTab {
            uri: uri.cloned(),
            label: label.to_string(),
            closed_at: Local::now(),
        });
    }

    fn resize(&mut self, max_entries: usize) {
        self.set_max_entries(max_entries);
    }
}
