//! Concurrent physical-line store shared between the ingest task and the
//! viewport manager.
//!
//! Mirrors the shutdown-signaling shape `core-input`'s async input source
//! already uses: an `Arc<AtomicBool>` flag for the binary "is ingest done"
//! question (checked far more often than it changes, so a mutex would be
//! wasted ceremony) plus a `Notify` so readers blocked on "no new lines yet"
//! wake promptly instead of polling.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::error::CoreError;
use core_text::color::ColorAttr;

/// One line of input as read from the source, tagged with its 0-based
/// sequence number and the color attribute active when ingest read it (the
/// color a fresh logical-line generation pass should start from).
#[derive(Debug, Clone)]
pub struct PhysicalLine {
    pub line_number: u64,
    pub initial_color: ColorAttr,
    pub text: String,
}

struct Inner {
    lines: Vec<PhysicalLine>,
    bytes: u64,
}

/// Shared store the ingest task appends to and the viewport manager reads
/// from. Cheap to clone (all state is behind `Arc`); clones refer to the same
/// underlying store.
#[derive(Clone)]
pub struct LineStore {
    inner: Arc<Mutex<Inner>>,
    ingest_complete: Arc<AtomicBool>,
    out_of_memory: Arc<AtomicBool>,
    notify: Arc<Notify>,
    byte_budget: u64,
    high_water: Arc<AtomicU64>,
}

impl LineStore {
    /// `byte_budget` bounds total ingested text; exceeding it sets the
    /// out-of-memory flag and further pushes are rejected rather than
    /// growing the store unboundedly.
    pub fn new(byte_budget: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                lines: Vec::new(),
                bytes: 0,
            })),
            ingest_complete: Arc::new(AtomicBool::new(false)),
            out_of_memory: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            byte_budget,
            high_water: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append one line read from the source. Wakes any task blocked in
    /// `wait_for_more`.
    pub fn push(&self, line: PhysicalLine) -> Result<(), CoreError> {
        if self.out_of_memory.load(Ordering::Acquire) {
            return Err(CoreError::OutOfMemory {
                limit_bytes: self.byte_budget,
            });
        }
        let mut guard = self.inner.lock().expect("line store mutex poisoned");
        let incoming = line.text.len() as u64;
        if guard.bytes + incoming > self.byte_budget {
            drop(guard);
            self.out_of_memory.store(true, Ordering::Release);
            return Err(CoreError::OutOfMemory {
                limit_bytes: self.byte_budget,
            });
        }
        guard.bytes += incoming;
        guard.lines.push(line);
        self.high_water.store(guard.lines.len() as u64, Ordering::Release);
        drop(guard);
        self.notify.notify_waiters();
        Ok(())
    }

    pub fn mark_ingest_complete(&self) {
        self.ingest_complete.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_ingest_complete(&self) -> bool {
        self.ingest_complete.load(Ordering::Acquire)
    }

    pub fn is_out_of_memory(&self) -> bool {
        self.out_of_memory.load(Ordering::Acquire)
    }

    /// Total lines currently stored.
    pub fn len(&self) -> u64 {
        self.high_water.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot `count` lines starting at `start` (0-based), clamped to what's
    /// available. Returns fewer than `count` lines at end of input.
    pub fn snapshot_from(&self, start: u64, count: u64) -> Vec<PhysicalLine> {
        let guard = self.inner.lock().expect("line store mutex poisoned");
        let start = start as usize;
        if start >= guard.lines.len() {
            return Vec::new();
        }
        let end = ((start as u64 + count) as usize).min(guard.lines.len());
        guard.lines[start..end].to_vec()
    }

    /// Wait until either a new line has been pushed or ingest has completed,
    /// whichever comes first. Returns immediately if either is already true
    /// relative to `known_len`.
    pub async fn wait_for_more(&self, known_len: u64) {
        if self.len() > known_len || self.is_ingest_complete() {
            return;
        }
        let notified = self.notify.notified();
        if self.len() > known_len || self.is_ingest_complete() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: u64, text: &str) -> PhysicalLine {
        PhysicalLine {
            line_number: n,
            initial_color: ColorAttr::default_attr(),
            text: text.to_string(),
        }
    }

    #[test]
    fn push_and_snapshot_round_trip() {
        let store = LineStore::new(1024);
        store.push(line(0, "one")).unwrap();
        store.push(line(1, "two")).unwrap();
        assert_eq!(store.len(), 2);
        let snap = store.snapshot_from(0, 10);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].text, "one");
        assert_eq!(snap[1].text, "two");
    }

    #[test]
    fn snapshot_past_end_is_empty() {
        let store = LineStore::new(1024);
        store.push(line(0, "one")).unwrap();
        assert!(store.snapshot_from(5, 10).is_empty());
    }

    #[test]
    fn exceeding_byte_budget_sets_out_of_memory() {
        let store = LineStore::new(4);
        assert!(store.push(line(0, "toolong")).is_err());
        assert!(store.is_out_of_memory());
        assert!(store.push(line(1, "x")).is_err());
    }

    #[test]
    fn ingest_complete_flag_round_trips() {
        let store = LineStore::new(1024);
        assert!(!store.is_ingest_complete());
        store.mark_ingest_complete();
        assert!(store.is_ingest_complete());
    }

    #[tokio::test]
    async fn wait_for_more_returns_once_line_pushed() {
        let store = LineStore::new(1024);
        let waiter = store.clone();
        let handle = tokio::spawn(async move {
            waiter.wait_for_more(0).await;
        });
        store.push(line(0, "one")).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn wait_for_more_returns_on_ingest_complete_with_no_new_lines() {
        let store = LineStore::new(1024);
        store.mark_ingest_complete();
        store.wait_for_more(0).await;
    }
}
