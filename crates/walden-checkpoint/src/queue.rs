// SPDX-FileCopyrightText: 2026 Walden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The seam between the checkpoint policy and whoever runs checkpoints.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A shared queue of databases waiting for a checkpoint.
///
/// Implementations are shared by every handle in the process, so all
/// methods take `&self` and must be cheap: they run inside commit hooks.
pub trait CheckpointQueue: Send + Sync {
    /// Add `pages` to the running tally for `path` and return the new tally.
    fn accumulate(&self, path: &str, pages: u32) -> u64;

    /// Request a checkpoint of `path` after `delay`, replacing any earlier
    /// request for the same path.
    fn put(&self, path: &str, delay: Duration);

    /// Forget `path` entirely.
    fn remove(&self, path: &str);
}

/// What is waiting for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    /// Pages committed since the path was last handed out.
    pub pages: u64,
    /// Delay of the latest request.
    pub delay: Option<Duration>,
    /// When the latest request falls due.
    pub due: Option<Instant>,
}

/// In-memory [`CheckpointQueue`] that records tallies and due times.
///
/// The owner polls [`pop_due`](Self::pop_due) and runs the checkpoints.
#[derive(Debug, Default)]
pub struct ScheduledCheckpoints {
    pending: Mutex<HashMap<String, Pending>>,
}

impl ScheduledCheckpoints {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Pending>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn pending(&self, path: &str) -> Option<Pending> {
        self.lock().get(path).copied()
    }

    /// The earliest scheduled path and its due time.
    pub fn next_due(&self) -> Option<(String, Instant)> {
        self.lock()
            .iter()
            .filter_map(|(path, pending)| pending.due.map(|due| (path.clone(), due)))
            .min_by_key(|(_, due)| *due)
    }

    /// Hand out every path due at `now`, earliest first, resetting its tally.
    pub fn pop_due(&self, now: Instant) -> Vec<String> {
        let mut pending = self.lock();
        let mut due: Vec<(String, Instant)> = pending
            .iter()
            .filter_map(|(path, entry)| match entry.due {
                Some(at) if at <= now => Some((path.clone(), at)),
                _ => None,
            })
            .collect();
        due.sort_by_key(|(_, at)| *at);
        for (path, _) in &due {
            pending.remove(path);
        }
        due.into_iter().map(|(path, _)| path).collect()
    }

    /// Hand out every scheduled path regardless of due time.
    pub fn drain(&self) -> Vec<String> {
        let mut pending = self.lock();
        let mut paths: Vec<String> = pending
            .iter()
            .filter(|(_, entry)| entry.due.is_some())
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        for path in &paths {
            pending.remove(path);
        }
        paths
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl CheckpointQueue for ScheduledCheckpoints {
    fn accumulate(&self, path: &str, pages: u32) -> u64 {
        let mut pending = self.lock();
        let entry = pending.entry(path.to_string()).or_insert(Pending {
            pages: 0,
            delay: None,
            due: None,
        });
        entry.pages = entry.pages.saturating_add(u64::from(pages));
        entry.pages
    }

    fn put(&self, path: &str, delay: Duration) {
        let mut pending = self.lock();
        let entry = pending.entry(path.to_string()).or_insert(Pending {
            pages: 0,
            delay: None,
            due: None,
        });
        entry.delay = Some(delay);
        entry.due = Some(Instant::now() + delay);
    }

    fn remove(&self, path: &str) {
        self.lock().remove(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulate_keeps_a_running_tally() {
        let queue = ScheduledCheckpoints::new();
        assert_eq!(queue.accumulate("/a.db", 3), 3);
        assert_eq!(queue.accumulate("/a.db", 4), 7);
        assert_eq!(queue.accumulate("/b.db", 1), 1);
        assert_eq!(queue.pending("/a.db").unwrap().pages, 7);
        assert!(queue.pending("/a.db").unwrap().due.is_none());
    }

    #[test]
    fn put_replaces_the_previous_request() {
        let queue = ScheduledCheckpoints::new();
        queue.put("/a.db", Duration::from_secs(10));
        let first = queue.pending("/a.db").unwrap().due.unwrap();
        queue.put("/a.db", Duration::from_secs(1));
        let second = queue.pending("/a.db").unwrap();
        assert_eq!(second.delay, Some(Duration::from_secs(1)));
        assert!(second.due.unwrap() < first);
    }

    #[test]
    fn pop_due_hands_out_and_resets() {
        let queue = ScheduledCheckpoints::new();
        queue.accumulate("/a.db", 50);
        queue.put("/a.db", Duration::ZERO);
        queue.put("/later.db", Duration::from_secs(3600));

        let due = queue.pop_due(Instant::now());
        assert_eq!(due, vec!["/a.db".to_string()]);
        assert!(queue.pending("/a.db").is_none());
        assert_eq!(queue.accumulate("/a.db", 2), 2);
        assert_eq!(queue.next_due().unwrap().0, "/later.db");
    }

    #[test]
    fn drain_ignores_unscheduled_tallies() {
        let queue = ScheduledCheckpoints::new();
        queue.accumulate("/tally-only.db", 5);
        queue.put("/b.db", Duration::from_secs(60));
        queue.put("/a.db", Duration::from_secs(60));
        assert_eq!(queue.drain(), vec!["/a.db".to_string(), "/b.db".to_string()]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn remove_forgets_path() {
        let queue = ScheduledCheckpoints::new();
        queue.put("/a.db", Duration::from_secs(1));
        queue.remove("/a.db");
        assert!(queue.is_empty());
        assert!(queue.next_due().is_none());
    }
}
