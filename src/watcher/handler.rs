//! Event handler for resource file changes

use indexmap::IndexMap;
use notify::{Event, EventKind};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Maximum number of pending paths before the oldest are released early
const MAX_PENDING_ENTRIES: usize = 10_000;

/// Coalesces bursts of file events into one reload.
///
/// A path becomes ready once no further event for it has arrived for the
/// debounce duration, so an editor's write-rename-write sequence is seen as
/// a single change.
pub struct EventHandler {
    /// Last event time by path (IndexMap preserves insertion order)
    pending: IndexMap<PathBuf, Instant>,

    /// Debounce duration
    debounce: Duration,
}

impl EventHandler {
    /// Create a new event handler with the given debounce duration
    pub fn new(debounce: Duration) -> Self {
        Self {
            pending: IndexMap::new(),
            debounce,
        }
    }

    /// Record the resource paths touched by an event. Returns how many were
    /// recorded.
    pub fn record(&mut self, event: &Event, now: Instant) -> usize {
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return 0;
        }

        let mut recorded = 0;
        for path in event.paths.iter().filter(|p| is_resource_file(p)) {
            // Re-inserting moves nothing; the timestamp is what matters
            self.pending.insert(path.clone(), now);
            recorded += 1;
        }
        recorded
    }

    /// Paths whose last event is older than the debounce duration
    pub fn take_ready(&mut self, now: Instant) -> Vec<PathBuf> {
        let debounce = self.debounce;
        let overflow = self.pending.len() > MAX_PENDING_ENTRIES;

        let mut ready = Vec::new();
        self.pending.retain(|path, &mut last| {
            if overflow || now.saturating_duration_since(last) >= debounce {
                ready.push(path.clone());
                false
            } else {
                true
            }
        });
        ready
    }

    /// True if any change is still settling
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// True for `*.yaml` / `*.yml` files
pub fn is_resource_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}
