//! Unsaved-change tracking for the property store.

use std::time::Instant;

/// Tracks mutations since the last successful snapshot.
///
/// A save that fails leaves the tracker dirty so the next flush retries.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    dirty: bool,
    last_change: Option<Instant>,
    /// Reset when saved.
    first_unsaved_change: Option<Instant>,
    saving: bool,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn mark_dirty(&mut self) {
        let now = Instant::now();
        self.dirty = true;
        self.last_change = Some(now);
        if self.first_unsaved_change.is_none() {
            self.first_unsaved_change = Some(now);
        }
    }

    pub fn start_save(&mut self) {
        self.saving = true;
    }

    pub fn save_complete(&mut self) {
        self.dirty = false;
        self.saving = false;
        self.first_unsaved_change = None;
    }

    pub fn save_failed(&mut self) {
        self.saving = false;
    }

    pub fn ms_since_last_change(&self) -> Option<u64> {
        self.last_change.map(|t| t.elapsed().as_millis() as u64)
    }

    pub fn ms_since_first_unsaved(&self) -> Option<u64> {
        self.first_unsaved_change
            .map(|t| t.elapsed().as_millis() as u64)
    }
}
