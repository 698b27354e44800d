use std::collections::BTreeSet;

use tokio::sync::watch;
use tracing::trace;

/// Business keys of entities with unsaved in-memory changes.
///
/// Entities created in this session (no surrogate key yet) are kept apart
/// from modified persisted ones. Whether a save inserts or updates is still
/// decided by looking the key up in the store.
///
/// The "has unsaved changes" flag is published on a watch channel; a
/// presentation layer can await it or poll `borrow()`.
#[derive(Debug)]
pub struct ChangeTracker {
    new: BTreeSet<String>,
    modified: BTreeSet<String>,
    notifier: watch::Sender<bool>,
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeTracker {
    pub fn new() -> Self {
        let (notifier, _) = watch::channel(false);
        Self {
            new: BTreeSet::new(),
            modified: BTreeSet::new(),
            notifier,
        }
    }

    /// Records a change to a persisted entity. Idempotent.
    pub fn mark_dirty(&mut self, key: &str) {
        if !self.new.contains(key) {
            self.modified.insert(key.to_string());
        }
        trace!("Marked {} dirty", key);
        self.publish();
    }

    /// Records an entity created in this session.
    pub fn mark_new(&mut self, key: &str) {
        self.modified.remove(key);
        self.new.insert(key.to_string());
        trace!("Marked {} new", key);
        self.publish();
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        self.new.contains(key) || self.modified.contains(key)
    }

    pub fn is_new(&self, key: &str) -> bool {
        self.new.contains(key)
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !self.new.is_empty() || !self.modified.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new.len() + self.modified.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_unsaved_changes()
    }

    pub fn new_keys(&self) -> impl Iterator<Item = &str> {
        self.new.iter().map(String::as_str)
    }

    pub fn modified_keys(&self) -> impl Iterator<Item = &str> {
        self.modified.iter().map(String::as_str)
    }

    /// All dirty keys, new ones first.
    pub fn dirty_keys(&self) -> Vec<String> {
        self.new.iter().chain(self.modified.iter()).cloned().collect()
    }

    /// Drops the given keys after they were persisted.
    pub fn remove<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) {
        for key in keys {
            self.new.remove(key);
            self.modified.remove(key);
        }
        self.publish();
    }

    /// Stops tracking a deleted entity.
    pub fn forget(&mut self, key: &str) {
        self.remove([key]);
    }

    /// Empties the tracker. Only valid after a fully successful save.
    pub fn clear(&mut self) {
        self.new.clear();
        self.modified.clear();
        self.publish();
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.notifier.subscribe()
    }

    fn publish(&self) {
        let dirty = self.has_unsaved_changes();
        self.notifier.send_if_modified(|current| {
            if *current == dirty {
                false
            } else {
                *current = dirty;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_dirty_is_idempotent() {
        let mut tracker = ChangeTracker::new();
        assert!(!tracker.has_unsaved_changes());

        tracker.mark_dirty("INV-001");
        tracker.mark_dirty("INV-001");

        assert!(tracker.has_unsaved_changes());
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.modified_keys().collect::<Vec<_>>(), vec!["INV-001"]);
    }

    #[test]
    fn test_new_and_modified_are_separate() {
        let mut tracker = ChangeTracker::new();
        tracker.mark_new("INV-002");
        tracker.mark_dirty("INV-001");
        // Editing a new entity keeps it new.
        tracker.mark_dirty("INV-002");

        assert_eq!(tracker.new_keys().collect::<Vec<_>>(), vec!["INV-002"]);
        assert_eq!(tracker.modified_keys().collect::<Vec<_>>(), vec!["INV-001"]);
        assert_eq!(tracker.dirty_keys(), vec!["INV-002", "INV-001"]);
        assert!(tracker.is_new("INV-002"));
        assert!(!tracker.is_new("INV-001"));
    }

    #[test]
    fn test_remove_keeps_remaining_keys() {
        let mut tracker = ChangeTracker::new();
        tracker.mark_dirty("A");
        tracker.mark_dirty("B");
        tracker.remove(["A"]);

        assert!(!tracker.is_dirty("A"));
        assert!(tracker.is_dirty("B"));
        assert!(tracker.has_unsaved_changes());
    }

    #[test]
    fn test_clear_resets_flag() {
        let mut tracker = ChangeTracker::new();
        tracker.mark_new("A");
        tracker.mark_dirty("B");
        tracker.clear();

        assert!(tracker.is_empty());
        assert!(tracker.dirty_keys().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_flag_changes() {
        let mut tracker = ChangeTracker::new();
        let mut rx = tracker.subscribe();
        assert!(!*rx.borrow());

        tracker.mark_dirty("INV-001");
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());

        // No transition, no notification.
        tracker.mark_dirty("INV-002");
        assert!(!rx.has_changed().unwrap());

        tracker.clear();
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
    }
}
