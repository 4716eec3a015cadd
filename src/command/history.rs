use std::collections::VecDeque;

use crate::error::SceneError;
use crate::raster::AssetId;
use crate::scene::{HistorySnapshot, SceneStore};

/// One committed state in the undo log
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub snapshot: HistorySnapshot,
    pub label: &'static str,
}

/// Bounded log of full scene snapshots used for undo.
///
/// The newest entry always mirrors the last committed scene state. Once the log
/// holds more than `capacity` entries the oldest one is evicted. Undo drops the
/// newest entry and hands back the one below it; it never goes below a single
/// entry. There is no redo.
#[derive(Debug)]
pub struct HistoryManager {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryManager {
    /// Creates an empty history that keeps at most `capacity` snapshots
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Snapshot the store and append it to the log, evicting the oldest entries past capacity
    pub fn capture(&mut self, store: &SceneStore, label: &'static str) -> Result<(), SceneError> {
        let snapshot = store.snapshot()?;
        self.push(HistoryEntry { snapshot, label });
        Ok(())
    }

    /// Append an already taken snapshot
    pub fn push(&mut self, entry: HistoryEntry) {
        log::debug!(
            "History capture #{} ({}), {} entries",
            entry.snapshot.sequence(),
            entry.label,
            self.entries.len() + 1
        );
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                log::debug!("Evicted snapshot #{}", evicted.snapshot.sequence());
            }
        }
    }

    /// Drop the newest snapshot and return the one that is now newest.
    ///
    /// Returns `None` and leaves the log unchanged when there is nothing earlier to revert to.
    pub fn undo(&mut self) -> Option<HistorySnapshot> {
        if self.entries.len() <= 1 {
            log::debug!("Nothing to undo");
            return None;
        }
        let undone = self.entries.pop_back()?;
        log::debug!("Undid {} (#{})", undone.label, undone.snapshot.sequence());
        self.entries.back().map(|entry| entry.snapshot.clone())
    }

    /// Returns true if there is an earlier state to revert to
    pub fn can_undo(&self) -> bool {
        self.entries.len() > 1
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

    /// Oldest first
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + ExactSizeIterator {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Every asset some retained snapshot still needs
    pub fn referenced_assets(&self) -> impl Iterator<Item = &AssetId> {
        self.entries.iter().flat_map(|entry| entry.snapshot.assets())
    }

    /// Forget every snapshot
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::factory;
    use egui::Color32;

    #[test]
    fn test_capacity_is_at_least_one() {
        assert_eq!(HistoryManager::new(0).capacity(), 1);
    }

    #[test]
    fn test_undo_returns_previous_state() {
        let mut store = SceneStore::default();
        let mut history = HistoryManager::new(10);
        history.capture(&store, "Initial").unwrap();
        store.add_object(factory::default_circle(Color32::RED));
        history.capture(&store, "Add Circle").unwrap();

        let previous = history.undo().unwrap();
        assert!(previous.scene().unwrap().objects.is_empty());
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_reset_empties_log() {
        let store = SceneStore::default();
        let mut history = HistoryManager::new(3);
        history.capture(&store, "a").unwrap();
        history.capture(&store, "b").unwrap();
        history.reset();
        assert!(history.is_empty());
        assert!(history.undo().is_none());
    }
}
