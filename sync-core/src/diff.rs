//! Item diff cache for listing polls.
//!
//! Each poll returns the full listing for the session. The cache remembers
//! which items have already been queued for download so that only unseen
//! or changed items are handed to the download engine.
//!
//! An item is considered new when its name has never been recorded, or when
//! it was recorded with a different `updated_date` (the file changed
//! remotely and must be fetched again).

use std::collections::{HashMap, HashSet};
use session_sync_types::FileItem;

/// Tracks previously observed file items by name and last-updated timestamp.
#[derive(Debug, Clone, Default)]
pub struct ItemDiffCache {
    /// Name → last recorded `updated_date`.
    recorded: HashMap<String, u64>,
}

impl ItemDiffCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the candidates not yet recorded, in the candidates' order.
    ///
    /// Does not mutate the cache. A name repeated within `candidates` with the
    /// same timestamp is returned once.
    pub fn new_items(&self, candidates: &[FileItem]) -> Vec<FileItem> {
        let mut seen = HashSet::new();
        candidates
            .iter()
            .filter(|item| self.is_new(item))
            .filter(|item| seen.insert((item.name.as_str(), item.updated_date)))
            .cloned()
            .collect()
    }

    /// Record items as seen. Re-committing an item is a no-op.
    pub fn commit(&mut self, items: &[FileItem]) {
        for item in items {
            self.recorded.insert(item.name.clone(), item.updated_date);
        }
    }

    /// Check whether a single item would be reported as new.
    pub fn is_new(&self, item: &FileItem) -> bool {
        self.recorded.get(&item.name) != Some(&item.updated_date)
    }

    /// Number of recorded items.
    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }

    /// Forget every recorded item.
    pub fn reset(&mut self) {
        self.recorded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, updated: u64) -> FileItem {
        FileItem::new(name, updated)
    }

    #[test]
    fn empty_cache_returns_everything_in_order() {
        let cache = ItemDiffCache::new();
        let candidates = vec![item("c", 1), item("a", 1), item("b", 1)];
        assert_eq!(cache.new_items(&candidates), candidates);
    }

    #[test]
    fn new_items_does_not_mutate() {
        let cache = ItemDiffCache::new();
        let candidates = vec![item("a", 1)];
        assert_eq!(cache.new_items(&candidates).len(), 1);
        assert_eq!(cache.new_items(&candidates).len(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn committed_items_are_not_returned() {
        let mut cache = ItemDiffCache::new();
        cache.commit(&[item("a", 1), item("b", 1)]);

        let fresh = cache.new_items(&[item("a", 1), item("b", 1), item("c", 1)]);
        assert_eq!(fresh, vec![item("c", 1)]);
    }

    #[test]
    fn changed_timestamp_is_new() {
        let mut cache = ItemDiffCache::new();
        cache.commit(&[item("a", 1)]);

        assert_eq!(cache.new_items(&[item("a", 2)]), vec![item("a", 2)]);

        cache.commit(&[item("a", 2)]);
        assert!(cache.new_items(&[item("a", 2)]).is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn commit_is_idempotent() {
        let mut cache = ItemDiffCache::new();
        cache.commit(&[item("a", 1)]);
        cache.commit(&[item("a", 1)]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn duplicates_within_candidates_returned_once() {
        let cache = ItemDiffCache::new();
        let fresh = cache.new_items(&[item("a", 1), item("b", 1), item("a", 1)]);
        assert_eq!(fresh, vec![item("a", 1), item("b", 1)]);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut cache = ItemDiffCache::new();
        cache.commit(&[item("a", 1)]);
        cache.reset();
        assert!(cache.is_empty());
        assert_eq!(cache.new_items(&[item("a", 1)]).len(), 1);
    }
}
