use std::sync::{Arc, PoisonError, RwLock};

use crate::app::{FeedmeError, Result};
use crate::domain::{Item, ItemId};

/// Session-local story snapshot addressed by 1-indexed pseudo-ids.
///
/// Every refresh swaps in a whole new snapshot. Readers clone the `Arc`
/// under a short read lock, so they always see one complete snapshot.
#[derive(Default)]
pub struct StoryCache {
    snapshot: RwLock<Arc<Vec<Item>>>,
}

impl StoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot and return the pseudo-ids of the new stories.
    pub fn replace(&self, items: Vec<Item>) -> Vec<ItemId> {
        let ids = (1..=items.len() as ItemId).collect();
        let mut guard = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(items);
        ids
    }

    pub fn get(&self, id: ItemId) -> Result<Item> {
        let snapshot = self.snapshot();
        lookup(&snapshot, id)
            .cloned()
            .ok_or(FeedmeError::ItemNotFound(id))
    }

    /// Resolve every id; unknown ids become empty slots.
    pub fn get_many(&self, ids: &[ItemId]) -> Vec<Option<Item>> {
        let snapshot = self.snapshot();
        ids.iter()
            .map(|&id| lookup(&snapshot, id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Arc<Vec<Item>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn lookup(items: &[Item], id: ItemId) -> Option<&Item> {
    let index = usize::try_from(id).ok()?.checked_sub(1)?;
    items.get(index)
}
