//! Volatile state store for tests and ephemeral keys.

use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::state::StateStore;

/// Keeps the snapshot in memory. Clones share the same slot, so a clone
/// taken before a restart simulation observes all persisted updates.
///
/// Offers no durability; a key backed by this store must not outlive the
/// process.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStateStore {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.slot.lock().unwrap().clone())
    }

    fn persist(&self, state: &[u8]) -> Result<()> {
        *self.slot.lock().unwrap() = Some(state.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_slot() {
        let a = InMemoryStateStore::new();
        let b = a.clone();
        assert_eq!(a.load().unwrap(), None);
        a.persist(&[1, 2, 3]).unwrap();
        assert_eq!(b.load().unwrap(), Some(vec![1, 2, 3]));
        b.persist(&[4]).unwrap();
        assert_eq!(a.load().unwrap(), Some(vec![4]));
    }
}
