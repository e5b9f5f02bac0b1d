use super::stone::Stone;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Human-readable description of a stone, as sent on the name-update topic
#[derive(Clone, Debug, PartialEq)]
pub struct Description {
    pub name: String,

    /// Display color; passed through untouched
    pub color: Value,
}

#[derive(Default)]
struct World {
    stones: BTreeMap<String, Stone>,
    descriptions: BTreeMap<String, Description>,
}

/// Read-only view of the world, valid for the duration of one
/// [`WorldState::read`] call
pub struct WorldSnapshot<'a> {
    pub stones: &'a BTreeMap<String, Stone>,
    pub descriptions: &'a BTreeMap<String, Description>,
}

/// Shared in-memory world state.
///
/// One lock guards stones and descriptions together, so every upsert and
/// every aggregation pass sees a single consistent instant.
#[derive(Default)]
pub struct WorldState {
    inner: Mutex<World>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, World> {
        // Every critical section leaves the maps consistent, so a panic
        // elsewhere does not invalidate them.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(super) fn is_locked(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Insert a stone, or merge its report into the stone already known
    /// under the same address
    pub fn upsert_stone(&self, stone: Stone) {
        let address = stone.address().to_string();

        // Logged after the guard is released
        let merged = {
            let mut world = self.lock();
            if let Some(existing) = world.stones.get_mut(&address) {
                let (_, timestamp, contacts) = stone.into_report();
                existing.update(timestamp, contacts);
                Some(existing.contacts().len())
            } else {
                world.stones.insert(address.clone(), stone);
                None
            }
        };

        match merged {
            Some(contacts) => debug!(stone = %address, contacts, "Merged stone report"),
            None => debug!(stone = %address, "New stone"),
        }
    }

    /// Overwrite the description for `address`
    pub fn upsert_description(&self, address: &str, name: String, color: Value) {
        self.lock()
            .descriptions
            .insert(address.to_string(), Description { name, color });
    }

    /// Run `f` against a consistent view of the world while holding the lock.
    ///
    /// Keep `f` short and free of I/O; nothing borrowed from the view can
    /// escape the call.
    pub fn read<R>(&self, f: impl FnOnce(WorldSnapshot<'_>) -> R) -> R {
        let world = self.lock();
        f(WorldSnapshot {
            stones: &world.stones,
            descriptions: &world.descriptions,
        })
    }

    /// Owned copy of a single stone
    pub fn get_stone(&self, address: &str) -> Option<Stone> {
        self.lock().stones.get(address).cloned()
    }

    /// Owned copy of all stones
    pub fn get_all_stones(&self) -> Vec<Stone> {
        self.lock().stones.values().cloned().collect()
    }

    pub fn get_description(&self, address: &str) -> Option<Description> {
        self.lock().descriptions.get(address).cloned()
    }

    pub fn stone_count(&self) -> usize {
        self.lock().stones.len()
    }
}
