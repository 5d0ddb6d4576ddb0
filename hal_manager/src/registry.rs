//! HAL registry.
//!
//! Provides a `HalRegistry` that owns every known HAL entry. Entries live in a
//! slot arena addressed by generational `HalHandle`s: removed slots become
//! tombstones and may be reused under a new generation, so a handle kept past
//! removal never reaches another HAL. Iteration order is
//! most-recently-added-first.

use hal_common::consts::MAX_HALS;
use hal_common::hal::types::{HalEntry, HalHandle, HalStatus};
use thiserror::Error;

/// Error types for registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An entry with the same API name exists.
    #[error("HAL '{0}' is already registered")]
    Duplicate(String),

    /// No live entry for the handle.
    #[error("HAL entry {0} not found")]
    NotFound(HalHandle),

    /// Internal HALs cannot be removed at runtime.
    #[error("HAL '{0}' is internal and cannot be removed")]
    Protected(String),

    /// Capacity limit reached or allocation failed.
    #[error("HAL registry exhausted ({0} entries)")]
    Exhausted(usize),
}

/// One arena slot. `entry == None` is a tombstone.
#[derive(Debug)]
struct Slot {
    generation: u32,
    seq: u64,
    entry: Option<HalEntry>,
}

/// Registry of known HALs.
///
/// Constructed once at manager startup and owned by the manager context.
/// Iteration is most-recent-first; handles of removed entries never match again.
#[derive(Debug)]
pub struct HalRegistry {
    slots: Vec<Slot>,
    free: Vec<usize>,
    next_seq: u64,
    len: usize,
    max_entries: usize,
}

impl HalRegistry {
    /// Create an empty registry with the default capacity limit.
    pub fn new() -> Self {
        Self::with_limit(MAX_HALS)
    }

    /// Create an empty registry holding at most `max_entries` HALs.
    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            next_seq: 0,
            len: 0,
            max_entries,
        }
    }

    /// Add an entry; it becomes the first in iteration order.
    ///
    /// # Errors
    /// `Duplicate` if the API name is taken, `Exhausted` if the capacity limit
    /// is reached or the slot table cannot grow.
    pub fn add(&mut self, entry: HalEntry) -> Result<HalHandle, RegistryError> {
        if self.search_by_name(&entry.api_name).is_some() {
            return Err(RegistryError::Duplicate(entry.api_name));
        }
        if self.len >= self.max_entries {
            return Err(RegistryError::Exhausted(self.len));
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots
                    .try_reserve(1)
                    .map_err(|_| RegistryError::Exhausted(self.len))?;
                self.slots.push(Slot {
                    generation: 0,
                    seq,
                    entry: None,
                });
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[index];
        slot.seq = seq;
        slot.entry = Some(entry);
        self.len += 1;

        Ok(HalHandle::new(index, slot.generation))
    }

    /// Remove an external entry by identity and hand it back.
    ///
    /// # Errors
    /// `NotFound` for stale or unknown handles, `Protected` for internal HALs.
    pub fn remove(&mut self, handle: HalHandle) -> Result<HalEntry, RegistryError> {
        let entry = self.get(handle).ok_or(RegistryError::NotFound(handle))?;
        if entry.is_internal() {
            return Err(RegistryError::Protected(entry.api_name.clone()));
        }
        self.discard(handle).ok_or(RegistryError::NotFound(handle))
    }

    /// Drop every entry, internal ones included. Teardown only.
    ///
    /// Returns the number of entries released.
    pub fn clear(&mut self) -> usize {
        let released = self.len;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            // handles issued before the clear must never match a new entry
            if slot.entry.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
            }
        }
        self.len = 0;
        released
    }

    /// Number of live entries.
    pub fn count(&self) -> usize {
        self.len
    }

    /// True when no entry is registered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entry for `handle`, if still live.
    pub fn get(&self, handle: HalHandle) -> Option<&HalEntry> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.entry.as_ref())
    }

    /// Mutable entry for `handle`, if still live.
    pub fn get_mut(&mut self, handle: HalHandle) -> Option<&mut HalEntry> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.entry.as_mut())
    }

    /// Handle of the entry named `api_name`.
    pub fn search_by_name(&self, api_name: &str) -> Option<HalHandle> {
        self.iter()
            .find(|(_, entry)| entry.api_name == api_name)
            .map(|(handle, _)| handle)
    }

    /// Most recently added `Ready` entry bound to `card_id`.
    pub fn search_ready_by_card_id(&self, card_id: u32) -> Option<HalHandle> {
        self.iter()
            .find(|(_, entry)| {
                entry.status == HalStatus::Ready && entry.snd_card_id == Some(card_id)
            })
            .map(|(handle, _)| handle)
    }

    /// Live entries, most recently added first.
    pub fn iter(&self) -> impl Iterator<Item = (HalHandle, &HalEntry)> {
        let mut live: Vec<(u64, HalHandle, &HalEntry)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.entry
                    .as_ref()
                    .map(|entry| (slot.seq, HalHandle::new(index, slot.generation), entry))
            })
            .collect();
        live.sort_by(|a, b| b.0.cmp(&a.0));
        live.into_iter().map(|(_, handle, entry)| (handle, entry))
    }

    /// Vacate a slot whatever the entry's origin, bumping its generation.
    ///
    /// Used to roll back a provisioning that could not complete.
    pub(crate) fn discard(&mut self, handle: HalHandle) -> Option<HalEntry> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation())?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        self.len -= 1;
        Some(entry)
    }
}

impl Default for HalRegistry {
    fn default() -> Self {
        Self::new()
    }
}
