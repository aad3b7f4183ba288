//! Fixed-capacity slot storage shared by the limited and indexed registries.
//!
//! Locking is two-tier. `allocate_lock` serializes allocation, free and reset
//! against each other; each slot's own mutex serializes access to that slot
//! only, so lookups on different slots never contend.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::handle::{Handle, HandleType, INVALID_HANDLE};
use crate::registry::VersionPolicy;

/// Contents of one slot.
pub(crate) struct SlotState<T> {
    pub(crate) value: Option<Arc<T>>,
    pub(crate) version: u8,
}

impl<T> SlotState<T> {
    pub(crate) fn empty() -> Self {
        Self {
            value: None,
            version: 0,
        }
    }

    /// Drops the stored struct and retires every handle minted for it.
    ///
    /// The version is 8 bits and wraps: after 256 releases of one slot, a
    /// handle from 256 generations ago matches the slot again.
    pub(crate) fn release(&mut self, policy: VersionPolicy) -> Option<Arc<T>> {
        let released = self.value.take();
        if policy == VersionPolicy::Checked {
            self.version = self.version.wrapping_add(1);
        }
        released
    }
}

/// Outcome of claiming a specific slot.
pub(crate) enum Claim {
    Claimed(Handle),
    Occupied,
    OutOfRange,
}

pub(crate) struct SlotTable<T> {
    kind: HandleType,
    policy: VersionPolicy,
    allocate_lock: Mutex<()>,
    slots: Box<[Mutex<SlotState<T>>]>,
}

impl<T> SlotTable<T> {
    pub(crate) fn new(kind: HandleType, policy: VersionPolicy, capacity: usize) -> Self {
        Self {
            kind,
            policy,
            allocate_lock: Mutex::new(()),
            slots: (0..capacity).map(|_| Mutex::new(SlotState::empty())).collect(),
        }
    }

    pub(crate) fn kind(&self) -> HandleType {
        self.kind
    }

    pub(crate) fn policy(&self) -> VersionPolicy {
        self.policy
    }

    fn mint(&self, index: usize, state: &SlotState<T>) -> Handle {
        // Capacity is bounded by MAX_CAPACITY, so the index fits in 16 bits.
        Handle::new(index as u16, self.kind, state.version)
    }

    /// Decodes `handle` against this table's type and bounds.
    fn locate(&self, handle: Handle) -> Option<(usize, u8)> {
        let decoded = handle.decode().ok()?;
        if decoded.kind != self.kind {
            return None;
        }
        let index = usize::from(decoded.index);
        (index < self.slots.len()).then_some((index, decoded.version))
    }

    fn version_matches(&self, state: &SlotState<T>, version: u8) -> bool {
        match self.policy {
            VersionPolicy::Checked => state.version == version,
            VersionPolicy::Unchecked => true,
        }
    }

    /// Stores a new struct in the lowest free slot.
    pub(crate) fn claim_first(&self, init: impl FnOnce() -> T) -> Handle {
        let _allocating = self.allocate_lock.lock();
        for (index, slot) in self.slots.iter().enumerate() {
            let mut state = slot.lock();
            if state.value.is_none() {
                state.value = Some(Arc::new(init()));
                return self.mint(index, &state);
            }
        }
        INVALID_HANDLE
    }

    /// Stores a new struct in the slot at `index`.
    pub(crate) fn claim_at(&self, index: usize, init: impl FnOnce() -> T) -> Claim {
        let Some(slot) = self.slots.get(index) else {
            return Claim::OutOfRange;
        };
        let _allocating = self.allocate_lock.lock();
        let mut state = slot.lock();
        if state.value.is_some() {
            return Claim::Occupied;
        }
        state.value = Some(Arc::new(init()));
        Claim::Claimed(self.mint(index, &state))
    }

    pub(crate) fn get(&self, handle: Handle) -> Option<Arc<T>> {
        let (index, version) = self.locate(handle)?;
        let state = self.slots[index].lock();
        if !self.version_matches(&state, version) {
            return None;
        }
        state.value.clone()
    }

    pub(crate) fn free(&self, handle: Handle) -> Option<Arc<T>> {
        let (index, version) = self.locate(handle)?;
        let _allocating = self.allocate_lock.lock();
        let mut state = self.slots[index].lock();
        if state.value.is_none() || !self.version_matches(&state, version) {
            return None;
        }
        state.release(self.policy)
    }

    pub(crate) fn reset(&self) {
        let _allocating = self.allocate_lock.lock();
        for slot in &self.slots {
            // Empty slots are bumped too: their last occupant's handles stay stale.
            slot.lock().release(self.policy);
        }
    }

    pub(crate) fn allocated_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.lock().value.is_some())
            .count()
    }

    /// Visits every occupied slot without holding its lock during `f`.
    pub(crate) fn for_each(&self, mut f: impl FnMut(Handle, &T)) {
        for (index, slot) in self.slots.iter().enumerate() {
            let entry = {
                let state = slot.lock();
                state
                    .value
                    .clone()
                    .map(|value| (self.mint(index, &state), value))
            };
            if let Some((handle, value)) = entry {
                f(handle, &value);
            }
        }
    }
}
