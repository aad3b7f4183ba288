//! Growable handle registry.
//!
//! Vendor libraries and simulation callbacks create resources with no fixed
//! upper bound. [`UnlimitedHandleResource`] grows its slot vector on demand
//! and only fails once the 16-bit index space is used up.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::handle::{Handle, HandleType, INVALID_HANDLE};
use crate::registry::{HandleRegistry, MAX_CAPACITY, VersionPolicy};
use crate::slot::SlotState;

/// Registry of caller-constructed structs with no fixed capacity.
///
/// A single mutex guards the slot vector, since growing it moves every slot.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rivet_hal::handle::HandleType;
/// use rivet_hal::unlimited::UnlimitedHandleResource;
///
/// struct Callback { name: &'static str }
///
/// let callbacks = UnlimitedHandleResource::new(HandleType::Vendor);
/// let handle = callbacks.allocate(Arc::new(Callback { name: "gyro" }));
///
/// let released = callbacks.free(handle).unwrap();
/// assert_eq!(released.name, "gyro");
/// assert!(callbacks.get(handle).is_none());
/// ```
pub struct UnlimitedHandleResource<T> {
    kind: HandleType,
    policy: VersionPolicy,
    slots: Mutex<Vec<SlotState<T>>>,
}

impl<T> UnlimitedHandleResource<T> {
    /// Creates an empty registry that checks handle versions.
    #[must_use]
    pub fn new(kind: HandleType) -> Self {
        Self::with_version_policy(kind, VersionPolicy::Checked)
    }

    /// Creates an empty registry with an explicit version policy.
    #[must_use]
    pub fn with_version_policy(kind: HandleType, policy: VersionPolicy) -> Self {
        Self {
            kind,
            policy,
            slots: Mutex::new(Vec::new()),
        }
    }

    /// Stores `value` in the first free slot, growing if none is free.
    ///
    /// Returns [`INVALID_HANDLE`] once every 16-bit index is in use.
    pub fn allocate(&self, value: Arc<T>) -> Handle {
        let mut slots = self.slots.lock();

        let index = match slots.iter().position(|slot| slot.value.is_none()) {
            Some(index) => index,
            None if slots.len() < MAX_CAPACITY => {
                slots.push(SlotState::empty());
                slots.len() - 1
            }
            None => {
                tracing::warn!(kind = %self.kind, "unlimited handle registry exhausted 16-bit index space");
                return INVALID_HANDLE;
            }
        };

        let slot = &mut slots[index];
        slot.value = Some(value);
        Handle::new(index as u16, self.kind, slot.version)
    }

    fn locate(&self, handle: Handle) -> Option<(usize, u8)> {
        let decoded = handle.decode().ok()?;
        (decoded.kind == self.kind).then_some((usize::from(decoded.index), decoded.version))
    }

    fn version_matches(&self, slot: &SlotState<T>, version: u8) -> bool {
        self.policy == VersionPolicy::Unchecked || slot.version == version
    }

    /// Looks up the struct behind `handle`.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<Arc<T>> {
        let (index, version) = self.locate(handle)?;
        let slots = self.slots.lock();
        let slot = slots.get(index)?;
        if !self.version_matches(slot, version) {
            return None;
        }
        slot.value.clone()
    }

    /// Releases the slot behind `handle` and hands back its struct.
    ///
    /// Returns `None` (and does nothing) for invalid or stale handles.
    pub fn free(&self, handle: Handle) -> Option<Arc<T>> {
        let (index, version) = self.locate(handle)?;
        let mut slots = self.slots.lock();
        let slot = slots.get_mut(index)?;
        if !self.version_matches(slot, version) {
            return None;
        }
        slot.release(self.policy)
    }

    /// Calls `f` for every occupied slot.
    ///
    /// The registry lock is held for the whole walk, so `f` must not call
    /// back into this registry.
    pub fn for_each(&self, mut f: impl FnMut(Handle, &T)) {
        let slots = self.slots.lock();
        for (index, slot) in slots.iter().enumerate() {
            if let Some(value) = &slot.value {
                f(Handle::new(index as u16, self.kind, slot.version), value);
            }
        }
    }
}

impl<T: Send + Sync + 'static> HandleRegistry for UnlimitedHandleResource<T> {
    fn kind(&self) -> HandleType {
        self.kind
    }

    fn reset_handles(&self) {
        let mut slots = self.slots.lock();
        for slot in slots.iter_mut() {
            slot.release(self.policy);
        }
        tracing::debug!(kind = %self.kind, "reset handles");
    }

    fn allocated_count(&self) -> usize {
        self.slots
            .lock()
            .iter()
            .filter(|slot| slot.value.is_some())
            .count()
    }
}
