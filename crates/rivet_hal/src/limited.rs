//! Fixed-capacity, first-fit handle registry.
//!
//! [`LimitedHandleResource`] is the workhorse registry: one instance per
//! resource type, `N` slots, and handles that become stale as soon as their
//! slot is freed or the registry is reset.

use std::sync::Arc;

use crate::handle::{Handle, HandleType};
use crate::registry::{HandleRegistry, MAX_CAPACITY, VersionPolicy};
use crate::slot::SlotTable;

/// Registry of up to `N` structs of type `T`, addressed by [`Handle`].
///
/// # Concurrency
///
/// Allocation, free and reset are serialized by one registry-wide lock.
/// [`get`](Self::get) only takes the lock of the slot it reads, so lookups on
/// different slots proceed in parallel. Lock hold times are bounded by
/// in-memory pointer swaps.
///
/// # Shared Ownership
///
/// [`get`](Self::get) returns an [`Arc`]. A caller may keep using the struct
/// after another thread frees the handle; the struct is dropped when the last
/// reference goes away.
///
/// # Example
///
/// ```
/// use rivet_hal::handle::{HandleType, INVALID_HANDLE};
/// use rivet_hal::limited::LimitedHandleResource;
///
/// #[derive(Default)]
/// struct Notifier;
///
/// let notifiers = LimitedHandleResource::<Notifier, 2>::new(HandleType::Notifier);
/// let a = notifiers.allocate();
/// let b = notifiers.allocate();
/// assert_eq!(notifiers.allocate(), INVALID_HANDLE); // exhausted
///
/// notifiers.free(a);
/// assert!(notifiers.allocate().is_valid()); // capacity comes back
/// # let _ = b;
/// ```
pub struct LimitedHandleResource<T, const N: usize> {
    table: SlotTable<T>,
}

impl<T: Send + Sync, const N: usize> LimitedHandleResource<T, N> {
    /// Creates a registry that checks handle versions.
    #[must_use]
    pub fn new(kind: HandleType) -> Self {
        Self::with_version_policy(kind, VersionPolicy::Checked)
    }

    /// Creates a registry with an explicit version policy.
    #[must_use]
    pub fn with_version_policy(kind: HandleType, policy: VersionPolicy) -> Self {
        const {
            assert!(N > 0, "registry capacity must be non-zero");
            assert!(N <= MAX_CAPACITY, "registry capacity exceeds 16-bit index");
        }
        Self {
            table: SlotTable::new(kind, policy, N),
        }
    }

    /// Returns the number of slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns the version policy this registry was built with.
    #[must_use]
    pub fn version_policy(&self) -> VersionPolicy {
        self.table.policy()
    }

    /// Allocates a default-constructed struct in the first free slot.
    ///
    /// Returns [`INVALID_HANDLE`](crate::handle::INVALID_HANDLE) when every
    /// slot is occupied.
    pub fn allocate(&self) -> Handle
    where
        T: Default,
    {
        self.allocate_with(T::default)
    }

    /// Allocates a struct built by `init` in the first free slot.
    ///
    /// `init` runs while the slot is locked and must not touch this registry.
    pub fn allocate_with(&self, init: impl FnOnce() -> T) -> Handle {
        let handle = self.table.claim_first(init);
        if handle.is_valid() {
            tracing::trace!(kind = %self.table.kind(), %handle, "allocated handle");
        } else {
            tracing::debug!(kind = %self.table.kind(), capacity = N, "handle registry exhausted");
        }
        handle
    }

    /// Looks up the struct behind `handle`.
    ///
    /// Returns `None` for invalid, wrong-type, out-of-range, stale or freed
    /// handles. A handle counts as stale for the next 255 frees or resets of
    /// its slot; after 256 the version wraps and the old handle resolves to
    /// the slot's current occupant.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<Arc<T>> {
        self.table.get(handle)
    }

    /// Releases the registry's reference to the struct behind `handle`.
    ///
    /// Freeing an invalid, stale, wrong-type or already-freed handle does
    /// nothing.
    pub fn free(&self, handle: Handle) {
        if self.table.free(handle).is_some() {
            tracing::trace!(kind = %self.table.kind(), %handle, "freed handle");
        }
    }

    /// Calls `f` for every occupied slot.
    pub fn for_each(&self, f: impl FnMut(Handle, &T)) {
        self.table.for_each(f);
    }
}

impl<T: Send + Sync + 'static, const N: usize> HandleRegistry for LimitedHandleResource<T, N> {
    fn kind(&self) -> HandleType {
        self.table.kind()
    }

    fn reset_handles(&self) {
        self.table.reset();
        tracing::debug!(kind = %self.table.kind(), "reset handles");
    }

    fn allocated_count(&self) -> usize {
        self.table.allocated_count()
    }
}

impl<T, const N: usize> core::fmt::Debug for LimitedHandleResource<T, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LimitedHandleResource")
            .field("kind", &self.table.kind())
            .field("capacity", &N)
            .finish_non_exhaustive()
    }
}
