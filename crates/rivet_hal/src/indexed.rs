//! Channel-addressed handle registry.
//!
//! Digital channels, PWM outputs and similar resources map one-to-one onto
//! physical channels, so the caller picks the slot instead of the registry.

use std::sync::Arc;

use crate::error::HalError;
use crate::handle::{Handle, HandleType};
use crate::registry::{HandleRegistry, MAX_CAPACITY, VersionPolicy};
use crate::slot::{Claim, SlotTable};

/// Registry of `N` structs where each slot is a fixed channel number.
///
/// Lookups, free and reset behave exactly like
/// [`LimitedHandleResource`](crate::limited::LimitedHandleResource).
///
/// # Example
///
/// ```
/// use rivet_hal::HalError;
/// use rivet_hal::handle::HandleType;
/// use rivet_hal::indexed::IndexedHandleResource;
///
/// #[derive(Default)]
/// struct DigitalPort { output: bool }
///
/// let dio = IndexedHandleResource::<DigitalPort, 10>::new(HandleType::Dio);
/// let port = dio.allocate(3).unwrap();
///
/// assert!(matches!(dio.allocate(3), Err(HalError::AlreadyAllocated { index: 3, .. })));
/// assert!(matches!(dio.allocate(10), Err(HalError::IndexOutOfRange { .. })));
/// # let _ = port;
/// ```
pub struct IndexedHandleResource<T, const N: usize> {
    table: SlotTable<T>,
}

impl<T: Send + Sync, const N: usize> IndexedHandleResource<T, N> {
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

    /// Returns the number of channels.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Claims channel `index` with a default-constructed struct.
    ///
    /// # Errors
    ///
    /// - [`HalError::IndexOutOfRange`] if `index >= N`
    /// - [`HalError::AlreadyAllocated`] if the channel is in use
    pub fn allocate(&self, index: usize) -> Result<Handle, HalError>
    where
        T: Default,
    {
        self.allocate_with(index, T::default)
    }

    /// Claims channel `index` with a struct built by `init`.
    ///
    /// # Errors
    ///
    /// Same as [`allocate`](Self::allocate).
    pub fn allocate_with(&self, index: usize, init: impl FnOnce() -> T) -> Result<Handle, HalError> {
        let kind = self.table.kind();
        match self.table.claim_at(index, init) {
            Claim::Claimed(handle) => {
                tracing::trace!(%kind, %handle, "allocated channel");
                Ok(handle)
            }
            Claim::Occupied => Err(HalError::AlreadyAllocated { kind, index }),
            Claim::OutOfRange => Err(HalError::IndexOutOfRange {
                kind,
                index,
                capacity: N,
            }),
        }
    }

    /// Looks up the struct behind `handle`.
    #[must_use]
    pub fn get(&self, handle: Handle) -> Option<Arc<T>> {
        self.table.get(handle)
    }

    /// Releases the channel behind `handle`; stale handles are ignored.
    pub fn free(&self, handle: Handle) {
        if self.table.free(handle).is_some() {
            tracing::trace!(kind = %self.table.kind(), %handle, "freed channel");
        }
    }
}

impl<T: Send + Sync + 'static, const N: usize> HandleRegistry for IndexedHandleResource<T, N> {
    fn kind(&self) -> HandleType {
        self.table.kind()
    }

    fn reset_handles(&self) {
        self.table.reset();
        tracing::debug!(kind = %self.table.kind(), "reset channels");
    }

    fn allocated_count(&self) -> usize {
        self.table.allocated_count()
    }
}

impl<T, const N: usize> core::fmt::Debug for IndexedHandleResource<T, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IndexedHandleResource")
            .field("kind", &self.table.kind())
            .field("capacity", &N)
            .finish_non_exhaustive()
    }
}
