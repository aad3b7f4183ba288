//! Error types for handle registries.
//!
//! Ordinary runtime conditions (capacity exhaustion, stale handles) are
//! reported with sentinels, not errors. [`HalError`] covers the remaining
//! cases where the caller asked for something specific and must be told why
//! it was refused.

use crate::handle::HandleType;
use thiserror::Error;

/// Errors returned by channel-addressed allocation and context registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// The requested channel is outside the registry's capacity.
    #[error("{kind} index {index} out of range (capacity {capacity})")]
    IndexOutOfRange {
        /// Registry type.
        kind: HandleType,
        /// Requested index.
        index: usize,
        /// Registry capacity.
        capacity: usize,
    },

    /// The requested channel is already in use.
    #[error("{kind} index {index} is already allocated")]
    AlreadyAllocated {
        /// Registry type.
        kind: HandleType,
        /// Requested index.
        index: usize,
    },

    /// A registry for this resource type is already registered.
    #[error("a registry for {0} is already registered")]
    DuplicateRegistry(HandleType),
}
