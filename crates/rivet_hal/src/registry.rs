//! The trait shared by every handle registry.

use crate::handle::HandleType;

/// Largest number of slots a registry can address with a 16-bit index.
pub const MAX_CAPACITY: usize = 1 << 16;

/// Whether a registry verifies the version field of incoming handles.
///
/// On the embedded target handles are never reused across resets within one
/// program run, so the check is skipped there. Simulation and desktop builds
/// keep it on so that a handle minted before a reset or free reads as stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionPolicy {
    /// Compare the handle's version against the slot's current version.
    #[default]
    Checked,
    /// Only the type tag and index are checked.
    Unchecked,
}

/// Object-safe view over a registry of any struct type.
///
/// [`HalContext`](crate::context::HalContext) stores registries behind this
/// trait so it can reset all of them without knowing their payload types.
pub trait HandleRegistry: Send + Sync + 'static {
    /// The resource type this registry mints handles for.
    fn kind(&self) -> HandleType;

    /// Drops every stored struct and makes every outstanding handle stale.
    fn reset_handles(&self);

    /// Returns the number of occupied slots.
    fn allocated_count(&self) -> usize;
}
