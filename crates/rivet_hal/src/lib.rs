//! Typed handle registries for hardware resources (Layer 1).
//!
//! `rivet_hal` maps opaque 32-bit integer handles to heap-resident resource
//! state. Every handle carries its slot index, an 8-bit version and a resource
//! type tag, so a handle minted by one registry can never silently index into
//! another.
//!
//! - [`handle`] - Bit-packed [`Handle`](handle::Handle) newtype and its encode/decode
//! - [`limited`] - Fixed-capacity, first-fit registry
//! - [`indexed`] - Fixed-capacity registry addressed by caller-chosen channel
//! - [`unlimited`] - Growable registry for vendor resources
//! - [`context`] - Explicitly constructed owner of one registry per resource type
//!
//! # Failure Semantics
//!
//! None of the registries panic or return errors for ordinary operating
//! conditions. Capacity exhaustion yields [`INVALID_HANDLE`](handle::INVALID_HANDLE),
//! stale or wrong-type handles yield `None` from `get` and are ignored by
//! `free`. Callers in control loops check sentinels instead of unwinding.
//!
//! # Example
//!
//! ```
//! use rivet_hal::context::HalContext;
//! use rivet_hal::handle::HandleType;
//! use rivet_hal::limited::LimitedHandleResource;
//!
//! #[derive(Default)]
//! struct Encoder { ticks: i64 }
//!
//! let hal = HalContext::new();
//! let encoders = hal
//!     .register(LimitedHandleResource::<Encoder, 8>::new(HandleType::Encoder))
//!     .unwrap();
//!
//! let handle = encoders.allocate();
//! assert!(handle.is_valid());
//! assert_eq!(encoders.get(handle).unwrap().ticks, 0);
//!
//! encoders.free(handle);
//! assert!(encoders.get(handle).is_none());
//! ```

/// Explicit owner of per-type registries.
pub mod context;

/// Error types for setup-time failures.
pub mod error;

/// Handle encoding and decoding.
pub mod handle;

/// Channel-addressed registry.
pub mod indexed;

/// First-fit fixed-capacity registry.
pub mod limited;

/// Shared registry trait.
pub mod registry;

/// Growable registry.
pub mod unlimited;

mod slot;

pub use error::HalError;
pub use handle::{DecodedHandle, Handle, HandleType, INVALID_HANDLE};
pub use registry::{HandleRegistry, VersionPolicy};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::context::*;
    pub use crate::error::*;
    pub use crate::handle::*;
    pub use crate::indexed::*;
    pub use crate::limited::*;
    pub use crate::registry::*;
    pub use crate::unlimited::*;
}
