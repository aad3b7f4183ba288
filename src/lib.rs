//! Typed hardware handle registries and a cooperative command scheduler for
//! competition robots.

pub use rivet_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use rivet_internal::prelude::*;
}
