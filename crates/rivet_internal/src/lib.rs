//! # Rivet Internal Library
//!
//! Re-exports the core Rivet crates for convenience.

/// Layer 1: Typed handle registries.
pub use rivet_hal;

/// Layer 1: Cooperative command scheduler.
pub use rivet_command;

/// Layer 2: Periodic driver, tracing and telemetry.
pub use rivet_core;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use rivet_command::prelude::*;
    pub use rivet_core::prelude::*;
    pub use rivet_hal::prelude::*;
}
