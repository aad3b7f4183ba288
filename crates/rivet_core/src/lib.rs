//! Runtime around the scheduler: the periodic driver, tracing setup and a
//! logging telemetry sink (Layer 2).
//!
//! - [`robot`] - [`TimedRobot`](robot::TimedRobot) and the [`RobotProgram`](robot::RobotProgram) trait
//! - [`tracing_config`] - Subscriber installation
//! - [`sink`] - [`LoggingSink`](sink::LoggingSink) for running without a dashboard
//! - [`error`] - [`RobotError`]
//!
//! # Architecture
//!
//! - **Layer 1** (`rivet_hal`, `rivet_command`): handle registries and the
//!   command scheduler, independent of each other
//! - **Layer 2** (`rivet_core`): the driver that owns both (this crate)

/// Driver setup errors.
pub mod error;

/// The periodic driver.
pub mod robot;

/// Logging telemetry sink.
pub mod sink;

/// Tracing subscriber setup.
pub mod tracing_config;

pub use error::RobotError;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::error::*;
    pub use crate::robot::*;
    pub use crate::sink::*;
    pub use crate::tracing_config::*;
}
