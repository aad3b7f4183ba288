//! Cooperative command scheduling for robot code (Layer 1).
//!
//! Robot behavior is expressed as [`Command`]s that require exclusive use of
//! [`Subsystem`]s. A single-threaded [`CommandScheduler`] is ticked once per
//! control period and arbitrates which command owns which subsystem.
//!
//! - [`subsystem`] - Subsystem trait and shared handles
//! - [`command`] - Command lifecycle trait and shared handles
//! - [`scheduler`] - The scheduler cycle, conflict resolution and defaults
//! - [`trigger`] / [`event_loop`] - Condition-driven scheduling
//! - [`functional`] / [`group`] - Closure commands and command composition
//! - [`hooks`] - Named lifecycle observers
//! - [`requests`] - Deferred schedule/cancel requests
//! - [`telemetry`] - Snapshots and caught faults for dashboards
//! - [`watchdog`] - Loop overrun detection
//!
//! # Fault Isolation
//!
//! A panic in any user callback is caught, logged through `tracing` and
//! recorded as a [`Fault`](telemetry::Fault). The offending command is
//! evicted; the rest of the cycle carries on.
//!
//! # Example
//!
//! ```
//! use rivet_command::prelude::*;
//!
//! struct Drivetrain;
//! impl Subsystem for Drivetrain {}
//!
//! let drive = SubsystemRef::new(Drivetrain);
//! let mut scheduler = CommandScheduler::new();
//! scheduler.set_robot_state(RobotState::Teleop);
//!
//! let forward = CommandRef::new(FunctionalCommand::run(|| {}).requiring(&drive).named("Forward"));
//! let turn = CommandRef::new(FunctionalCommand::run(|| {}).requiring(&drive).named("Turn"));
//!
//! assert_eq!(scheduler.schedule(&forward), ScheduleOutcome::Scheduled);
//! assert_eq!(scheduler.schedule(&turn), ScheduleOutcome::Scheduled);
//! scheduler.run();
//!
//! assert!(!scheduler.is_scheduled(&forward));
//! assert_eq!(scheduler.requiring(drive.id()), Some(turn));
//! ```

/// Time sources, including a controllable mock for tests.
pub mod clock;

/// The command trait and shared command handles.
pub mod command;

/// Scheduler setup errors.
pub mod error;

/// Polled collections of condition bindings.
pub mod event_loop;

/// Commands assembled from closures.
pub mod functional;

/// Sequential and parallel command groups.
pub mod group;

/// Lifecycle observers.
pub mod hooks;

/// Requests deferred to the end of the cycle.
pub mod requests;

/// The command scheduler.
pub mod scheduler;

/// The subsystem trait and shared subsystem handles.
pub mod subsystem;

/// Snapshot publishing and fault records.
pub mod telemetry;

/// Condition triggers.
pub mod trigger;

/// Loop overrun detection.
pub mod watchdog;

pub use command::{Command, CommandId, CommandRef, InterruptionBehavior};
pub use error::SchedulerError;
pub use scheduler::{CommandScheduler, RobotState, ScheduleOutcome, SchedulerConfig};
pub use subsystem::{Subsystem, SubsystemId, SubsystemRef};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::command::*;
    pub use crate::error::*;
    pub use crate::event_loop::*;
    pub use crate::functional::*;
    pub use crate::group::*;
    pub use crate::hooks::*;
    pub use crate::requests::*;
    pub use crate::scheduler::*;
    pub use crate::subsystem::*;
    pub use crate::telemetry::*;
    pub use crate::trigger::*;
    pub use crate::watchdog::*;
}
