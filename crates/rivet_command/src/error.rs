//! Setup-time errors raised by the scheduler.

use crate::hooks::HookPoint;
use crate::subsystem::SubsystemId;

/// Errors for scheduling requests that are programming mistakes.
///
/// Runtime conflicts between commands are not errors; they surface as
/// [`ScheduleOutcome::Rejected`](crate::scheduler::ScheduleOutcome::Rejected).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// A default command must require the subsystem it is installed on.
    #[error("default command '{command}' does not require subsystem '{subsystem}'")]
    DefaultCommandMissingRequirement {
        /// Name of the rejected command.
        command: String,
        /// Name of the subsystem.
        subsystem: String,
    },

    /// Two children of a parallel group require the same subsystem.
    #[error("multiple commands in a parallel group require subsystem {subsystem}")]
    ParallelRequirementConflict {
        /// The subsystem claimed twice.
        subsystem: SubsystemId,
    },

    /// A hook with this name is already registered at this point.
    #[error("hook '{name}' already registered for {point:?}")]
    DuplicateHook {
        /// Where the duplicate was found.
        point: HookPoint,
        /// The duplicate hook name.
        name: String,
    },
}
