//! Errors raised while setting up the periodic driver.

use std::time::Duration;

use rivet_command::SchedulerError;
use rivet_hal::HalError;
use thiserror::Error;

/// Errors returned by [`TimedRobot`](crate::robot::TimedRobot) setup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RobotError {
    /// The loop period must be non-zero.
    #[error("invalid loop period {period:?}")]
    InvalidPeriod {
        /// The rejected period.
        period: Duration,
    },

    /// A scheduler setup call failed.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// A handle registry setup call failed.
    #[error(transparent)]
    Hal(#[from] HalError),
}
