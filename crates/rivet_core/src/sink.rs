//! A telemetry sink that writes scheduler state to the log.

use std::sync::Arc;

use parking_lot::Mutex;
use rivet_command::command::{CommandId, CommandRef};
use rivet_command::telemetry::{SchedulerSink, SchedulerSnapshot};

/// Logs the running command set whenever it changes, and every caught fault.
///
/// Stands in for a dashboard when none is connected. Operators (or tests)
/// can still cancel commands through a [`CancelHandle`].
///
/// # Example
///
/// ```
/// use rivet_command::prelude::*;
/// use rivet_core::sink::LoggingSink;
///
/// let mut scheduler = CommandScheduler::new();
/// scheduler.set_robot_state(RobotState::Teleop);
/// let sink = LoggingSink::new();
/// let cancel = sink.cancel_handle();
/// scheduler.set_sink(sink);
///
/// let spin = CommandRef::new(FunctionalCommand::run(|| {}));
/// scheduler.schedule(&spin);
/// cancel.request(&spin);
/// scheduler.run();
/// assert!(!scheduler.is_scheduled(&spin));
/// ```
#[derive(Debug, Default)]
pub struct LoggingSink {
    last_names: Vec<String>,
    published: u64,
    cancels: CancelHandle,
}

impl LoggingSink {
    /// Creates a sink with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle for requesting cancellations from elsewhere.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancels.clone()
    }

    /// Returns how many snapshots were published.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.published
    }
}

impl SchedulerSink for LoggingSink {
    fn publish(&mut self, snapshot: &SchedulerSnapshot) {
        self.published += 1;
        if snapshot.names != self.last_names {
            tracing::info!(commands = ?snapshot.names, "running commands changed");
            self.last_names.clone_from(&snapshot.names);
        }
        for fault in &snapshot.faults {
            tracing::warn!(%fault, "scheduler fault");
        }
    }

    fn take_cancel_requests(&mut self) -> Vec<CommandId> {
        self.cancels.take()
    }
}

/// Cloneable sender of cancel requests for a [`LoggingSink`].
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    pending: Arc<Mutex<Vec<CommandId>>>,
}

impl CancelHandle {
    /// Asks the scheduler to cancel `command` at the end of the next cycle.
    pub fn request(&self, command: &CommandRef) {
        self.request_id(command.id());
    }

    /// Asks the scheduler to cancel the command with `id`.
    pub fn request_id(&self, id: CommandId) {
        let mut pending = self.pending.lock();
        if !pending.contains(&id) {
            pending.push(id);
        }
    }

    fn take(&self) -> Vec<CommandId> {
        core::mem::take(&mut *self.pending.lock())
    }
}
