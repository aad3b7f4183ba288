//! One-way, best-effort state publishing for dashboards.
//!
//! Once per cycle the scheduler offers a [`SchedulerSnapshot`] to an attached
//! [`SchedulerSink`]. The sink can hand back cancel requests, which is how a
//! dashboard "cancel" button reaches a running command.

use core::any::Any;
use core::fmt;

use crate::command::CommandId;
use crate::hooks::HookPoint;

// ─────────────────────────────────────────────────────────────────────────────
// Fault
// ─────────────────────────────────────────────────────────────────────────────

/// Where a caught panic came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultOrigin {
    /// A command callback.
    Command {
        /// The command's id.
        id: CommandId,
        /// The command's name.
        name: String,
        /// The callback that panicked, such as `"execute"`.
        phase: &'static str,
    },
    /// A subsystem's periodic callback.
    Subsystem {
        /// The subsystem's name.
        name: String,
    },
    /// A button binding.
    Binding,
    /// A lifecycle hook.
    Hook {
        /// The hook's registered name.
        name: String,
        /// The point it was registered at.
        point: HookPoint,
    },
    /// The telemetry sink itself.
    Sink,
}

/// A panic caught inside the scheduler cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// What panicked.
    pub origin: FaultOrigin,
    /// The panic message, when it was a string.
    pub message: String,
}

impl Fault {
    pub(crate) fn new(origin: FaultOrigin, payload: &(dyn Any + Send)) -> Self {
        Self {
            origin,
            message: panic_message(payload),
        }
    }

    pub(crate) fn hook(name: &str, point: HookPoint, payload: &(dyn Any + Send)) -> Self {
        Self::new(
            FaultOrigin::Hook {
                name: name.to_owned(),
                point,
            },
            payload,
        )
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            FaultOrigin::Command { name, phase, .. } => write!(f, "{name}.{phase}()")?,
            FaultOrigin::Subsystem { name } => write!(f, "{name}.periodic()")?,
            FaultOrigin::Binding => f.write_str("button binding")?,
            FaultOrigin::Hook { name, point } => write!(f, "hook '{name}' ({point:?})")?,
            FaultOrigin::Sink => f.write_str("telemetry sink")?,
        }
        write!(f, " panicked: {}", self.message)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_owned()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot / Sink
// ─────────────────────────────────────────────────────────────────────────────

/// Scheduler state offered to the sink at the end of each cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    /// Names of the scheduled commands, in scheduling order.
    pub names: Vec<String>,
    /// Ids of the scheduled commands, parallel to `names`.
    pub ids: Vec<CommandId>,
    /// Faults caught since the previous snapshot.
    pub faults: Vec<Fault>,
}

impl SchedulerSnapshot {
    /// Returns `true` if a command with `id` was scheduled.
    #[must_use]
    pub fn contains(&self, id: CommandId) -> bool {
        self.ids.contains(&id)
    }
}

/// Receiver of scheduler snapshots.
///
/// Publishing must not block; a sink that talks to a network should queue
/// the snapshot and return.
pub trait SchedulerSink: Send {
    /// Receives the current snapshot.
    fn publish(&mut self, snapshot: &SchedulerSnapshot);

    /// Returns ids of commands an operator asked to cancel since the last call.
    fn take_cancel_requests(&mut self) -> Vec<CommandId> {
        Vec::new()
    }
}
