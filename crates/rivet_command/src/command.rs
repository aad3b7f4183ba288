//! The [`Command`] trait and the shared [`CommandRef`] handle the scheduler tracks.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::subsystem::{SubsystemId, short_type_name};

static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

// ─────────────────────────────────────────────────────────────────────────────
// CommandId
// ─────────────────────────────────────────────────────────────────────────────

/// Process-unique identity of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    fn next() -> Self {
        Self(NEXT_COMMAND_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command#{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// InterruptionBehavior
// ─────────────────────────────────────────────────────────────────────────────

/// What happens when another command wants one of this command's requirements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InterruptionBehavior {
    /// This command is interrupted and the incoming one is scheduled.
    #[default]
    CancelSelf,
    /// This command keeps running and the incoming one is rejected.
    CancelIncoming,
}

impl InterruptionBehavior {
    /// Returns `true` for [`CancelSelf`](Self::CancelSelf).
    #[must_use]
    pub fn is_interruptible(self) -> bool {
        self == Self::CancelSelf
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Command
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of robot behavior polled once per scheduler cycle.
///
/// The scheduler drives a command through `initialize`, then `execute` and
/// `is_finished` every cycle, then exactly one call to `end`. Each callback
/// must return quickly: the whole cycle shares one control period.
///
/// # Example
///
/// ```
/// use rivet_command::command::Command;
///
/// struct CountDown { remaining: u32 }
///
/// impl Command for CountDown {
///     fn execute(&mut self) {
///         self.remaining = self.remaining.saturating_sub(1);
///     }
///
///     fn is_finished(&mut self) -> bool {
///         self.remaining == 0
///     }
/// }
/// ```
pub trait Command: Send + 'static {
    /// Called once when the command is scheduled.
    fn initialize(&mut self) {}

    /// Called once per cycle while the command is scheduled.
    fn execute(&mut self) {}

    /// Called once when the command ends, with `interrupted` set if it was
    /// canceled or displaced rather than finishing on its own.
    fn end(&mut self, interrupted: bool) {
        let _ = interrupted;
    }

    /// Returns `true` once the command has completed.
    fn is_finished(&mut self) -> bool {
        false
    }

    /// Subsystems this command needs exclusive use of while running.
    fn requirements(&self) -> Vec<SubsystemId> {
        Vec::new()
    }

    /// Human-readable name used in logs and telemetry.
    fn name(&self) -> &str {
        short_type_name(core::any::type_name::<Self>())
    }

    /// Whether the command may run while the robot is disabled.
    fn runs_when_disabled(&self) -> bool {
        false
    }

    /// How this command reacts to a conflicting schedule request.
    fn interruption_behavior(&self) -> InterruptionBehavior {
        InterruptionBehavior::CancelSelf
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CommandRef
// ─────────────────────────────────────────────────────────────────────────────

/// Shared handle to a command.
///
/// The scheduler identifies commands by [`CommandId`]; clones share both the
/// id and the underlying command, so a binding and the scheduler can refer to
/// the same instance.
#[derive(Clone)]
pub struct CommandRef {
    id: CommandId,
    inner: Arc<Mutex<dyn Command>>,
}

impl CommandRef {
    /// Wraps `command` under a fresh id.
    #[must_use]
    pub fn new<C: Command>(command: C) -> Self {
        Self {
            id: CommandId::next(),
            inner: Arc::new(Mutex::new(command)),
        }
    }

    /// Returns this command's identity.
    #[must_use]
    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Returns the command's name.
    #[must_use]
    pub fn name(&self) -> String {
        self.inner.lock().name().to_owned()
    }

    /// Returns the command's current requirements.
    #[must_use]
    pub fn requirements(&self) -> Vec<SubsystemId> {
        self.inner.lock().requirements()
    }

    /// Returns `true` if the command requires `subsystem`.
    #[must_use]
    pub fn requires(&self, subsystem: SubsystemId) -> bool {
        self.requirements().contains(&subsystem)
    }

    /// Returns the command's interruption behavior.
    #[must_use]
    pub fn interruption_behavior(&self) -> InterruptionBehavior {
        self.inner.lock().interruption_behavior()
    }

    /// Returns whether the command may run while the robot is disabled.
    #[must_use]
    pub fn runs_when_disabled(&self) -> bool {
        self.inner.lock().runs_when_disabled()
    }

    /// Locks the command for direct access.
    ///
    /// The scheduler locks commands while calling their callbacks, so a
    /// callback must not lock its own [`CommandRef`].
    pub fn lock(&self) -> MutexGuard<'_, dyn Command> {
        self.inner.lock()
    }
}

impl PartialEq for CommandRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CommandRef {}

impl fmt::Debug for CommandRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("CommandRef");
        debug.field("id", &self.id);
        // Avoid deadlocking when printed from inside a callback.
        match self.inner.try_lock() {
            Some(command) => debug.field("name", &command.name()),
            None => debug.field("name", &"<locked>"),
        };
        debug.finish()
    }
}
