//! Observer hooks fired on command lifecycle transitions.
//!
//! Hooks are notification side channels: they see every initialize, execute,
//! finish and interrupt the scheduler performs, but cannot influence any
//! scheduling decision. A hook that panics is caught, logged and reported as
//! a [`Fault`]; the remaining hooks and the scheduler cycle carry on.
//!
//! # Example
//!
//! ```
//! use rivet_command::hooks::{HookPoint, SchedulerEvent, SchedulerHooks};
//!
//! let mut hooks = SchedulerHooks::new();
//! hooks
//!     .register_observer(HookPoint::Interrupt, "logger", |event: &SchedulerEvent<'_>| {
//!         if let SchedulerEvent::Interrupt { command, interruptor } = event {
//!             let cause = interruptor.map(|by| by.name());
//!             println!("{} interrupted by {:?}", command.name(), cause);
//!         }
//!     })
//!     .unwrap();
//!
//! assert_eq!(hooks.hook_count(HookPoint::Interrupt), 1);
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};

use hashbrown::HashMap;

use crate::command::CommandRef;
use crate::error::SchedulerError;
use crate::telemetry::Fault;

// ─────────────────────────────────────────────────────────────────────────────
// HookPoint / SchedulerEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle transition a hook is registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// After a command's `initialize`.
    Initialize,
    /// After each call to a command's `execute`.
    Execute,
    /// After a command finishes on its own.
    Finish,
    /// After a command is canceled or displaced.
    Interrupt,
}

/// Event delivered to hooks.
#[derive(Debug, Clone, Copy)]
pub enum SchedulerEvent<'a> {
    /// A command was initialized.
    Initialize {
        /// The command.
        command: &'a CommandRef,
    },
    /// A command executed one cycle.
    Execute {
        /// The command.
        command: &'a CommandRef,
    },
    /// A command finished on its own.
    Finish {
        /// The command.
        command: &'a CommandRef,
    },
    /// A command was interrupted.
    Interrupt {
        /// The interrupted command.
        command: &'a CommandRef,
        /// The command that displaced it, if the interrupt came from a
        /// conflicting schedule request rather than a cancel.
        interruptor: Option<&'a CommandRef>,
    },
}

impl SchedulerEvent<'_> {
    /// Returns the hook point this event is delivered to.
    #[must_use]
    pub fn point(&self) -> HookPoint {
        match self {
            Self::Initialize { .. } => HookPoint::Initialize,
            Self::Execute { .. } => HookPoint::Execute,
            Self::Finish { .. } => HookPoint::Finish,
            Self::Interrupt { .. } => HookPoint::Interrupt,
        }
    }

    /// Returns the command the event is about.
    #[must_use]
    pub fn command(&self) -> &CommandRef {
        match self {
            Self::Initialize { command }
            | Self::Execute { command }
            | Self::Finish { command }
            | Self::Interrupt { command, .. } => *command,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SchedulerHooks
// ─────────────────────────────────────────────────────────────────────────────

type BoxedHook = Box<dyn Fn(&SchedulerEvent<'_>) + Send + Sync>;

/// Entry in the hook registry.
struct HookEntry {
    /// Human-readable name for debugging and logging.
    name: String,
    hook: BoxedHook,
}

/// Registry of lifecycle observers, organized by [`HookPoint`].
#[derive(Default)]
pub struct SchedulerHooks {
    hooks: HashMap<HookPoint, Vec<HookEntry>>,
}

impl SchedulerHooks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }

    /// Registers an observer at `point`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::DuplicateHook`] if `name` is already registered at
    /// `point`.
    pub fn register_observer<F>(
        &mut self,
        point: HookPoint,
        name: impl Into<String>,
        hook: F,
    ) -> Result<&mut Self, SchedulerError>
    where
        F: Fn(&SchedulerEvent<'_>) + Send + Sync + 'static,
    {
        let name = name.into();
        let entries = self.hooks.entry(point).or_default();
        if entries.iter().any(|entry| entry.name == name) {
            return Err(SchedulerError::DuplicateHook { point, name });
        }
        entries.push(HookEntry {
            name,
            hook: Box::new(hook),
        });
        Ok(self)
    }

    /// Removes the observer called `name` at `point`, returning whether it existed.
    pub fn remove(&mut self, point: HookPoint, name: &str) -> bool {
        let Some(entries) = self.hooks.get_mut(&point) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.name != name);
        entries.len() != before
    }

    /// Invokes every hook registered for the event's point, in registration order.
    ///
    /// Panicking hooks are reported into `faults`.
    pub fn invoke(&self, event: &SchedulerEvent<'_>, faults: &mut Vec<Fault>) {
        let Some(entries) = self.hooks.get(&event.point()) else {
            return;
        };
        for entry in entries {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (entry.hook)(event))) {
                let fault = Fault::hook(&entry.name, event.point(), payload.as_ref());
                tracing::error!(
                    hook = %entry.name,
                    point = ?event.point(),
                    error = %fault.message,
                    "scheduler hook panicked"
                );
                faults.push(fault);
            }
        }
    }

    /// Returns the number of hooks registered at `point`.
    #[must_use]
    pub fn hook_count(&self, point: HookPoint) -> usize {
        self.hooks.get(&point).map_or(0, Vec::len)
    }

    /// Checks if a hook with the given name exists at `point`.
    #[must_use]
    pub fn contains_hook(&self, point: HookPoint, name: &str) -> bool {
        self.hooks
            .get(&point)
            .is_some_and(|entries| entries.iter().any(|entry| entry.name == name))
    }
}

impl core::fmt::Debug for SchedulerHooks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (point, entries) in &self.hooks {
            let names: Vec<_> = entries.iter().map(|entry| entry.name.as_str()).collect();
            map.entry(point, &names);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Noop;

    impl Command for Noop {}

    #[test]
    fn register_increments_count() {
        let mut hooks = SchedulerHooks::new();
        hooks
            .register_observer(HookPoint::Execute, "a", |_| {})
            .unwrap()
            .register_observer(HookPoint::Execute, "b", |_| {})
            .unwrap();

        assert_eq!(hooks.hook_count(HookPoint::Execute), 2);
        assert_eq!(hooks.hook_count(HookPoint::Finish), 0);
        assert!(hooks.contains_hook(HookPoint::Execute, "a"));
    }

    #[test]
    fn duplicate_names_are_rejected_per_point() {
        let mut hooks = SchedulerHooks::new();
        hooks.register_observer(HookPoint::Finish, "log", |_| {}).unwrap();
        hooks.register_observer(HookPoint::Interrupt, "log", |_| {}).unwrap();

        let err = hooks
            .register_observer(HookPoint::Finish, "log", |_| {})
            .err()
            .unwrap();
        assert_eq!(
            err,
            SchedulerError::DuplicateHook {
                point: HookPoint::Finish,
                name: "log".into()
            }
        );
    }

    #[test]
    fn invoke_runs_in_registration_order() {
        let mut hooks = SchedulerHooks::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            hooks
                .register_observer(HookPoint::Initialize, name, move |_| order.lock().push(name))
                .unwrap();
        }

        let command = CommandRef::new(Noop);
        let mut faults = Vec::new();
        hooks.invoke(&SchedulerEvent::Initialize { command: &command }, &mut faults);

        assert_eq!(*order.lock(), ["first", "second", "third"]);
        assert!(faults.is_empty());
    }

    #[test]
    fn panicking_hook_is_isolated() {
        let mut hooks = SchedulerHooks::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let after = Arc::clone(&calls);
        hooks
            .register_observer(HookPoint::Finish, "bad", |_| panic!("dashboard offline"))
            .unwrap()
            .register_observer(HookPoint::Finish, "good", move |_| {
                after.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let command = CommandRef::new(Noop);
        let mut faults = Vec::new();
        hooks.invoke(&SchedulerEvent::Finish { command: &command }, &mut faults);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].message, "dashboard offline");
    }

    #[test]
    fn remove_unregisters() {
        let mut hooks = SchedulerHooks::new();
        hooks.register_observer(HookPoint::Execute, "x", |_| {}).unwrap();
        assert!(hooks.remove(HookPoint::Execute, "x"));
        assert!(!hooks.remove(HookPoint::Execute, "x"));
        assert_eq!(hooks.hook_count(HookPoint::Execute), 0);
    }
}
