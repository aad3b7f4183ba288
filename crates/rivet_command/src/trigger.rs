//! Boolean conditions bound to command schedules.
//!
//! A [`Trigger`] wraps a condition such as "button A is pressed" or "the
//! intake sees a game piece". Binding methods attach edge-detecting closures
//! to an [`EventLoop`]; the scheduler polls its button loop once per cycle.
//!
//! Edges are detected against the condition's previous sample. The first
//! sample is taken when the binding is created, so a condition that is
//! already true at bind time does not count as a rising edge.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use rivet_command::command::{Command, CommandRef};
//! use rivet_command::scheduler::{CommandScheduler, RobotState};
//! use rivet_command::trigger::Trigger;
//!
//! struct Spin;
//! impl Command for Spin {}
//!
//! let pressed = Arc::new(AtomicBool::new(false));
//! let button = {
//!     let pressed = Arc::clone(&pressed);
//!     Trigger::new(move || pressed.load(Ordering::SeqCst))
//! };
//!
//! let mut scheduler = CommandScheduler::new();
//! scheduler.set_robot_state(RobotState::Teleop);
//! let spin = CommandRef::new(Spin);
//! button.while_true(scheduler.button_loop_mut(), &spin);
//!
//! pressed.store(true, Ordering::SeqCst);
//! scheduler.run();
//! assert!(scheduler.is_scheduled(&spin));
//!
//! pressed.store(false, Ordering::SeqCst);
//! scheduler.run();
//! assert!(!scheduler.is_scheduled(&spin));
//! ```

use core::fmt;
use std::sync::Arc;

use crate::command::CommandRef;
use crate::event_loop::EventLoop;
use crate::scheduler::CommandScheduler;

type Condition = Arc<dyn Fn() -> bool + Send + Sync>;

/// Which transition of the condition a binding reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Rising,
    Falling,
}

impl Edge {
    fn matches(self, previous: bool, current: bool) -> bool {
        match self {
            Self::Rising => !previous && current,
            Self::Falling => previous && !current,
        }
    }
}

/// A shareable boolean condition with command-binding helpers.
#[derive(Clone)]
pub struct Trigger {
    condition: Condition,
}

impl Trigger {
    /// Creates a trigger from a condition.
    #[must_use]
    pub fn new(condition: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            condition: Arc::new(condition),
        }
    }

    /// Samples the condition.
    #[must_use]
    pub fn get(&self) -> bool {
        (self.condition)()
    }

    // ─── Bindings ────────────────────────────────────────────────────────────

    /// Schedules `command` when the condition becomes true.
    pub fn on_true(&self, event_loop: &mut EventLoop, command: &CommandRef) -> &Self {
        self.bind_edge(event_loop, Edge::Rising, command, |scheduler, command| {
            scheduler.schedule(command);
        })
    }

    /// Schedules `command` when the condition becomes false.
    pub fn on_false(&self, event_loop: &mut EventLoop, command: &CommandRef) -> &Self {
        self.bind_edge(event_loop, Edge::Falling, command, |scheduler, command| {
            scheduler.schedule(command);
        })
    }

    /// Schedules `command` when the condition becomes true and cancels it
    /// when the condition becomes false.
    pub fn while_true(&self, event_loop: &mut EventLoop, command: &CommandRef) -> &Self {
        self.bind_while(event_loop, Edge::Rising, command)
    }

    /// Schedules `command` when the condition becomes false and cancels it
    /// when the condition becomes true.
    pub fn while_false(&self, event_loop: &mut EventLoop, command: &CommandRef) -> &Self {
        self.bind_while(event_loop, Edge::Falling, command)
    }

    /// Toggles `command` each time the condition becomes true.
    pub fn toggle_on_true(&self, event_loop: &mut EventLoop, command: &CommandRef) -> &Self {
        self.bind_edge(event_loop, Edge::Rising, command, toggle)
    }

    /// Toggles `command` each time the condition becomes false.
    pub fn toggle_on_false(&self, event_loop: &mut EventLoop, command: &CommandRef) -> &Self {
        self.bind_edge(event_loop, Edge::Falling, command, toggle)
    }

    fn bind_edge(
        &self,
        event_loop: &mut EventLoop,
        edge: Edge,
        command: &CommandRef,
        action: fn(&mut CommandScheduler, &CommandRef),
    ) -> &Self {
        let condition = Arc::clone(&self.condition);
        let command = command.clone();
        let mut previous = condition();
        event_loop.bind(move |scheduler| {
            let current = condition();
            if edge.matches(previous, current) {
                action(scheduler, &command);
            }
            previous = current;
        });
        self
    }

    fn bind_while(&self, event_loop: &mut EventLoop, start: Edge, command: &CommandRef) -> &Self {
        let condition = Arc::clone(&self.condition);
        let command = command.clone();
        let mut previous = condition();
        event_loop.bind(move |scheduler| {
            let current = condition();
            if start.matches(previous, current) {
                scheduler.schedule(&command);
            } else if previous != current {
                scheduler.cancel(&command);
            }
            previous = current;
        });
        self
    }

    // ─── Combinators ─────────────────────────────────────────────────────────

    /// Returns a trigger that is true when both triggers are true.
    #[must_use]
    pub fn and(&self, other: &Trigger) -> Trigger {
        let (a, b) = (Arc::clone(&self.condition), Arc::clone(&other.condition));
        Trigger::new(move || a() && b())
    }

    /// Returns a trigger that is true when either trigger is true.
    #[must_use]
    pub fn or(&self, other: &Trigger) -> Trigger {
        let (a, b) = (Arc::clone(&self.condition), Arc::clone(&other.condition));
        Trigger::new(move || a() || b())
    }

    /// Returns a trigger that is true when this one is false.
    #[must_use]
    pub fn negate(&self) -> Trigger {
        let a = Arc::clone(&self.condition);
        Trigger::new(move || !a())
    }
}

fn toggle(scheduler: &mut CommandScheduler, command: &CommandRef) {
    if scheduler.is_scheduled(command) {
        scheduler.cancel(command);
    } else {
        scheduler.schedule(command);
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger").finish_non_exhaustive()
    }
}
