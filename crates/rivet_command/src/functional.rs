//! Closure-built commands.

use core::fmt;

use crate::command::{Command, InterruptionBehavior};
use crate::subsystem::{SubsystemId, SubsystemRef};

type Action = Box<dyn FnMut() + Send>;
type EndAction = Box<dyn FnMut(bool) + Send>;
type Predicate = Box<dyn FnMut() -> bool + Send>;

/// A command whose lifecycle callbacks are closures.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use rivet_command::command::CommandRef;
/// use rivet_command::functional::FunctionalCommand;
/// use rivet_command::subsystem::{Subsystem, SubsystemRef};
///
/// #[derive(Default)]
/// struct Shooter { rpm: f64 }
/// impl Subsystem for Shooter {}
///
/// let shooter = Arc::new(Mutex::new(Shooter::default()));
/// let shooter_ref = SubsystemRef::from_shared(shooter.clone());
///
/// let spin_up = {
///     let (start, stop) = (shooter.clone(), shooter.clone());
///     FunctionalCommand::run(move || start.lock().rpm = 4000.0)
///         .with_end(move |_| stop.lock().rpm = 0.0)
///         .requiring(&shooter_ref)
///         .named("SpinUp")
/// };
/// let spin_up = CommandRef::new(spin_up);
/// assert!(spin_up.requires(shooter_ref.id()));
/// ```
pub struct FunctionalCommand {
    name: String,
    on_initialize: Action,
    on_execute: Action,
    on_end: EndAction,
    is_finished: Predicate,
    requirements: Vec<SubsystemId>,
    runs_when_disabled: bool,
    interruption_behavior: InterruptionBehavior,
}

impl FunctionalCommand {
    /// Creates a command from its four lifecycle callbacks.
    #[must_use]
    pub fn new(
        on_initialize: impl FnMut() + Send + 'static,
        on_execute: impl FnMut() + Send + 'static,
        on_end: impl FnMut(bool) + Send + 'static,
        is_finished: impl FnMut() -> bool + Send + 'static,
    ) -> Self {
        Self {
            name: "FunctionalCommand".to_owned(),
            on_initialize: Box::new(on_initialize),
            on_execute: Box::new(on_execute),
            on_end: Box::new(on_end),
            is_finished: Box::new(is_finished),
            requirements: Vec::new(),
            runs_when_disabled: false,
            interruption_behavior: InterruptionBehavior::CancelSelf,
        }
    }

    /// A command that runs `action` once on initialize and finishes immediately.
    #[must_use]
    pub fn instant(action: impl FnMut() + Send + 'static) -> Self {
        Self::new(action, || {}, |_| {}, || true).named("InstantCommand")
    }

    /// A command that runs `action` every cycle and never finishes on its own.
    #[must_use]
    pub fn run(action: impl FnMut() + Send + 'static) -> Self {
        Self::new(|| {}, action, |_| {}, || false).named("RunCommand")
    }

    /// Sets the name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the end callback.
    #[must_use]
    pub fn with_end(mut self, on_end: impl FnMut(bool) + Send + 'static) -> Self {
        self.on_end = Box::new(on_end);
        self
    }

    /// Replaces the completion predicate.
    #[must_use]
    pub fn until(mut self, is_finished: impl FnMut() -> bool + Send + 'static) -> Self {
        self.is_finished = Box::new(is_finished);
        self
    }

    /// Adds `subsystem` to the requirements.
    #[must_use]
    pub fn requiring(mut self, subsystem: &SubsystemRef) -> Self {
        if !self.requirements.contains(&subsystem.id()) {
            self.requirements.push(subsystem.id());
        }
        self
    }

    /// Sets whether the command runs while the robot is disabled.
    #[must_use]
    pub fn ignoring_disable(mut self, runs_when_disabled: bool) -> Self {
        self.runs_when_disabled = runs_when_disabled;
        self
    }

    /// Sets the interruption behavior.
    #[must_use]
    pub fn with_interruption_behavior(mut self, behavior: InterruptionBehavior) -> Self {
        self.interruption_behavior = behavior;
        self
    }
}

impl Command for FunctionalCommand {
    fn initialize(&mut self) {
        (self.on_initialize)();
    }

    fn execute(&mut self) {
        (self.on_execute)();
    }

    fn end(&mut self, interrupted: bool) {
        (self.on_end)(interrupted);
    }

    fn is_finished(&mut self) -> bool {
        (self.is_finished)()
    }

    fn requirements(&self) -> Vec<SubsystemId> {
        self.requirements.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn runs_when_disabled(&self) -> bool {
        self.runs_when_disabled
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.interruption_behavior
    }
}

impl fmt::Debug for FunctionalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionalCommand")
            .field("name", &self.name)
            .field("requirements", &self.requirements)
            .field("runs_when_disabled", &self.runs_when_disabled)
            .field("interruption_behavior", &self.interruption_behavior)
            .finish_non_exhaustive()
    }
}
