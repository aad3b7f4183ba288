//! Commands composed of other commands.
//!
//! A group owns its children outright, so a child can never also be scheduled
//! on its own. The group's requirements are the union of its children's; the
//! scheduler only ever sees the group.

use crate::command::{Command, InterruptionBehavior};
use crate::error::SchedulerError;
use crate::subsystem::SubsystemId;

fn union_requirements<'a>(children: impl IntoIterator<Item = &'a dyn Command>) -> Vec<SubsystemId> {
    let mut requirements: Vec<SubsystemId> = children
        .into_iter()
        .flat_map(|child| child.requirements())
        .collect();
    requirements.sort_unstable();
    requirements.dedup();
    requirements
}

fn group_behavior<'a>(children: impl IntoIterator<Item = &'a dyn Command>) -> InterruptionBehavior {
    let any_incoming = children
        .into_iter()
        .any(|child| child.interruption_behavior() == InterruptionBehavior::CancelIncoming);
    if any_incoming {
        InterruptionBehavior::CancelIncoming
    } else {
        InterruptionBehavior::CancelSelf
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SequentialCommandGroup
// ─────────────────────────────────────────────────────────────────────────────

/// Runs its children one after another; finishes when the last one does.
///
/// # Example
///
/// ```
/// use rivet_command::command::Command;
/// use rivet_command::functional::FunctionalCommand;
/// use rivet_command::group::SequentialCommandGroup;
///
/// let mut auto = SequentialCommandGroup::new()
///     .with(FunctionalCommand::instant(|| {}))
///     .with(FunctionalCommand::instant(|| {}));
///
/// auto.initialize();
/// auto.execute();
/// auto.execute();
/// assert!(auto.is_finished());
/// ```
#[derive(Default)]
pub struct SequentialCommandGroup {
    children: Vec<Box<dyn Command>>,
    /// Index of the running child; `None` when the group is not running.
    current: Option<usize>,
    requirements: Vec<SubsystemId>,
}

impl SequentialCommandGroup {
    /// Creates an empty group, which finishes as soon as it starts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a child.
    #[must_use]
    pub fn with(mut self, command: impl Command) -> Self {
        self.push(Box::new(command));
        self
    }

    /// Appends a boxed child.
    pub fn push(&mut self, command: Box<dyn Command>) {
        self.children.push(command);
        self.requirements = union_requirements(self.children.iter().map(Box::as_ref));
    }

    /// Returns the number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the group has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Command for SequentialCommandGroup {
    fn initialize(&mut self) {
        self.current = Some(0);
        if let Some(first) = self.children.first_mut() {
            first.initialize();
        }
    }

    fn execute(&mut self) {
        let Some(index) = self.current else {
            return;
        };
        let Some(child) = self.children.get_mut(index) else {
            return;
        };

        child.execute();
        if child.is_finished() {
            child.end(false);
            let next = index + 1;
            self.current = Some(next);
            if let Some(following) = self.children.get_mut(next) {
                following.initialize();
            }
        }
    }

    fn end(&mut self, interrupted: bool) {
        if interrupted
            && let Some(index) = self.current
            && let Some(child) = self.children.get_mut(index)
        {
            child.end(true);
        }
        self.current = None;
    }

    fn is_finished(&mut self) -> bool {
        self.current.is_some_and(|index| index >= self.children.len())
    }

    fn requirements(&self) -> Vec<SubsystemId> {
        self.requirements.clone()
    }

    fn name(&self) -> &str {
        "SequentialCommandGroup"
    }

    fn runs_when_disabled(&self) -> bool {
        self.children.iter().all(|child| child.runs_when_disabled())
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        group_behavior(self.children.iter().map(Box::as_ref))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ParallelCommandGroup
// ─────────────────────────────────────────────────────────────────────────────

/// Runs its children at the same time; finishes when all of them have.
///
/// Children must have disjoint requirements.
pub struct ParallelCommandGroup {
    /// Each child with a flag telling whether it is still running.
    children: Vec<(Box<dyn Command>, bool)>,
    requirements: Vec<SubsystemId>,
}

impl ParallelCommandGroup {
    /// Creates a group from `children`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ParallelRequirementConflict`] if two children require
    /// the same subsystem.
    pub fn new(children: Vec<Box<dyn Command>>) -> Result<Self, SchedulerError> {
        let mut requirements: Vec<SubsystemId> = Vec::new();
        for child in &children {
            let mut own = child.requirements();
            own.sort_unstable();
            own.dedup();
            for subsystem in own {
                if requirements.contains(&subsystem) {
                    return Err(SchedulerError::ParallelRequirementConflict { subsystem });
                }
                requirements.push(subsystem);
            }
        }
        requirements.sort_unstable();

        Ok(Self {
            children: children.into_iter().map(|child| (child, false)).collect(),
            requirements,
        })
    }

    /// Returns the number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the group has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Command for ParallelCommandGroup {
    fn initialize(&mut self) {
        for (child, running) in &mut self.children {
            child.initialize();
            *running = true;
        }
    }

    fn execute(&mut self) {
        for (child, running) in &mut self.children {
            if !*running {
                continue;
            }
            child.execute();
            if child.is_finished() {
                child.end(false);
                *running = false;
            }
        }
    }

    fn end(&mut self, interrupted: bool) {
        for (child, running) in &mut self.children {
            if *running && interrupted {
                child.end(true);
            }
            *running = false;
        }
    }

    fn is_finished(&mut self) -> bool {
        self.children.iter().all(|(_, running)| !running)
    }

    fn requirements(&self) -> Vec<SubsystemId> {
        self.requirements.clone()
    }

    fn name(&self) -> &str {
        "ParallelCommandGroup"
    }

    fn runs_when_disabled(&self) -> bool {
        self.children
            .iter()
            .all(|(child, _)| child.runs_when_disabled())
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        group_behavior(self.children.iter().map(|(child, _)| child.as_ref()))
    }
}
