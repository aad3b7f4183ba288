//! The cooperative command scheduler.
//!
//! [`CommandScheduler::run`] is called once per control period by the robot's
//! periodic driver. Each call performs one full cycle, in order:
//!
//! 1. subsystem `periodic` callbacks (and `simulation_periodic` in simulation)
//! 2. button bindings
//! 3. `execute` / `is_finished` for every running command, ending finished ones
//! 4. deferred requests from the [`RequestQueue`]
//! 5. default commands for every subsystem nothing requires
//! 6. the loop-overrun check
//! 7. the telemetry snapshot
//!
//! Everything happens on the calling thread and nothing blocks. A disabled
//! scheduler skips the whole cycle.
//!
//! # Requirement conflicts
//!
//! At most one command holds a subsystem at a time. Scheduling a command whose
//! requirements overlap running commands is all-or-nothing: if any of the
//! current holders cancels incoming commands, the new command is rejected and
//! its `initialize` never runs; otherwise every holder is interrupted before
//! the new command starts.
//!
//! # Fault isolation
//!
//! Panics from commands, subsystems, bindings, hooks and the telemetry sink
//! are caught, logged and reported in the next [`SchedulerSnapshot`]. A
//! command that panics is removed from the schedule and its requirements are
//! released; everything else keeps running.

use core::fmt;
use core::mem;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};

use hashbrown::HashMap;

use crate::clock::Clock;
use crate::command::{Command, CommandId, CommandRef, InterruptionBehavior};
use crate::error::SchedulerError;
use crate::event_loop::EventLoop;
use crate::hooks::{HookPoint, SchedulerEvent, SchedulerHooks};
use crate::requests::{Request, RequestQueue};
use crate::subsystem::{SubsystemId, SubsystemRef};
use crate::telemetry::{Fault, FaultOrigin, SchedulerSink, SchedulerSnapshot};
use crate::watchdog::Watchdog;

/// Default control period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(20);

// ─────────────────────────────────────────────────────────────────────────────
// RobotState / ScheduleOutcome
// ─────────────────────────────────────────────────────────────────────────────

/// Operating mode reported by the driver station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RobotState {
    /// Outputs disabled. Only commands that run when disabled may run.
    #[default]
    Disabled,
    /// Autonomous period.
    Autonomous,
    /// Operator-controlled period.
    Teleop,
    /// Test mode.
    Test,
}

impl RobotState {
    /// Returns `true` for [`Disabled`](Self::Disabled).
    #[must_use]
    pub fn is_disabled(self) -> bool {
        self == Self::Disabled
    }
}

/// Result of a schedule request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// The command was initialized and is now running.
    Scheduled,
    /// The command was already running; nothing changed.
    AlreadyScheduled,
    /// The scheduler is disabled, or the robot is disabled and the command
    /// does not run when disabled.
    Disabled,
    /// A running command that cancels incoming commands holds one of the
    /// requirements.
    Rejected {
        /// The running command that blocked the request.
        blocker: CommandRef,
    },
    /// The command panicked while being read or initialized and was dropped.
    Faulted,
}

impl ScheduleOutcome {
    /// Returns `true` if the command is running after the request.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Scheduled | Self::AlreadyScheduled)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SchedulerConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Scheduler configuration.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use rivet_command::scheduler::{CommandScheduler, SchedulerConfig};
///
/// let scheduler = CommandScheduler::with_config(
///     SchedulerConfig::new()
///         .with_period(Duration::from_millis(10))
///         .with_simulation(true),
/// );
/// assert_eq!(scheduler.watchdog().timeout(), Duration::from_millis(10));
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Cycle budget used by the loop-overrun watchdog.
    pub period: Duration,
    /// Whether subsystems get `simulation_periodic` calls.
    pub simulation: bool,
    /// Time source for scheduling timestamps and the watchdog.
    pub clock: Clock,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            simulation: false,
            clock: Clock::system(),
        }
    }
}

impl SchedulerConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cycle budget.
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Enables or disables simulation callbacks.
    #[must_use]
    pub fn with_simulation(mut self, simulation: bool) -> Self {
        self.simulation = simulation;
        self
    }

    /// Sets the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal bookkeeping
// ─────────────────────────────────────────────────────────────────────────────

struct ScheduledCommand {
    command: CommandRef,
    requirements: Vec<SubsystemId>,
    behavior: InterruptionBehavior,
    runs_when_disabled: bool,
    scheduled_at: Instant,
}

struct SubsystemEntry {
    subsystem: SubsystemRef,
    default_command: Option<CommandRef>,
}

/// Properties read from a command once, at schedule time.
struct CommandTraits {
    requirements: Vec<SubsystemId>,
    behavior: InterruptionBehavior,
    runs_when_disabled: bool,
}

/// Runs `f` on the locked command, converting a panic into a [`Fault`].
fn guarded<R>(
    command: &CommandRef,
    phase: &'static str,
    f: impl FnOnce(&mut dyn Command) -> R,
) -> Result<R, Fault> {
    let mut guard = command.lock();
    catch_unwind(AssertUnwindSafe(|| f(&mut *guard))).map_err(|payload| {
        Fault::new(
            FaultOrigin::Command {
                id: command.id(),
                name: guard.name().to_owned(),
                phase,
            },
            payload.as_ref(),
        )
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// CommandScheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Arbitrates subsystem ownership among commands, one cycle at a time.
///
/// The scheduler is single-threaded: every state change takes `&mut self`.
/// Other threads reach it through [`requests`](Self::requests).
///
/// # Example
///
/// ```
/// use rivet_command::command::{Command, CommandRef};
/// use rivet_command::scheduler::{CommandScheduler, RobotState, ScheduleOutcome};
/// use rivet_command::subsystem::{Subsystem, SubsystemId, SubsystemRef};
///
/// struct Arm;
/// impl Subsystem for Arm {}
///
/// struct Raise { arm: SubsystemId }
/// impl Command for Raise {
///     fn requirements(&self) -> Vec<SubsystemId> {
///         vec![self.arm]
///     }
/// }
///
/// let arm = SubsystemRef::new(Arm);
/// let mut scheduler = CommandScheduler::new();
/// scheduler.register_subsystem(&arm);
/// scheduler.set_robot_state(RobotState::Teleop);
///
/// let first = CommandRef::new(Raise { arm: arm.id() });
/// let second = CommandRef::new(Raise { arm: arm.id() });
///
/// assert_eq!(scheduler.schedule(&first), ScheduleOutcome::Scheduled);
/// assert_eq!(scheduler.schedule(&second), ScheduleOutcome::Scheduled);
///
/// // `second` displaced `first`.
/// assert!(!scheduler.is_scheduled(&first));
/// assert_eq!(scheduler.requiring(arm.id()), Some(second));
/// ```
pub struct CommandScheduler {
    config: SchedulerConfig,
    enabled: bool,
    robot_state: RobotState,
    subsystems: Vec<SubsystemEntry>,
    scheduled: Vec<ScheduledCommand>,
    requirements: HashMap<SubsystemId, CommandId>,
    button_loop: EventLoop,
    polling_buttons: bool,
    buttons_cleared: bool,
    hooks: SchedulerHooks,
    requests: RequestQueue,
    watchdog: Watchdog,
    sink: Option<Box<dyn SchedulerSink>>,
    faults: Vec<Fault>,
}

impl Default for CommandScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandScheduler {
    /// Creates an enabled scheduler with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    /// Creates an enabled scheduler with the given configuration.
    #[must_use]
    pub fn with_config(config: SchedulerConfig) -> Self {
        let watchdog = Watchdog::new(config.period, config.clock.clone());
        Self {
            config,
            enabled: true,
            robot_state: RobotState::default(),
            subsystems: Vec::new(),
            scheduled: Vec::new(),
            requirements: HashMap::new(),
            button_loop: EventLoop::new(),
            polling_buttons: false,
            buttons_cleared: false,
            hooks: SchedulerHooks::new(),
            requests: RequestQueue::new(),
            watchdog,
            sink: None,
            faults: Vec::new(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Changes the cycle budget.
    pub fn set_period(&mut self, period: Duration) {
        self.config.period = period;
        self.watchdog.set_timeout(period);
    }

    // ─── Cycle ───────────────────────────────────────────────────────────────

    /// Runs one scheduler cycle. Does nothing while the scheduler is disabled.
    pub fn run(&mut self) {
        if !self.enabled {
            return;
        }
        let _span = tracing::trace_span!("scheduler_run").entered();
        self.watchdog.reset();

        self.run_subsystems();
        self.poll_buttons();
        self.watchdog.add_epoch("buttons.run()");

        self.run_commands();
        self.apply_requests();
        self.schedule_defaults();

        self.watchdog.check("CommandScheduler");
        self.publish();
    }

    fn run_subsystems(&mut self) {
        let simulation = self.config.simulation;
        let subsystems: Vec<SubsystemRef> = self
            .subsystems
            .iter()
            .map(|entry| entry.subsystem.clone())
            .collect();

        for subsystem in &subsystems {
            let result = {
                let mut guard = subsystem.lock();
                catch_unwind(AssertUnwindSafe(|| {
                    guard.periodic();
                    if simulation {
                        guard.simulation_periodic();
                    }
                }))
            };
            let name = subsystem.name();
            if let Err(payload) = result {
                self.record(Fault::new(
                    FaultOrigin::Subsystem { name: name.clone() },
                    payload.as_ref(),
                ));
            }
            self.watchdog.add_epoch(format!("{name}.periodic()"));
        }
    }

    fn poll_buttons(&mut self) {
        let mut buttons = mem::take(&mut self.button_loop);
        self.polling_buttons = true;
        self.buttons_cleared = false;

        let panics = buttons.poll(self);

        self.polling_buttons = false;
        if self.buttons_cleared {
            buttons.clear();
        }
        // Keep bindings added while polling, after the existing ones.
        let mut added = mem::replace(&mut self.button_loop, buttons);
        self.button_loop.append(&mut added);

        for payload in panics {
            self.record(Fault::new(FaultOrigin::Binding, payload.as_ref()));
        }
    }

    fn run_commands(&mut self) {
        let ids: Vec<CommandId> = self
            .scheduled
            .iter()
            .map(|entry| entry.command.id())
            .collect();

        for id in ids {
            let Some(entry) = self.entry(id) else {
                continue;
            };
            let command = entry.command.clone();

            if self.robot_state.is_disabled() && !entry.runs_when_disabled {
                self.cancel_with(&command, None);
                continue;
            }

            if let Err(fault) = guarded(&command, "execute", |command| command.execute()) {
                self.record(fault);
                self.cancel_with(&command, None);
                continue;
            }
            self.fire(&SchedulerEvent::Execute { command: &command });

            match guarded(&command, "is_finished", |command| command.is_finished()) {
                Ok(true) => self.finish(&command),
                Ok(false) => {}
                Err(fault) => {
                    self.record(fault);
                    self.cancel_with(&command, None);
                }
            }
            self.watchdog
                .add_epoch(format!("{}.execute()", command.name()));
        }
    }

    fn apply_requests(&mut self) {
        for request in self.requests.drain() {
            match request {
                Request::Schedule(command) => {
                    self.schedule(&command);
                }
                Request::Cancel(command) => self.cancel(&command),
                Request::CancelAll => self.cancel_all(),
            }
        }
    }

    fn schedule_defaults(&mut self) {
        let defaults: Vec<(SubsystemId, CommandRef)> = self
            .subsystems
            .iter()
            .filter_map(|entry| {
                let command = entry.default_command.clone()?;
                Some((entry.subsystem.id(), command))
            })
            .collect();

        for (subsystem, command) in defaults {
            if !self.requirements.contains_key(&subsystem) {
                self.schedule(&command);
            }
        }
    }

    fn publish(&mut self) {
        let Some(mut sink) = self.sink.take() else {
            self.faults.clear();
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| sink.take_cancel_requests())) {
            Ok(ids) => {
                for id in ids {
                    if let Some(command) = self.entry(id).map(|entry| entry.command.clone()) {
                        self.cancel(&command);
                    }
                }
            }
            Err(payload) => self.record(Fault::new(FaultOrigin::Sink, payload.as_ref())),
        }

        let mut snapshot = self.snapshot();
        snapshot.faults = mem::take(&mut self.faults);
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sink.publish(&snapshot))) {
            self.record(Fault::new(FaultOrigin::Sink, payload.as_ref()));
        }
        self.sink = Some(sink);
    }

    // ─── Scheduling ──────────────────────────────────────────────────────────

    /// Schedules `command`, interrupting interruptible holders of its requirements.
    ///
    /// See the [module documentation](self) for the conflict rule.
    pub fn schedule(&mut self, command: &CommandRef) -> ScheduleOutcome {
        if !self.enabled {
            return ScheduleOutcome::Disabled;
        }
        if self.is_scheduled(command) {
            return ScheduleOutcome::AlreadyScheduled;
        }

        let traits = match guarded(command, "requirements", |command| CommandTraits {
            requirements: command.requirements(),
            behavior: command.interruption_behavior(),
            runs_when_disabled: command.runs_when_disabled(),
        }) {
            Ok(traits) => traits,
            Err(fault) => {
                self.record(fault);
                return ScheduleOutcome::Faulted;
            }
        };

        if self.robot_state.is_disabled() && !traits.runs_when_disabled {
            return ScheduleOutcome::Disabled;
        }

        let mut requirements = traits.requirements;
        requirements.sort_unstable();
        requirements.dedup();

        let mut holders: Vec<CommandId> = Vec::new();
        for requirement in &requirements {
            if let Some(&holder) = self.requirements.get(requirement)
                && !holders.contains(&holder)
            {
                holders.push(holder);
            }
        }

        // Check every holder before interrupting any of them.
        for holder in &holders {
            if let Some(entry) = self.entry(*holder)
                && !entry.behavior.is_interruptible()
            {
                let blocker = entry.command.clone();
                tracing::debug!(
                    command = %command.name(),
                    blocker = %blocker.name(),
                    "schedule rejected by non-interruptible holder"
                );
                return ScheduleOutcome::Rejected { blocker };
            }
        }

        for holder in holders {
            if let Some(held) = self.entry(holder).map(|entry| entry.command.clone()) {
                self.cancel_with(&held, Some(command));
            }
        }

        self.start(command, requirements, traits.behavior, traits.runs_when_disabled)
    }

    fn start(
        &mut self,
        command: &CommandRef,
        requirements: Vec<SubsystemId>,
        behavior: InterruptionBehavior,
        runs_when_disabled: bool,
    ) -> ScheduleOutcome {
        for requirement in &requirements {
            self.requirements.insert(*requirement, command.id());
        }
        self.scheduled.push(ScheduledCommand {
            command: command.clone(),
            requirements,
            behavior,
            runs_when_disabled,
            scheduled_at: self.config.clock.now(),
        });

        if let Err(fault) = guarded(command, "initialize", |command| command.initialize()) {
            self.record(fault);
            self.cancel_with(command, None);
            return ScheduleOutcome::Faulted;
        }
        self.fire(&SchedulerEvent::Initialize { command });
        let name = command.name();
        self.watchdog.add_epoch(format!("{name}.initialize()"));
        tracing::debug!(command = %name, id = %command.id(), "scheduled command");
        ScheduleOutcome::Scheduled
    }

    /// Schedules each command in order.
    pub fn schedule_all<'a>(
        &mut self,
        commands: impl IntoIterator<Item = &'a CommandRef>,
    ) -> Vec<ScheduleOutcome> {
        commands
            .into_iter()
            .map(|command| self.schedule(command))
            .collect()
    }

    /// Cancels `command` if it is running.
    ///
    /// The command's `end(true)` and the interrupt hooks run before this
    /// returns. Cancellation ignores interruption behavior.
    pub fn cancel(&mut self, command: &CommandRef) {
        self.cancel_with(command, None);
    }

    /// Cancels every running command.
    pub fn cancel_all(&mut self) {
        let running: Vec<CommandRef> = self
            .scheduled
            .iter()
            .map(|entry| entry.command.clone())
            .collect();
        for command in &running {
            self.cancel(command);
        }
    }

    fn cancel_with(&mut self, command: &CommandRef, interruptor: Option<&CommandRef>) {
        if self.remove_scheduled(command.id()).is_none() {
            return;
        }
        if let Err(fault) = guarded(command, "end", |command| command.end(true)) {
            self.record(fault);
        }
        self.fire(&SchedulerEvent::Interrupt {
            command,
            interruptor,
        });
        let name = command.name();
        self.watchdog.add_epoch(format!("{name}.end(true)"));
        tracing::debug!(
            command = %name,
            interruptor = ?interruptor.map(CommandRef::name),
            "interrupted command"
        );
    }

    fn finish(&mut self, command: &CommandRef) {
        if self.remove_scheduled(command.id()).is_none() {
            return;
        }
        if let Err(fault) = guarded(command, "end", |command| command.end(false)) {
            self.record(fault);
        }
        self.fire(&SchedulerEvent::Finish { command });
        let name = command.name();
        self.watchdog.add_epoch(format!("{name}.end(false)"));
        tracing::debug!(command = %name, "finished command");
    }

    fn remove_scheduled(&mut self, id: CommandId) -> Option<ScheduledCommand> {
        let index = self
            .scheduled
            .iter()
            .position(|entry| entry.command.id() == id)?;
        let entry = self.scheduled.remove(index);
        for requirement in &entry.requirements {
            if self.requirements.get(requirement) == Some(&id) {
                self.requirements.remove(requirement);
            }
        }
        Some(entry)
    }

    fn entry(&self, id: CommandId) -> Option<&ScheduledCommand> {
        self.scheduled.iter().find(|entry| entry.command.id() == id)
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// Returns `true` if `command` is running.
    #[must_use]
    pub fn is_scheduled(&self, command: &CommandRef) -> bool {
        self.entry(command.id()).is_some()
    }

    /// Returns the command currently holding `subsystem`.
    #[must_use]
    pub fn requiring(&self, subsystem: SubsystemId) -> Option<CommandRef> {
        let holder = self.requirements.get(&subsystem)?;
        self.entry(*holder).map(|entry| entry.command.clone())
    }

    /// Returns how long `command` has been running.
    #[must_use]
    pub fn time_since_scheduled(&self, command: &CommandRef) -> Option<Duration> {
        self.entry(command.id())
            .map(|entry| self.config.clock.elapsed_since(entry.scheduled_at))
    }

    /// Returns the names of running commands, in scheduling order.
    #[must_use]
    pub fn scheduled_names(&self) -> Vec<String> {
        self.scheduled
            .iter()
            .map(|entry| entry.command.name())
            .collect()
    }

    /// Returns the number of running commands.
    #[must_use]
    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }

    /// Returns the current state without faults.
    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            names: self.scheduled_names(),
            ids: self
                .scheduled
                .iter()
                .map(|entry| entry.command.id())
                .collect(),
            faults: Vec::new(),
        }
    }

    // ─── Subsystems ──────────────────────────────────────────────────────────

    /// Registers `subsystem` so its periodic callbacks run every cycle.
    pub fn register_subsystem(&mut self, subsystem: &SubsystemRef) {
        if self.subsystem_entry(subsystem.id()).is_some() {
            tracing::warn!(subsystem = %subsystem.name(), "subsystem already registered");
            return;
        }
        self.subsystems.push(SubsystemEntry {
            subsystem: subsystem.clone(),
            default_command: None,
        });
    }

    /// Unregisters `subsystem` and forgets its default command.
    ///
    /// Commands already holding the subsystem keep running.
    pub fn unregister_subsystem(&mut self, subsystem: &SubsystemRef) {
        self.subsystems
            .retain(|entry| entry.subsystem.id() != subsystem.id());
    }

    /// Unregisters every subsystem.
    pub fn unregister_all_subsystems(&mut self) {
        self.subsystems.clear();
    }

    /// Returns `true` if `subsystem` is registered.
    #[must_use]
    pub fn is_registered(&self, subsystem: &SubsystemRef) -> bool {
        self.subsystem_entry(subsystem.id()).is_some()
    }

    /// Installs the command that runs on `subsystem` whenever nothing else
    /// requires it, registering the subsystem if needed.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::DefaultCommandMissingRequirement`] if `command` does
    /// not require `subsystem`.
    pub fn set_default_command(
        &mut self,
        subsystem: &SubsystemRef,
        command: CommandRef,
    ) -> Result<(), SchedulerError> {
        if !command.requires(subsystem.id()) {
            return Err(SchedulerError::DefaultCommandMissingRequirement {
                command: command.name(),
                subsystem: subsystem.name(),
            });
        }
        if !command.interruption_behavior().is_interruptible() {
            tracing::warn!(
                command = %command.name(),
                subsystem = %subsystem.name(),
                "non-interruptible default command will block other commands on this subsystem"
            );
        }

        if !self.is_registered(subsystem) {
            self.register_subsystem(subsystem);
        }
        if let Some(entry) = self
            .subsystems
            .iter_mut()
            .find(|entry| entry.subsystem.id() == subsystem.id())
        {
            entry.default_command = Some(command);
        }
        Ok(())
    }

    /// Removes and returns the default command of `subsystem`.
    ///
    /// A running default command is not canceled.
    pub fn remove_default_command(&mut self, subsystem: &SubsystemRef) -> Option<CommandRef> {
        self.subsystems
            .iter_mut()
            .find(|entry| entry.subsystem.id() == subsystem.id())
            .and_then(|entry| entry.default_command.take())
    }

    /// Returns the default command of `subsystem`.
    #[must_use]
    pub fn default_command(&self, subsystem: &SubsystemRef) -> Option<CommandRef> {
        self.subsystem_entry(subsystem.id())
            .and_then(|entry| entry.default_command.clone())
    }

    fn subsystem_entry(&self, id: SubsystemId) -> Option<&SubsystemEntry> {
        self.subsystems
            .iter()
            .find(|entry| entry.subsystem.id() == id)
    }

    // ─── Bindings ────────────────────────────────────────────────────────────

    /// Returns the loop of button bindings polled every cycle.
    pub fn button_loop_mut(&mut self) -> &mut EventLoop {
        &mut self.button_loop
    }

    /// Removes every button binding.
    pub fn clear_buttons(&mut self) {
        self.button_loop.clear();
        if self.polling_buttons {
            self.buttons_cleared = true;
        }
    }

    /// Returns a sender for deferred requests applied during [`run`](Self::run).
    #[must_use]
    pub fn requests(&self) -> RequestQueue {
        self.requests.clone()
    }

    // ─── Enable / disable ────────────────────────────────────────────────────

    /// Re-enables the scheduler.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disables the scheduler: [`run`](Self::run) and
    /// [`schedule`](Self::schedule) become no-ops until re-enabled.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Returns `true` if the scheduler is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Updates the robot's operating mode.
    ///
    /// While [`Disabled`](RobotState::Disabled), commands that do not run
    /// when disabled are interrupted on the next cycle and cannot be scheduled.
    pub fn set_robot_state(&mut self, state: RobotState) {
        if state != self.robot_state {
            tracing::info!(from = ?self.robot_state, to = ?state, "robot state changed");
        }
        self.robot_state = state;
    }

    /// Returns the robot's operating mode.
    #[must_use]
    pub fn robot_state(&self) -> RobotState {
        self.robot_state
    }

    // ─── Hooks / telemetry ───────────────────────────────────────────────────

    /// Returns the hook registry.
    pub fn hooks_mut(&mut self) -> &mut SchedulerHooks {
        &mut self.hooks
    }

    /// Returns the hook registry.
    #[must_use]
    pub fn hooks(&self) -> &SchedulerHooks {
        &self.hooks
    }

    /// Adds an observer called after every command's `initialize`.
    pub fn on_command_initialize(&mut self, hook: impl Fn(&CommandRef) + Send + Sync + 'static) {
        self.add_unnamed_hook(HookPoint::Initialize, move |event| hook(event.command()));
    }

    /// Adds an observer called after every command's `execute`.
    pub fn on_command_execute(&mut self, hook: impl Fn(&CommandRef) + Send + Sync + 'static) {
        self.add_unnamed_hook(HookPoint::Execute, move |event| hook(event.command()));
    }

    /// Adds an observer called after a command finishes on its own.
    pub fn on_command_finish(&mut self, hook: impl Fn(&CommandRef) + Send + Sync + 'static) {
        self.add_unnamed_hook(HookPoint::Finish, move |event| hook(event.command()));
    }

    /// Adds an observer called after a command is interrupted, with the
    /// interrupting command if there was one.
    pub fn on_command_interrupt(
        &mut self,
        hook: impl Fn(&CommandRef, Option<&CommandRef>) + Send + Sync + 'static,
    ) {
        self.add_unnamed_hook(HookPoint::Interrupt, move |event| {
            if let SchedulerEvent::Interrupt {
                command,
                interruptor,
            } = event
            {
                hook(*command, *interruptor);
            }
        });
    }

    fn add_unnamed_hook(
        &mut self,
        point: HookPoint,
        hook: impl Fn(&SchedulerEvent<'_>) + Send + Sync + 'static,
    ) {
        let name = format!("{point:?}#{}", self.hooks.hook_count(point));
        if let Err(err) = self.hooks.register_observer(point, name, hook) {
            tracing::warn!(%err, "failed to add scheduler hook");
        }
    }

    fn fire(&mut self, event: &SchedulerEvent<'_>) {
        self.hooks.invoke(event, &mut self.faults);
    }

    /// Attaches the sink that receives a snapshot at the end of each cycle.
    pub fn set_sink(&mut self, sink: impl SchedulerSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Detaches and returns the current sink.
    pub fn take_sink(&mut self) -> Option<Box<dyn SchedulerSink>> {
        self.sink.take()
    }

    /// Returns the loop-overrun watchdog.
    #[must_use]
    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    fn record(&mut self, fault: Fault) {
        tracing::error!(%fault, "caught panic in scheduler cycle");
        self.faults.push(fault);
    }
}

impl fmt::Debug for CommandScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandScheduler")
            .field("enabled", &self.enabled)
            .field("robot_state", &self.robot_state)
            .field("subsystems", &self.subsystems.len())
            .field("scheduled", &self.scheduled_names())
            .field("button_loop", &self.button_loop)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystem::Subsystem;

    struct Drive;

    impl Subsystem for Drive {}

    struct Hold {
        requirement: SubsystemId,
    }

    impl Command for Hold {
        fn requirements(&self) -> Vec<SubsystemId> {
            vec![self.requirement, self.requirement]
        }
    }

    fn teleop() -> CommandScheduler {
        let mut scheduler = CommandScheduler::new();
        scheduler.set_robot_state(RobotState::Teleop);
        scheduler
    }

    #[test]
    fn duplicate_requirements_are_collapsed() {
        let drive = SubsystemRef::new(Drive);
        let mut scheduler = teleop();
        let command = CommandRef::new(Hold {
            requirement: drive.id(),
        });

        scheduler.schedule(&command);
        scheduler.cancel(&command);

        assert!(scheduler.requiring(drive.id()).is_none());
        assert_eq!(scheduler.scheduled_count(), 0);
    }

    #[test]
    fn robot_disabled_blocks_schedule() {
        let mut scheduler = CommandScheduler::new();
        let command = CommandRef::new(Hold {
            requirement: SubsystemRef::new(Drive).id(),
        });
        assert_eq!(scheduler.schedule(&command), ScheduleOutcome::Disabled);
    }

    #[test]
    fn already_scheduled_is_reported() {
        let mut scheduler = teleop();
        let command = CommandRef::new(Hold {
            requirement: SubsystemRef::new(Drive).id(),
        });
        assert_eq!(scheduler.schedule(&command), ScheduleOutcome::Scheduled);
        assert_eq!(scheduler.schedule(&command), ScheduleOutcome::AlreadyScheduled);
        assert!(scheduler.schedule(&command).is_running());
    }

    #[test]
    fn set_period_updates_watchdog() {
        let mut scheduler = CommandScheduler::new();
        scheduler.set_period(Duration::from_millis(5));
        assert_eq!(scheduler.watchdog().timeout(), Duration::from_millis(5));
        assert_eq!(scheduler.config().period, Duration::from_millis(5));
    }

    #[test]
    fn unregister_forgets_default() {
        let drive = SubsystemRef::new(Drive);
        let mut scheduler = teleop();
        let hold = CommandRef::new(Hold {
            requirement: drive.id(),
        });
        scheduler.set_default_command(&drive, hold.clone()).unwrap();
        assert!(scheduler.is_registered(&drive));
        assert_eq!(scheduler.default_command(&drive), Some(hold));

        scheduler.unregister_subsystem(&drive);
        assert!(!scheduler.is_registered(&drive));
        assert!(scheduler.default_command(&drive).is_none());
    }
}
