//! Scheduler cycle behavior: conflicts, defaults, faults and telemetry.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rivet_command::prelude::*;

type Log = Arc<Mutex<Vec<String>>>;

fn count(log: &Log, entry: &str) -> usize {
    log.lock().iter().filter(|logged| *logged == entry).count()
}

/// A command that records every callback it receives.
struct Probe {
    name: &'static str,
    log: Log,
    requirements: Vec<SubsystemId>,
    behavior: InterruptionBehavior,
    runs_when_disabled: bool,
    /// Finishes after this many executes; `None` runs forever.
    finish_after: Option<usize>,
    executes: usize,
    panic_on_execute: bool,
    panic_on_initialize: bool,
    panic_on_requirements: bool,
    on_execute: Option<Box<dyn FnMut() + Send>>,
}

impl Probe {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
            requirements: Vec::new(),
            behavior: InterruptionBehavior::CancelSelf,
            runs_when_disabled: false,
            finish_after: None,
            executes: 0,
            panic_on_execute: false,
            panic_on_initialize: false,
            panic_on_requirements: false,
            on_execute: None,
        }
    }

    fn requiring(mut self, subsystem: &SubsystemRef) -> Self {
        self.requirements.push(subsystem.id());
        self
    }

    fn stubborn(mut self) -> Self {
        self.behavior = InterruptionBehavior::CancelIncoming;
        self
    }

    fn finishing_after(mut self, executes: usize) -> Self {
        self.finish_after = Some(executes);
        self
    }

    fn panicking(mut self) -> Self {
        self.panic_on_execute = true;
        self
    }

    fn panicking_on_initialize(mut self) -> Self {
        self.panic_on_initialize = true;
        self
    }

    fn panicking_on_requirements(mut self) -> Self {
        self.panic_on_requirements = true;
        self
    }

    fn when_disabled(mut self) -> Self {
        self.runs_when_disabled = true;
        self
    }

    fn on_execute(mut self, action: impl FnMut() + Send + 'static) -> Self {
        self.on_execute = Some(Box::new(action));
        self
    }

    fn shared(self) -> CommandRef {
        CommandRef::new(self)
    }
}

impl Command for Probe {
    fn initialize(&mut self) {
        if self.panic_on_initialize {
            panic!("{} failed to home", self.name);
        }
        self.executes = 0;
        self.log.lock().push(format!("{}.initialize", self.name));
    }

    fn execute(&mut self) {
        if self.panic_on_execute {
            panic!("{} lost its encoder", self.name);
        }
        self.executes += 1;
        self.log.lock().push(format!("{}.execute", self.name));
        if let Some(action) = &mut self.on_execute {
            action();
        }
    }

    fn end(&mut self, interrupted: bool) {
        self.log
            .lock()
            .push(format!("{}.end({interrupted})", self.name));
    }

    fn is_finished(&mut self) -> bool {
        self.finish_after.is_some_and(|limit| self.executes >= limit)
    }

    fn requirements(&self) -> Vec<SubsystemId> {
        if self.panic_on_requirements {
            panic!("{} has no mechanism", self.name);
        }
        self.requirements.clone()
    }

    fn name(&self) -> &str {
        self.name
    }

    fn runs_when_disabled(&self) -> bool {
        self.runs_when_disabled
    }

    fn interruption_behavior(&self) -> InterruptionBehavior {
        self.behavior
    }
}

/// A subsystem that counts its periodic calls.
struct Counter {
    name: &'static str,
    log: Log,
    panics: bool,
}

impl Subsystem for Counter {
    fn periodic(&mut self) {
        if self.panics {
            panic!("{} brownout", self.name);
        }
        self.log.lock().push(format!("{}.periodic", self.name));
    }

    fn simulation_periodic(&mut self) {
        self.log.lock().push(format!("{}.simulation", self.name));
    }

    fn name(&self) -> &str {
        self.name
    }
}

fn subsystem(name: &'static str, log: &Log) -> SubsystemRef {
    SubsystemRef::new(Counter {
        name,
        log: log.clone(),
        panics: false,
    })
}

fn teleop() -> CommandScheduler {
    let mut scheduler = CommandScheduler::new();
    scheduler.set_robot_state(RobotState::Teleop);
    scheduler
}

fn mock_scheduler(period: Duration) -> (Arc<MockClock>, CommandScheduler) {
    let mock = Arc::new(MockClock::new(Instant::now()));
    let mut scheduler = CommandScheduler::with_config(
        SchedulerConfig::new()
            .with_period(period)
            .with_clock(Clock::with_provider(mock.clone())),
    );
    scheduler.set_robot_state(RobotState::Teleop);
    (mock, scheduler)
}

#[derive(Clone, Default)]
struct RecordingSink {
    snapshots: Arc<Mutex<Vec<SchedulerSnapshot>>>,
    cancel_requests: Arc<Mutex<Vec<CommandId>>>,
}

impl SchedulerSink for RecordingSink {
    fn publish(&mut self, snapshot: &SchedulerSnapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }

    fn take_cancel_requests(&mut self) -> Vec<CommandId> {
        std::mem::take(&mut *self.cancel_requests.lock())
    }
}

// ─── Conflicts ───────────────────────────────────────────────────────────────

/// Test that an interruptible holder is interrupted by the new command within the call.
#[test]
fn interruptible_holder_is_displaced() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);
    let mut scheduler = teleop();

    let a = Probe::new("A", &log).requiring(&arm).shared();
    let b = Probe::new("B", &log).requiring(&arm).shared();

    scheduler.schedule(&a);
    assert_eq!(scheduler.schedule(&b), ScheduleOutcome::Scheduled);

    assert_eq!(count(&log, "A.end(true)"), 1);
    assert!(!scheduler.is_scheduled(&a));
    assert_eq!(scheduler.requiring(arm.id()), Some(b));
}

/// Test that a non-interruptible holder blocks the new command before its initialize.
#[test]
fn non_interruptible_holder_rejects_incoming() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);
    let mut scheduler = teleop();

    let a = Probe::new("A", &log).requiring(&arm).stubborn().shared();
    let b = Probe::new("B", &log).requiring(&arm).shared();

    scheduler.schedule(&a);
    assert_eq!(
        scheduler.schedule(&b),
        ScheduleOutcome::Rejected { blocker: a.clone() }
    );
    scheduler.run();

    assert!(scheduler.is_scheduled(&a));
    assert!(!scheduler.is_scheduled(&b));
    assert_eq!(count(&log, "B.initialize"), 0);
    assert_eq!(count(&log, "A.end(true)"), 0);
}

/// Test that one non-interruptible holder blocks the whole requirement set.
#[test]
fn conflict_check_is_all_or_nothing() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);
    let wrist = subsystem("Wrist", &log);
    let mut scheduler = teleop();

    let soft = Probe::new("Soft", &log).requiring(&arm).shared();
    let hard = Probe::new("Hard", &log).requiring(&wrist).stubborn().shared();
    let both = Probe::new("Both", &log)
        .requiring(&arm)
        .requiring(&wrist)
        .shared();

    scheduler.schedule(&soft);
    scheduler.schedule(&hard);
    assert!(matches!(
        scheduler.schedule(&both),
        ScheduleOutcome::Rejected { .. }
    ));

    // The interruptible holder was not touched either.
    assert!(scheduler.is_scheduled(&soft));
    assert_eq!(count(&log, "Soft.end(true)"), 0);
    assert_eq!(scheduler.requiring(arm.id()), Some(soft));
}

/// Test the back-to-back scenario: two interruptible commands in one cycle.
#[test]
fn back_to_back_schedules_leave_only_the_second() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);
    let mut scheduler = teleop();

    let first = Probe::new("First", &log).requiring(&arm).shared();
    let second = Probe::new("Second", &log).requiring(&arm).shared();

    scheduler.schedule(&first);
    scheduler.schedule(&second);
    scheduler.run();

    assert_eq!(scheduler.scheduled_names(), vec!["Second".to_owned()]);
    assert_eq!(count(&log, "First.end(true)"), 1);
    assert_eq!(count(&log, "First.end(false)"), 0);
    assert_eq!(count(&log, "First.execute"), 0);
}

/// Test that cancel runs the interrupted end before returning.
#[test]
fn cancel_is_synchronous() {
    let log = Log::default();
    let mut scheduler = teleop();
    let command = Probe::new("Spin", &log).shared();

    scheduler.schedule(&command);
    scheduler.cancel(&command);
    assert_eq!(log.lock().last().map(String::as_str), Some("Spin.end(true)"));

    // Cancelling again is a no-op.
    scheduler.cancel(&command);
    assert_eq!(count(&log, "Spin.end(true)"), 1);
}

// ─── Cycle ───────────────────────────────────────────────────────────────────

/// Test the documented order of one cycle.
#[test]
fn cycle_runs_periodics_before_commands() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);
    let mut scheduler = teleop();
    scheduler.register_subsystem(&arm);

    let command = Probe::new("Lift", &log)
        .requiring(&arm)
        .finishing_after(1)
        .shared();
    scheduler.schedule(&command);
    scheduler.run();

    assert_eq!(
        *log.lock(),
        ["Lift.initialize", "Arm.periodic", "Lift.execute", "Lift.end(false)"]
    );
    assert!(scheduler.requiring(arm.id()).is_none());
}

/// Test that simulation callbacks only run in simulation.
#[test]
fn simulation_periodic_follows_config() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);

    let mut real = teleop();
    real.register_subsystem(&arm);
    real.run();
    assert_eq!(count(&log, "Arm.simulation"), 0);

    let mut simulated = CommandScheduler::with_config(SchedulerConfig::new().with_simulation(true));
    simulated.register_subsystem(&arm);
    simulated.run();
    assert_eq!(count(&log, "Arm.simulation"), 1);
}

/// Test that a disabled scheduler neither runs nor starts anything.
#[test]
fn disabled_scheduler_is_inert() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);
    let mut scheduler = teleop();
    scheduler.register_subsystem(&arm);

    let running = Probe::new("Running", &log).requiring(&arm).shared();
    scheduler.schedule(&running);
    log.lock().clear();

    scheduler.disable();
    let late = Probe::new("Late", &log).shared();
    assert_eq!(scheduler.schedule(&late), ScheduleOutcome::Disabled);
    scheduler.run();
    scheduler.run();

    assert!(log.lock().is_empty());
    assert!(scheduler.is_scheduled(&running));

    scheduler.enable();
    scheduler.run();
    assert_eq!(*log.lock(), ["Arm.periodic", "Running.execute"]);
}

/// Test that a disabled robot ends commands that do not run when disabled.
#[test]
fn robot_disable_interrupts_ordinary_commands() {
    let log = Log::default();
    let mut scheduler = teleop();

    let drive = Probe::new("Drive", &log).shared();
    let leds = Probe::new("Leds", &log).when_disabled().shared();
    scheduler.schedule(&drive);
    scheduler.schedule(&leds);

    scheduler.set_robot_state(RobotState::Disabled);
    scheduler.run();

    assert_eq!(count(&log, "Drive.end(true)"), 1);
    assert_eq!(count(&log, "Drive.execute"), 0);
    assert_eq!(count(&log, "Leds.execute"), 1);
    assert_eq!(scheduler.schedule(&drive), ScheduleOutcome::Disabled);
}

// ─── Default commands ────────────────────────────────────────────────────────

/// Test that a default command starts when free and yields to a claimant.
#[test]
fn default_command_starts_and_is_displaced() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);
    let mut scheduler = teleop();

    let hold = Probe::new("Hold", &log).requiring(&arm).shared();
    scheduler.set_default_command(&arm, hold.clone()).unwrap();
    assert!(!scheduler.is_scheduled(&hold));

    scheduler.run();
    assert!(scheduler.is_scheduled(&hold));

    let raise = Probe::new("Raise", &log)
        .requiring(&arm)
        .finishing_after(2)
        .shared();
    scheduler.schedule(&raise);
    assert_eq!(count(&log, "Hold.end(true)"), 1);
    assert_eq!(scheduler.requiring(arm.id()), Some(raise.clone()));

    scheduler.run();
    assert!(scheduler.is_scheduled(&raise));

    // Raise finishes, and the default reclaims the arm in the same cycle.
    scheduler.run();
    assert!(!scheduler.is_scheduled(&raise));
    assert_eq!(scheduler.requiring(arm.id()), Some(hold));
    assert_eq!(count(&log, "Hold.initialize"), 2);
}

/// Test that a default command that finishes is simply rescheduled.
#[test]
fn finishing_default_command_is_rescheduled() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);
    let mut scheduler = teleop();

    let pulse = Probe::new("Pulse", &log)
        .requiring(&arm)
        .finishing_after(1)
        .shared();
    scheduler.set_default_command(&arm, pulse.clone()).unwrap();

    for _ in 0..3 {
        scheduler.run();
    }
    assert_eq!(count(&log, "Pulse.end(false)"), 2);
    assert!(scheduler.is_scheduled(&pulse));
}

/// Test that a default command must require its subsystem.
#[test]
fn default_command_must_require_subsystem() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);
    let mut scheduler = teleop();

    let wander = Probe::new("Wander", &log).shared();
    let err = scheduler.set_default_command(&arm, wander).unwrap_err();
    assert_eq!(
        err,
        SchedulerError::DefaultCommandMissingRequirement {
            command: "Wander".into(),
            subsystem: "Arm".into(),
        }
    );
    assert!(scheduler.default_command(&arm).is_none());
}

// ─── Faults ──────────────────────────────────────────────────────────────────

/// Test that a panicking command is evicted without stopping the others.
#[test]
fn panicking_command_does_not_stop_the_cycle() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);
    let wrist = subsystem("Wrist", &log);
    let mut scheduler = teleop();
    let sink = RecordingSink::default();
    scheduler.set_sink(sink.clone());

    let broken = Probe::new("Broken", &log).requiring(&arm).panicking().shared();
    let healthy = Probe::new("Healthy", &log).requiring(&wrist).shared();
    scheduler.schedule(&broken);
    scheduler.schedule(&healthy);
    scheduler.run();

    assert!(!scheduler.is_scheduled(&broken));
    assert!(scheduler.requiring(arm.id()).is_none());
    assert_eq!(count(&log, "Broken.end(true)"), 1);
    assert_eq!(count(&log, "Healthy.execute"), 1);

    let snapshots = sink.snapshots.lock();
    let faults = &snapshots[0].faults;
    assert_eq!(faults.len(), 1);
    assert_eq!(
        faults[0].origin,
        FaultOrigin::Command {
            id: broken.id(),
            name: "Broken".into(),
            phase: "execute",
        }
    );
    assert_eq!(faults[0].message, "Broken lost its encoder");
}

/// Test that a command panicking in `initialize` is dropped and frees its subsystem.
#[test]
fn initialize_panic_faults_the_schedule() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);
    let mut scheduler = teleop();
    let sink = RecordingSink::default();
    scheduler.set_sink(sink.clone());

    let holder = Probe::new("Holder", &log).requiring(&arm).shared();
    let broken = Probe::new("Broken", &log)
        .requiring(&arm)
        .panicking_on_initialize()
        .shared();
    scheduler.schedule(&holder);

    assert_eq!(scheduler.schedule(&broken), ScheduleOutcome::Faulted);
    assert!(!scheduler.is_scheduled(&broken));
    assert!(!scheduler.is_scheduled(&holder));
    assert!(scheduler.requiring(arm.id()).is_none());
    assert_eq!(count(&log, "Holder.end(true)"), 1);
    assert_eq!(count(&log, "Broken.end(true)"), 1);

    scheduler.run();
    assert_eq!(count(&log, "Broken.execute"), 0);
    let snapshots = sink.snapshots.lock();
    assert!(snapshots[0].names.is_empty());
    assert_eq!(snapshots[0].faults.len(), 1);
    assert_eq!(
        snapshots[0].faults[0].origin,
        FaultOrigin::Command {
            id: broken.id(),
            name: "Broken".into(),
            phase: "initialize",
        }
    );
    assert_eq!(snapshots[0].faults[0].message, "Broken failed to home");
}

/// Test that a command panicking in `requirements` never displaces the holder.
#[test]
fn requirements_panic_faults_the_schedule() {
    let log = Log::default();
    let arm = subsystem("Arm", &log);
    let mut scheduler = teleop();
    let sink = RecordingSink::default();
    scheduler.set_sink(sink.clone());

    let holder = Probe::new("Holder", &log).requiring(&arm).shared();
    let broken = Probe::new("Broken", &log)
        .requiring(&arm)
        .panicking_on_requirements()
        .shared();
    scheduler.schedule(&holder);

    assert_eq!(scheduler.schedule(&broken), ScheduleOutcome::Faulted);
    assert!(!scheduler.is_scheduled(&broken));
    assert_eq!(scheduler.requiring(arm.id()), Some(holder.clone()));
    assert_eq!(count(&log, "Broken.initialize"), 0);
    assert_eq!(count(&log, "Holder.end(true)"), 0);

    scheduler.run();
    let snapshots = sink.snapshots.lock();
    assert_eq!(snapshots[0].faults.len(), 1);
    assert_eq!(
        snapshots[0].faults[0].origin,
        FaultOrigin::Command {
            id: broken.id(),
            name: "Broken".into(),
            phase: "requirements",
        }
    );
}

/// Test that a panicking subsystem does not stop other subsystems or commands.
#[test]
fn panicking_subsystem_is_isolated() {
    let log = Log::default();
    let bad = SubsystemRef::new(Counter {
        name: "Bad",
        log: log.clone(),
        panics: true,
    });
    let good = subsystem("Good", &log);
    let mut scheduler = teleop();
    scheduler.register_subsystem(&bad);
    scheduler.register_subsystem(&good);
    let sink = RecordingSink::default();
    scheduler.set_sink(sink.clone());

    scheduler.run();
    scheduler.run();

    assert_eq!(count(&log, "Good.periodic"), 2);
    let snapshots = sink.snapshots.lock();
    assert_eq!(snapshots.len(), 2);
    assert!(snapshots.iter().all(|snapshot| snapshot.faults.len() == 1));
    assert_eq!(snapshots[0].faults[0].to_string(), "Bad.periodic() panicked: Bad brownout");
}

/// Test that a panicking hook is reported and does not affect scheduling.
#[test]
fn panicking_hook_is_isolated() {
    let log = Log::default();
    let mut scheduler = teleop();
    let sink = RecordingSink::default();
    scheduler.set_sink(sink.clone());
    scheduler
        .hooks_mut()
        .register_observer(HookPoint::Initialize, "explodes", |_| panic!("hook failure"))
        .unwrap();

    let command = Probe::new("Spin", &log).shared();
    assert_eq!(scheduler.schedule(&command), ScheduleOutcome::Scheduled);
    scheduler.run();

    assert!(scheduler.is_scheduled(&command));
    assert_eq!(count(&log, "Spin.execute"), 1);
    let snapshots = sink.snapshots.lock();
    assert!(matches!(
        &snapshots[0].faults[0].origin,
        FaultOrigin::Hook { name, point: HookPoint::Initialize } if name == "explodes"
    ));
}

// ─── Hooks ───────────────────────────────────────────────────────────────────

/// Test that hooks observe the lifecycle in order, with the interruptor.
#[test]
fn hooks_observe_lifecycle() {
    let log = Log::default();
    let events = Log::default();
    let arm = subsystem("Arm", &log);
    let mut scheduler = teleop();

    let seen = events.clone();
    scheduler.on_command_initialize(move |command| seen.lock().push(format!("init {}", command.name())));
    let seen = events.clone();
    scheduler.on_command_execute(move |command| seen.lock().push(format!("exec {}", command.name())));
    let seen = events.clone();
    scheduler.on_command_finish(move |command| seen.lock().push(format!("finish {}", command.name())));
    let seen = events.clone();
    scheduler.on_command_interrupt(move |command, interruptor| {
        let by = interruptor.map_or_else(|| "-".to_owned(), CommandRef::name);
        seen.lock().push(format!("interrupt {} by {by}", command.name()));
    });

    let a = Probe::new("A", &log).requiring(&arm).shared();
    let b = Probe::new("B", &log).requiring(&arm).finishing_after(1).shared();
    scheduler.schedule(&a);
    scheduler.schedule(&b);
    scheduler.run();

    assert_eq!(
        *events.lock(),
        ["init A", "interrupt A by B", "init B", "exec B", "finish B"]
    );
    assert_eq!(scheduler.hooks().hook_count(HookPoint::Interrupt), 1);
}

// ─── Deferred requests ───────────────────────────────────────────────────────

/// Test that requests from another thread are applied after commands execute.
#[test]
fn requests_apply_after_execute() {
    let log = Log::default();
    let mut scheduler = teleop();
    let running = Probe::new("Running", &log).shared();
    let queued = Probe::new("Queued", &log).shared();
    scheduler.schedule(&running);

    let requests = scheduler.requests();
    let sender = {
        let (running, queued) = (running.clone(), queued.clone());
        thread::spawn(move || {
            requests.schedule(&queued);
            requests.cancel(&running);
        })
    };
    sender.join().unwrap();
    assert_eq!(scheduler.requests().len(), 2);

    scheduler.run();

    let log = log.lock();
    let executed = log.iter().position(|entry| entry == "Running.execute");
    let ended = log.iter().position(|entry| entry == "Running.end(true)");
    let started = log.iter().position(|entry| entry == "Queued.initialize");
    assert!(executed < ended && executed < started);
    assert!(!log.contains(&"Queued.execute".to_owned()));
    assert!(scheduler.is_scheduled(&queued));
    assert!(scheduler.requests().is_empty());
}

/// Test that a request to cancel everything clears the schedule.
#[test]
fn cancel_all_request() {
    let log = Log::default();
    let mut scheduler = teleop();
    let commands: Vec<CommandRef> = ["A", "B", "C"]
        .into_iter()
        .map(|name| Probe::new(name, &log).shared())
        .collect();
    let outcomes = scheduler.schedule_all(&commands);
    assert!(outcomes.iter().all(ScheduleOutcome::is_running));

    scheduler.requests().cancel_all();
    scheduler.run();
    assert_eq!(scheduler.scheduled_count(), 0);
}

// ─── Time ────────────────────────────────────────────────────────────────────

/// Test that a slow cycle is reported as an overrun with per-callback epochs.
#[test]
fn watchdog_reports_overrun() {
    let log = Log::default();
    let (mock, mut scheduler) = mock_scheduler(Duration::from_millis(20));

    let slow = {
        let mock = mock.clone();
        Probe::new("Slow", &log)
            .on_execute(move || mock.advance(Duration::from_millis(30)))
            .shared()
    };
    scheduler.schedule(&slow);

    scheduler.run();
    assert_eq!(scheduler.watchdog().overrun_count(), 1);
    let epochs = scheduler.watchdog().epochs();
    assert!(
        epochs
            .iter()
            .any(|(name, spent)| name == "Slow.execute()" && *spent == Duration::from_millis(30))
    );

    scheduler.cancel(&slow);
    scheduler.run();
    assert_eq!(scheduler.watchdog().overrun_count(), 1);
}

/// Test that time since scheduling follows the clock.
#[test]
fn time_since_scheduled_tracks_clock() {
    let log = Log::default();
    let (mock, mut scheduler) = mock_scheduler(Duration::from_millis(20));
    let command = Probe::new("Wait", &log).shared();

    assert!(scheduler.time_since_scheduled(&command).is_none());
    scheduler.schedule(&command);
    mock.advance(Duration::from_millis(60));
    assert_eq!(
        scheduler.time_since_scheduled(&command),
        Some(Duration::from_millis(60))
    );
}

// ─── Telemetry ───────────────────────────────────────────────────────────────

/// Test that the sink sees running commands and can cancel them.
#[test]
fn sink_receives_snapshots_and_cancels() {
    let log = Log::default();
    let mut scheduler = teleop();
    let sink = RecordingSink::default();
    scheduler.set_sink(sink.clone());

    let a = Probe::new("A", &log).shared();
    let b = Probe::new("B", &log).shared();
    scheduler.schedule(&a);
    scheduler.schedule(&b);
    scheduler.run();

    {
        let snapshots = sink.snapshots.lock();
        assert_eq!(snapshots[0].names, vec!["A".to_owned(), "B".to_owned()]);
        assert!(snapshots[0].contains(a.id()));
        assert!(snapshots[0].faults.is_empty());
    }

    sink.cancel_requests.lock().push(a.id());
    scheduler.run();

    assert!(!scheduler.is_scheduled(&a));
    assert_eq!(count(&log, "A.end(true)"), 1);
    assert_eq!(sink.snapshots.lock()[1].names, vec!["B".to_owned()]);

    assert!(scheduler.take_sink().is_some());
    scheduler.run();
    assert_eq!(sink.snapshots.lock().len(), 2);
}
