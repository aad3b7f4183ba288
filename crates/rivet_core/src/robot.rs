//! The periodic driver that ticks the scheduler.
//!
//! [`TimedRobot`] owns the [`CommandScheduler`] and the [`HalContext`] and
//! calls a user [`RobotProgram`] once per loop period. Each [`step`] runs:
//!
//! 1. mode transition callbacks, if the driver station changed mode
//! 2. the current mode's periodic callback
//! 3. `robot_periodic`
//! 4. `simulation_periodic` (simulation only)
//! 5. one [`CommandScheduler::run`]
//! 6. the loop-overrun check
//!
//! [`step`]: TimedRobot::step

use std::sync::Arc;
use std::time::{Duration, Instant};

use rivet_command::clock::Clock;
use rivet_command::scheduler::{CommandScheduler, DEFAULT_PERIOD, RobotState, SchedulerConfig};
use rivet_command::watchdog::Watchdog;
use rivet_hal::context::HalContext;

use crate::error::RobotError;

// ─────────────────────────────────────────────────────────────────────────────
// RobotProgram
// ─────────────────────────────────────────────────────────────────────────────

/// Borrowed view of the robot's runtime passed to every program callback.
#[derive(Debug)]
pub struct RobotContext<'a> {
    /// The command scheduler.
    pub scheduler: &'a mut CommandScheduler,
    /// The handle registries.
    pub hal: &'a HalContext,
}

/// User robot code, called by [`TimedRobot`].
///
/// Every method has an empty default; implement the ones the robot needs.
/// Callbacks run on the driver thread and must return quickly.
pub trait RobotProgram: Send + 'static {
    /// Called once before the first loop, and again after a restart.
    fn robot_init(&mut self, _ctx: &mut RobotContext<'_>) {}

    /// Called every loop, in every mode, before the scheduler runs.
    fn robot_periodic(&mut self, _ctx: &mut RobotContext<'_>) {}

    /// Called every loop in simulation, after `robot_periodic`.
    fn simulation_periodic(&mut self, _ctx: &mut RobotContext<'_>) {}

    /// Called once when a mode is entered.
    fn mode_init(&mut self, _mode: RobotState, _ctx: &mut RobotContext<'_>) {}

    /// Called every loop while in a mode.
    fn mode_periodic(&mut self, _mode: RobotState, _ctx: &mut RobotContext<'_>) {}

    /// Called once when a mode is left.
    fn mode_exit(&mut self, _mode: RobotState, _ctx: &mut RobotContext<'_>) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// TimedRobotConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct TimedRobotConfig {
    /// Loop period, also the scheduler's cycle budget.
    pub period: Duration,
    /// Whether to call simulation callbacks.
    pub simulation: bool,
    /// Whether [`TimedRobot::run_cycles`] sleeps until each loop deadline.
    pub realtime: bool,
    /// Time source shared with the scheduler.
    pub clock: Clock,
}

impl Default for TimedRobotConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            simulation: false,
            realtime: true,
            clock: Clock::system(),
        }
    }
}

impl TimedRobotConfig {
    /// Creates the default configuration: 20 ms, real time, not simulated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the loop period.
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Enables simulation callbacks.
    #[must_use]
    pub fn with_simulation(mut self, simulation: bool) -> Self {
        self.simulation = simulation;
        self
    }

    /// Sets whether loops are paced against the clock.
    #[must_use]
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Sets the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new()
            .with_period(self.period)
            .with_simulation(self.simulation)
            .with_clock(self.clock.clone())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TimedRobot
// ─────────────────────────────────────────────────────────────────────────────

/// Calls a [`RobotProgram`] and the scheduler once per loop period.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rivet_command::scheduler::RobotState;
/// use rivet_core::robot::{RobotContext, RobotProgram, TimedRobot, TimedRobotConfig};
/// use rivet_hal::context::HalContext;
///
/// #[derive(Default)]
/// struct Robot { teleop_loops: u32 }
///
/// impl RobotProgram for Robot {
///     fn mode_periodic(&mut self, mode: RobotState, _ctx: &mut RobotContext<'_>) {
///         if mode == RobotState::Teleop {
///             self.teleop_loops += 1;
///         }
///     }
/// }
///
/// let mut robot = TimedRobot::new(
///     Robot::default(),
///     Arc::new(HalContext::new()),
///     TimedRobotConfig::new().with_realtime(false),
/// )
/// .unwrap();
///
/// robot.set_mode(RobotState::Teleop);
/// robot.run_cycles(3);
/// assert_eq!(robot.program().teleop_loops, 3);
/// ```
#[derive(Debug)]
pub struct TimedRobot<P: RobotProgram> {
    config: TimedRobotConfig,
    program: P,
    scheduler: CommandScheduler,
    hal: Arc<HalContext>,
    /// Mode requested by the driver station.
    requested_mode: RobotState,
    /// Mode whose `mode_init` has run; `None` before the first loop.
    current_mode: Option<RobotState>,
    initialized: bool,
    cycles: u64,
    watchdog: Watchdog,
}

impl<P: RobotProgram> TimedRobot<P> {
    /// Creates a driver for `program`, starting disabled.
    ///
    /// # Errors
    ///
    /// [`RobotError::InvalidPeriod`] if the period is zero.
    pub fn new(program: P, hal: Arc<HalContext>, config: TimedRobotConfig) -> Result<Self, RobotError> {
        if config.period.is_zero() {
            return Err(RobotError::InvalidPeriod {
                period: config.period,
            });
        }

        let scheduler = CommandScheduler::with_config(config.scheduler_config());
        let watchdog = Watchdog::new(config.period, config.clock.clone());
        tracing::info!(period = ?config.period, simulation = config.simulation, "robot created");

        Ok(Self {
            config,
            program,
            scheduler,
            hal,
            requested_mode: RobotState::Disabled,
            current_mode: None,
            initialized: false,
            cycles: 0,
            watchdog,
        })
    }

    /// Requests a mode change, applied at the start of the next loop.
    pub fn set_mode(&mut self, mode: RobotState) {
        self.requested_mode = mode;
    }

    /// Returns the mode the robot is currently running in.
    #[must_use]
    pub fn mode(&self) -> RobotState {
        self.current_mode.unwrap_or(self.requested_mode)
    }

    /// Runs one loop iteration without waiting.
    pub fn step(&mut self) {
        let _span = tracing::trace_span!("robot_loop", cycle = self.cycles).entered();
        self.watchdog.reset();

        let program = &mut self.program;
        let mut ctx = RobotContext {
            scheduler: &mut self.scheduler,
            hal: &self.hal,
        };

        if !self.initialized {
            program.robot_init(&mut ctx);
            self.initialized = true;
            self.watchdog.add_epoch("robot_init()");
        }

        let mode = self.requested_mode;
        if self.current_mode != Some(mode) {
            if let Some(previous) = self.current_mode {
                program.mode_exit(previous, &mut ctx);
                self.watchdog.add_epoch(format!("{previous:?}.exit()"));
            }
            ctx.scheduler.set_robot_state(mode);
            program.mode_init(mode, &mut ctx);
            self.watchdog.add_epoch(format!("{mode:?}.init()"));
            self.current_mode = Some(mode);
        }

        program.mode_periodic(mode, &mut ctx);
        self.watchdog.add_epoch(format!("{mode:?}.periodic()"));

        program.robot_periodic(&mut ctx);
        self.watchdog.add_epoch("robot_periodic()");

        if self.config.simulation {
            program.simulation_periodic(&mut ctx);
            self.watchdog.add_epoch("simulation_periodic()");
        }

        ctx.scheduler.run();
        self.watchdog.add_epoch("CommandScheduler.run()");

        self.watchdog.check("TimedRobot");
        self.cycles += 1;
    }

    /// Runs `cycles` loop iterations, pacing them to the period in real time.
    pub fn run_cycles(&mut self, cycles: u64) {
        let start = self.config.clock.now();
        for cycle in 0..cycles {
            self.step();
            if self.config.realtime {
                self.sleep_until(start, cycle + 1);
            }
        }
    }

    /// Sleeps until the end of loop `index` counted from `start`.
    ///
    /// A loop that overran is not made up for; the next one starts at once.
    fn sleep_until(&self, start: Instant, index: u64) {
        let offset = self
            .config
            .period
            .saturating_mul(u32::try_from(index).unwrap_or(u32::MAX));
        let Some(deadline) = start.checked_add(offset) else {
            return;
        };
        let now = self.config.clock.now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }

    /// Stops every command, drops deferred requests, forgets subsystems and
    /// bindings, and resets every handle registry, then reruns `robot_init` on
    /// the next loop.
    ///
    /// Used when a simulation restarts without restarting the process.
    pub fn restart(&mut self) {
        let dropped = self.scheduler.requests().clear();
        self.scheduler.cancel_all();
        self.scheduler.unregister_all_subsystems();
        self.scheduler.clear_buttons();
        self.hal.reset_all();
        self.current_mode = None;
        self.requested_mode = RobotState::Disabled;
        self.scheduler.set_robot_state(RobotState::Disabled);
        self.initialized = false;
        tracing::info!(cycles = self.cycles, dropped, "robot restarted");
    }

    /// Returns the number of completed loops.
    #[must_use]
    pub fn cycle_count(&self) -> u64 {
        self.cycles
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &TimedRobotConfig {
        &self.config
    }

    /// Returns the scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &CommandScheduler {
        &self.scheduler
    }

    /// Returns the scheduler for setup calls.
    pub fn scheduler_mut(&mut self) -> &mut CommandScheduler {
        &mut self.scheduler
    }

    /// Returns the handle registries.
    #[must_use]
    pub fn hal(&self) -> &Arc<HalContext> {
        &self.hal
    }

    /// Returns the user program.
    #[must_use]
    pub fn program(&self) -> &P {
        &self.program
    }

    /// Returns the user program mutably.
    pub fn program_mut(&mut self) -> &mut P {
        &mut self.program
    }

    /// Returns the loop-overrun watchdog.
    #[must_use]
    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }
}
