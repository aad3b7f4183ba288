//! Simulated competition robot built with Rivet.
//!
//! A differential drivetrain and a roller intake, both backed by simulated
//! devices opened through the handle registries. The autonomous routine
//! drives out while intaking, drives back once a piece is held, and ejects it.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  TimedRobot loop (one cycle)                                  │
//! │                                                               │
//! │  ┌──────────┐   ┌───────────────┐   ┌──────────────────────┐  │
//! │  │ Controls │──▶│ Button loop   │──▶│ CommandScheduler     │  │
//! │  └──────────┘   │ (triggers)    │   │  periodic → execute  │  │
//! │                 └───────────────┘   └──────────┬───────────┘  │
//! │                                                ▼              │
//! │                              ┌──────────────┐  ┌──────────┐   │
//! │                              │ Drivetrain   │  │ Intake   │   │
//! │                              └──────┬───────┘  └────┬─────┘   │
//! │                                     ▼               ▼         │
//! │                              Encoders (Limited)  DIO (Indexed)│
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod subsystems;

pub use subsystems::{Drivetrain, Hardware, Intake};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use parking_lot::Mutex;
use rivet_command::prelude::*;
use rivet_core::RobotError;
use rivet_core::robot::{RobotContext, RobotProgram};

/// Distance from the start line to the game piece, in metres.
pub const PICKUP_DISTANCE: f64 = 1.0;

/// Distance within which a drive-to-distance command finishes.
const DISTANCE_TOLERANCE: f64 = 0.05;

/// Drive speed used by the autonomous routine.
const AUTO_SPEED: f64 = 0.6;

// ─────────────────────────────────────────────────────────────────────────────
// Controls
// ─────────────────────────────────────────────────────────────────────────────

/// Simulated operator inputs, shared between the driver station thread and
/// the robot loop.
///
/// Axes are stored in percent so they fit an atomic integer.
#[derive(Debug, Clone, Default)]
pub struct Controls {
    forward: Arc<AtomicI32>,
    turn: Arc<AtomicI32>,
    intake: Arc<AtomicBool>,
    eject: Arc<AtomicBool>,
}

impl Controls {
    /// Creates centred controls with no buttons held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stick axes, each in `[-1, 1]`.
    pub fn set_sticks(&self, forward: f64, turn: f64) {
        self.forward.store(to_percent(forward), Ordering::Relaxed);
        self.turn.store(to_percent(turn), Ordering::Relaxed);
    }

    /// Presses or releases the intake button.
    pub fn set_intake(&self, held: bool) {
        self.intake.store(held, Ordering::Relaxed);
    }

    /// Presses or releases the eject button.
    pub fn set_eject(&self, held: bool) {
        self.eject.store(held, Ordering::Relaxed);
    }

    fn sticks(&self) -> (f64, f64) {
        (
            f64::from(self.forward.load(Ordering::Relaxed)) / 100.0,
            f64::from(self.turn.load(Ordering::Relaxed)) / 100.0,
        )
    }

    fn button(flag: &Arc<AtomicBool>) -> Trigger {
        let flag = flag.clone();
        Trigger::new(move || flag.load(Ordering::Relaxed))
    }
}

fn to_percent(axis: f64) -> i32 {
    (axis.clamp(-1.0, 1.0) * 100.0).round() as i32
}

// ─────────────────────────────────────────────────────────────────────────────
// Mechanisms
// ─────────────────────────────────────────────────────────────────────────────

/// The robot's subsystems with the references commands require them by.
#[derive(Clone)]
struct Mechanisms {
    drive: Arc<Mutex<Drivetrain>>,
    drive_ref: SubsystemRef,
    intake: Arc<Mutex<Intake>>,
    intake_ref: SubsystemRef,
}

impl Mechanisms {
    fn new(hardware: &Hardware) -> Self {
        let drive = Arc::new(Mutex::new(Drivetrain::new(hardware.clone())));
        let intake = Arc::new(Mutex::new(Intake::new(hardware.clone())));
        Self {
            drive_ref: SubsystemRef::from_shared(drive.clone()),
            drive,
            intake_ref: SubsystemRef::from_shared(intake.clone()),
            intake,
        }
    }

    fn arcade_drive(&self, controls: &Controls) -> FunctionalCommand {
        let (drive, stop) = (self.drive.clone(), self.drive.clone());
        let controls = controls.clone();
        FunctionalCommand::run(move || {
            let (forward, turn) = controls.sticks();
            drive.lock().arcade(forward, turn);
        })
        .with_end(move |_| stop.lock().stop())
        .requiring(&self.drive_ref)
        .named("ArcadeDrive")
    }

    fn drive_to(&self, target: f64) -> FunctionalCommand {
        let (drive, stop, check) = (self.drive.clone(), self.drive.clone(), self.drive.clone());
        FunctionalCommand::run(move || {
            let mut drive = drive.lock();
            let error = target - drive.distance();
            drive.arcade(AUTO_SPEED * error.signum(), 0.0);
        })
        .with_end(move |_| stop.lock().stop())
        .until(move || (target - check.lock().distance()).abs() < DISTANCE_TOLERANCE)
        .requiring(&self.drive_ref)
        .named(format!("DriveTo({target:.2}m)"))
    }

    fn run_intake(&self) -> FunctionalCommand {
        let (start, stop, check) = (self.intake.clone(), self.intake.clone(), self.intake.clone());
        FunctionalCommand::new(
            move || start.lock().set_running(true),
            || {},
            move |_| stop.lock().set_running(false),
            move || check.lock().has_piece(),
        )
        .requiring(&self.intake_ref)
        .named("RunIntake")
    }

    fn eject(&self) -> FunctionalCommand {
        let intake = self.intake.clone();
        FunctionalCommand::instant(move || intake.lock().eject())
            .requiring(&self.intake_ref)
            .named("Eject")
    }

    fn hold_intake(&self) -> FunctionalCommand {
        let intake = self.intake.clone();
        FunctionalCommand::run(move || intake.lock().set_running(false))
            .requiring(&self.intake_ref)
            .named("HoldIntake")
    }

    /// Drive out while intaking, return, eject.
    fn autonomous(&self) -> Result<CommandRef, RobotError> {
        let children: Vec<Box<dyn Command>> = vec![
            Box::new(self.drive_to(PICKUP_DISTANCE)),
            Box::new(self.run_intake()),
        ];
        let pickup = ParallelCommandGroup::new(children)?;
        let routine = SequentialCommandGroup::new()
            .with(pickup)
            .with(self.drive_to(0.0))
            .with(self.eject());
        Ok(CommandRef::new(routine))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SimRobot
// ─────────────────────────────────────────────────────────────────────────────

/// The robot program.
///
/// Everything is rebuilt in `robot_init`, so a restarted driver reopens its
/// hardware with fresh handles.
pub struct SimRobot {
    controls: Controls,
    mechanisms: Option<Mechanisms>,
    autonomous: Option<CommandRef>,
}

impl SimRobot {
    /// Creates a program driven by `controls`.
    #[must_use]
    pub fn new(controls: Controls) -> Self {
        Self {
            controls,
            mechanisms: None,
            autonomous: None,
        }
    }

    /// Returns the distance the drivetrain has travelled, once initialized.
    #[must_use]
    pub fn distance(&self) -> Option<f64> {
        self.mechanisms
            .as_ref()
            .map(|mechanisms| mechanisms.drive.lock().distance())
    }

    /// Returns whether the intake holds a piece, once initialized.
    #[must_use]
    pub fn has_piece(&self) -> Option<bool> {
        self.mechanisms
            .as_ref()
            .map(|mechanisms| mechanisms.intake.lock().has_piece())
    }

    /// Returns the autonomous routine built for the current run.
    #[must_use]
    pub fn autonomous_command(&self) -> Option<&CommandRef> {
        self.autonomous.as_ref()
    }

    fn configure(&mut self, ctx: &mut RobotContext<'_>) -> Result<(), RobotError> {
        let hardware = Hardware::open(ctx.hal)?;
        let mechanisms = Mechanisms::new(&hardware);
        let scheduler = &mut *ctx.scheduler;

        scheduler.set_default_command(
            &mechanisms.drive_ref,
            CommandRef::new(mechanisms.arcade_drive(&self.controls)),
        )?;
        scheduler.set_default_command(
            &mechanisms.intake_ref,
            CommandRef::new(mechanisms.hold_intake()),
        )?;

        let run_intake = CommandRef::new(mechanisms.run_intake());
        let eject = CommandRef::new(mechanisms.eject());
        let acquired = {
            let intake = mechanisms.intake.clone();
            Trigger::new(move || intake.lock().has_piece())
        };
        let announce = CommandRef::new(
            FunctionalCommand::instant(|| tracing::info!("game piece acquired"))
                .ignoring_disable(true)
                .named("Announce"),
        );

        let buttons = scheduler.button_loop_mut();
        Controls::button(&self.controls.intake).while_true(buttons, &run_intake);
        Controls::button(&self.controls.eject).on_true(buttons, &eject);
        acquired.on_true(buttons, &announce);

        self.autonomous = Some(mechanisms.autonomous()?);
        self.mechanisms = Some(mechanisms);
        Ok(())
    }
}

impl RobotProgram for SimRobot {
    fn robot_init(&mut self, ctx: &mut RobotContext<'_>) {
        match self.configure(ctx) {
            Ok(()) => tracing::info!("robot initialized"),
            Err(error) => tracing::error!(%error, "robot initialization failed"),
        }
    }

    fn robot_periodic(&mut self, ctx: &mut RobotContext<'_>) {
        if let Some(distance) = self.distance() {
            tracing::trace!(distance, commands = ctx.scheduler.scheduled_count(), "robot state");
        }
    }

    fn mode_init(&mut self, mode: RobotState, ctx: &mut RobotContext<'_>) {
        tracing::info!(?mode, "entering mode");
        if mode == RobotState::Autonomous
            && let Some(routine) = &self.autonomous
        {
            let outcome = ctx.scheduler.schedule(routine);
            tracing::debug!(?outcome, "scheduled autonomous routine");
        }
    }

    fn mode_exit(&mut self, mode: RobotState, ctx: &mut RobotContext<'_>) {
        if mode == RobotState::Autonomous
            && let Some(routine) = &self.autonomous
        {
            ctx.scheduler.cancel(routine);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_core::robot::{TimedRobot, TimedRobotConfig};
    use rivet_hal::context::HalContext;

    fn robot(controls: &Controls) -> TimedRobot<SimRobot> {
        TimedRobot::new(
            SimRobot::new(controls.clone()),
            Arc::new(HalContext::new()),
            TimedRobotConfig::new()
                .with_realtime(false)
                .with_simulation(true),
        )
        .unwrap()
    }

    #[test]
    fn autonomous_routine_completes() {
        let controls = Controls::new();
        let mut robot = robot(&controls);
        robot.set_mode(RobotState::Autonomous);
        robot.run_cycles(150);

        let routine = robot.program().autonomous_command().unwrap().clone();
        assert!(!robot.scheduler().is_scheduled(&routine));
        assert!(robot.program().distance().unwrap().abs() < DISTANCE_TOLERANCE);
        assert_eq!(robot.program().has_piece(), Some(false));
        assert!(robot.scheduler().scheduled_names().contains(&"ArcadeDrive".to_owned()));
    }

    #[test]
    fn autonomous_is_cancelled_on_teleop() {
        let controls = Controls::new();
        let mut robot = robot(&controls);
        robot.set_mode(RobotState::Autonomous);
        robot.run_cycles(5);
        let routine = robot.program().autonomous_command().unwrap().clone();
        assert!(robot.scheduler().is_scheduled(&routine));

        robot.set_mode(RobotState::Teleop);
        robot.step();
        assert!(!robot.scheduler().is_scheduled(&routine));
    }

    #[test]
    fn teleop_drives_from_sticks() {
        let controls = Controls::new();
        let mut robot = robot(&controls);
        robot.set_mode(RobotState::Teleop);
        controls.set_sticks(1.0, 0.0);
        robot.run_cycles(20);
        assert!(robot.program().distance().unwrap() > 0.0);
    }

    #[test]
    fn intake_button_acquires_then_eject_releases() {
        let controls = Controls::new();
        let mut robot = robot(&controls);
        robot.set_mode(RobotState::Teleop);
        robot.step();

        controls.set_intake(true);
        robot.run_cycles(15);
        assert_eq!(robot.program().has_piece(), Some(true));
        controls.set_intake(false);
        robot.step();
        assert!(robot.scheduler().scheduled_names().contains(&"HoldIntake".to_owned()));

        controls.set_eject(true);
        robot.run_cycles(2);
        assert_eq!(robot.program().has_piece(), Some(false));
    }

    #[test]
    fn restart_reopens_hardware() {
        let controls = Controls::new();
        let mut robot = robot(&controls);
        robot.step();
        assert!(robot.program().distance().is_some());

        robot.restart();
        robot.set_mode(RobotState::Teleop);
        robot.step();
        robot.step();
        assert_eq!(robot.scheduler().scheduled_count(), 2);
        assert_eq!(robot.program().has_piece(), Some(false));
    }
}
