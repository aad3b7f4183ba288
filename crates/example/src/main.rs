//! Simulated robot CLI.
//!
//! Runs the autonomous routine, then a short scripted teleop period, and
//! logs what the scheduler did.
//!
//! # Usage
//!
//! ```bash
//! sim_robot [auto_cycles] [teleop_cycles] [--realtime] [--json]
//! ```
//!
//! # Example
//!
//! ```bash
//! RUST_LOG=rivet_command=debug sim_robot 150 100 --realtime
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use example::{Controls, SimRobot};
use rivet_command::scheduler::RobotState;
use rivet_core::RobotError;
use rivet_core::robot::{TimedRobot, TimedRobotConfig};
use rivet_core::sink::LoggingSink;
use rivet_core::tracing_config::{TracingConfig, TracingFormat};
use rivet_hal::context::HalContext;

const DEFAULT_AUTO_CYCLES: u64 = 150;
const DEFAULT_TELEOP_CYCLES: u64 = 100;

struct Args {
    auto_cycles: u64,
    teleop_cycles: u64,
    realtime: bool,
    json: bool,
}

fn parse_args() -> Option<Args> {
    let mut args = Args {
        auto_cycles: DEFAULT_AUTO_CYCLES,
        teleop_cycles: DEFAULT_TELEOP_CYCLES,
        realtime: false,
        json: false,
    };
    let mut counts = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--realtime" => args.realtime = true,
            "--json" => args.json = true,
            other => counts.push(other.parse::<u64>().ok()?),
        }
    }
    match counts.as_slice() {
        [] => {}
        [auto] => args.auto_cycles = *auto,
        [auto, teleop] => {
            args.auto_cycles = *auto;
            args.teleop_cycles = *teleop;
        }
        _ => return None,
    }
    Some(args)
}

fn run(args: &Args) -> Result<(), RobotError> {
    let controls = Controls::new();
    let config = TimedRobotConfig::new()
        .with_simulation(true)
        .with_realtime(args.realtime);
    let mut robot = TimedRobot::new(
        SimRobot::new(controls.clone()),
        Arc::new(HalContext::new()),
        config,
    )?;
    robot.scheduler_mut().set_sink(LoggingSink::new());

    robot.set_mode(RobotState::Autonomous);
    robot.run_cycles(args.auto_cycles);
    tracing::info!(
        distance = robot.program().distance(),
        has_piece = robot.program().has_piece(),
        "autonomous finished"
    );

    // Scripted driver: hold the intake while driving forward, then let go.
    robot.set_mode(RobotState::Teleop);
    controls.set_sticks(0.5, 0.0);
    controls.set_intake(true);
    robot.run_cycles(args.teleop_cycles / 2);
    controls.set_sticks(0.0, 0.0);
    controls.set_intake(false);
    controls.set_eject(true);
    robot.run_cycles(args.teleop_cycles - args.teleop_cycles / 2);

    robot.set_mode(RobotState::Disabled);
    robot.step();
    tracing::info!(
        cycles = robot.cycle_count(),
        distance = robot.program().distance(),
        handles = robot.hal().allocated_count(),
        "simulation finished"
    );
    Ok(())
}

fn main() -> ExitCode {
    let Some(args) = parse_args() else {
        eprintln!("Usage: sim_robot [auto_cycles] [teleop_cycles] [--realtime] [--json]");
        return ExitCode::FAILURE;
    };

    let format = if args.json {
        TracingFormat::Json
    } else {
        TracingFormat::Compact
    };
    let mut logging = TracingConfig::new().with_format(format);
    if let Ok(filter) = std::env::var("RUST_LOG") {
        logging = logging.with_env_filter(filter);
    }
    logging.init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "simulation failed");
            ExitCode::FAILURE
        }
    }
}
