//! Simulated mechanisms backed by handle registries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use rivet_command::subsystem::Subsystem;
use rivet_core::RobotError;
use rivet_hal::context::HalContext;
use rivet_hal::handle::{Handle, HandleType};
use rivet_hal::indexed::IndexedHandleResource;
use rivet_hal::limited::LimitedHandleResource;

/// Encoder ticks per metre of travel.
pub const TICKS_PER_METER: f64 = 2048.0;

/// Ticks one side of the drivetrain moves per loop at full speed.
const MAX_TICKS_PER_LOOP: f64 = 80.0;

/// Loops the intake must run before a game piece breaks the beam.
const LOOPS_TO_ACQUIRE: u32 = 10;

/// DIO channel of the intake beam break.
pub const BEAM_BREAK_CHANNEL: usize = 0;

// ─────────────────────────────────────────────────────────────────────────────
// Simulated devices
// ─────────────────────────────────────────────────────────────────────────────

/// A quadrature encoder's simulated count.
#[derive(Debug, Default)]
pub struct SimEncoder {
    ticks: AtomicI64,
}

impl SimEncoder {
    /// Returns the current count.
    #[must_use]
    pub fn ticks(&self) -> i64 {
        self.ticks.load(Ordering::Relaxed)
    }

    fn add(&self, delta: i64) {
        self.ticks.fetch_add(delta, Ordering::Relaxed);
    }
}

/// A simulated digital input.
#[derive(Debug, Default)]
pub struct SimDigitalInput {
    value: AtomicBool,
}

impl SimDigitalInput {
    /// Returns the input level.
    #[must_use]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Relaxed)
    }

    fn set(&self, value: bool) {
        self.value.store(value, Ordering::Relaxed);
    }
}

/// Encoder registry.
pub type Encoders = LimitedHandleResource<SimEncoder, 8>;

/// Digital input registry, addressed by channel.
pub type DigitalInputs = IndexedHandleResource<SimDigitalInput, 26>;

/// Handles to every device the robot uses.
#[derive(Debug, Clone)]
pub struct Hardware {
    /// Encoder registry.
    pub encoders: Arc<Encoders>,
    /// Digital input registry.
    pub inputs: Arc<DigitalInputs>,
    /// Left drive encoder.
    pub left: Handle,
    /// Right drive encoder.
    pub right: Handle,
    /// Intake beam break.
    pub beam: Handle,
}

impl Hardware {
    /// Opens every device, registering the device registries in `hal` on
    /// first use.
    ///
    /// # Errors
    ///
    /// Fails if the beam-break channel is already open.
    pub fn open(hal: &HalContext) -> Result<Self, RobotError> {
        let encoders = match hal.registry::<Encoders>(HandleType::Encoder) {
            Some(existing) => existing,
            None => hal.register(Encoders::new(HandleType::Encoder))?,
        };
        let inputs = match hal.registry::<DigitalInputs>(HandleType::Dio) {
            Some(existing) => existing,
            None => hal.register(DigitalInputs::new(HandleType::Dio))?,
        };

        let left = encoders.allocate();
        let right = encoders.allocate();
        let beam = inputs.allocate(BEAM_BREAK_CHANNEL)?;
        tracing::debug!(%left, %right, %beam, "opened simulated hardware");

        Ok(Self {
            encoders,
            inputs,
            left,
            right,
            beam,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Drivetrain
// ─────────────────────────────────────────────────────────────────────────────

/// Differential drive with one encoder per side.
#[derive(Debug)]
pub struct Drivetrain {
    hardware: Hardware,
    left_speed: f64,
    right_speed: f64,
}

impl Drivetrain {
    /// Creates a stopped drivetrain.
    #[must_use]
    pub fn new(hardware: Hardware) -> Self {
        Self {
            hardware,
            left_speed: 0.0,
            right_speed: 0.0,
        }
    }

    /// Sets wheel speeds from forward and turn demands in `[-1, 1]`.
    pub fn arcade(&mut self, forward: f64, turn: f64) {
        self.left_speed = (forward + turn).clamp(-1.0, 1.0);
        self.right_speed = (forward - turn).clamp(-1.0, 1.0);
    }

    /// Stops both sides.
    pub fn stop(&mut self) {
        self.arcade(0.0, 0.0);
    }

    /// Returns the average distance travelled in metres.
    ///
    /// A side whose encoder handle went stale reads as zero.
    #[must_use]
    pub fn distance(&self) -> f64 {
        let read = |handle| {
            self.hardware
                .encoders
                .get(handle)
                .map_or(0, |encoder| encoder.ticks())
        };
        let ticks = read(self.hardware.left) + read(self.hardware.right);
        ticks as f64 / 2.0 / TICKS_PER_METER
    }
}

impl Subsystem for Drivetrain {
    fn simulation_periodic(&mut self) {
        for (handle, speed) in [
            (self.hardware.left, self.left_speed),
            (self.hardware.right, self.right_speed),
        ] {
            if let Some(encoder) = self.hardware.encoders.get(handle) {
                encoder.add((speed * MAX_TICKS_PER_LOOP).round() as i64);
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Intake
// ─────────────────────────────────────────────────────────────────────────────

/// Roller intake with a beam break that trips when a piece is held.
#[derive(Debug)]
pub struct Intake {
    hardware: Hardware,
    running: bool,
    loops_running: u32,
}

impl Intake {
    /// Creates a stopped, empty intake.
    #[must_use]
    pub fn new(hardware: Hardware) -> Self {
        Self {
            hardware,
            running: false,
            loops_running: 0,
        }
    }

    /// Starts or stops the rollers.
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
        if !running {
            self.loops_running = 0;
        }
    }

    /// Returns `true` if the beam break sees a game piece.
    #[must_use]
    pub fn has_piece(&self) -> bool {
        self.hardware
            .inputs
            .get(self.hardware.beam)
            .is_some_and(|input| input.get())
    }

    /// Ejects the held piece.
    pub fn eject(&mut self) {
        if let Some(input) = self.hardware.inputs.get(self.hardware.beam) {
            input.set(false);
        }
    }
}

impl Subsystem for Intake {
    fn simulation_periodic(&mut self) {
        if !self.running {
            return;
        }
        self.loops_running += 1;
        if self.loops_running >= LOOPS_TO_ACQUIRE
            && let Some(input) = self.hardware.inputs.get(self.hardware.beam)
        {
            input.set(true);
        }
    }
}
