//! Long-lived robot mechanisms that commands claim exclusively.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

static NEXT_SUBSYSTEM_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a registered subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubsystemId(u64);

impl SubsystemId {
    fn next() -> Self {
        Self(NEXT_SUBSYSTEM_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subsystem#{}", self.0)
    }
}

/// A mechanism with periodic housekeeping, such as a drivetrain or an arm.
///
/// The scheduler calls [`periodic`](Self::periodic) once per cycle for every
/// registered subsystem, whether or not a command requires it.
pub trait Subsystem: Send + 'static {
    /// Called once per scheduler cycle.
    fn periodic(&mut self) {}

    /// Called once per scheduler cycle after [`periodic`](Self::periodic)
    /// when the scheduler runs in simulation.
    fn simulation_periodic(&mut self) {}

    /// Human-readable name used in logs and telemetry.
    fn name(&self) -> &str {
        short_type_name(core::any::type_name::<Self>())
    }
}

/// Shared, identity-carrying reference to a subsystem.
///
/// Clones refer to the same subsystem. Commands keep a clone to reach the
/// mechanism from their callbacks and name it in their requirements.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use rivet_command::subsystem::{Subsystem, SubsystemRef};
///
/// #[derive(Default)]
/// struct Intake { running: bool }
///
/// impl Subsystem for Intake {}
///
/// let intake = Arc::new(Mutex::new(Intake::default()));
/// let intake_ref = SubsystemRef::from_shared(intake.clone());
///
/// intake.lock().running = true;
/// assert_eq!(intake_ref.name(), "Intake");
/// ```
#[derive(Clone)]
pub struct SubsystemRef {
    id: SubsystemId,
    inner: Arc<Mutex<dyn Subsystem>>,
}

impl SubsystemRef {
    /// Wraps a subsystem the caller does not need typed access to.
    #[must_use]
    pub fn new<S: Subsystem>(subsystem: S) -> Self {
        Self::from_shared(Arc::new(Mutex::new(subsystem)))
    }

    /// Wraps a subsystem the caller keeps a typed handle to.
    #[must_use]
    pub fn from_shared<S: Subsystem>(shared: Arc<Mutex<S>>) -> Self {
        Self {
            id: SubsystemId::next(),
            inner: shared,
        }
    }

    /// Returns this subsystem's identity.
    #[must_use]
    pub fn id(&self) -> SubsystemId {
        self.id
    }

    /// Returns the subsystem's name.
    #[must_use]
    pub fn name(&self) -> String {
        self.inner.lock().name().to_owned()
    }

    /// Locks the subsystem for direct access.
    pub fn lock(&self) -> MutexGuard<'_, dyn Subsystem> {
        self.inner.lock()
    }
}

impl PartialEq for SubsystemRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubsystemRef {}

impl fmt::Debug for SubsystemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("SubsystemRef");
        debug.field("id", &self.id);
        // Printing from inside the subsystem's own callbacks must not deadlock.
        match self.inner.try_lock() {
            Some(subsystem) => debug.field("name", &subsystem.name()),
            None => debug.field("name", &"<locked>"),
        };
        debug.finish()
    }
}

/// Strips the module path from a type name, keeping generic arguments.
pub(crate) fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    let start = base.rfind("::").map_or(0, |at| at + 2);
    &full[start..]
}
