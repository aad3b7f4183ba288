//! Ordered collection of bindings polled once per scheduler cycle.

use core::any::Any;
use core::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::scheduler::CommandScheduler;

type Binding = Box<dyn FnMut(&mut CommandScheduler) + Send>;

/// A list of bindings polled together.
///
/// Each binding is a closure that samples some input and, depending on what
/// it sees, schedules or cancels commands. The scheduler owns one loop for
/// button bindings and polls it during every [`run`](CommandScheduler::run);
/// other loops can be polled by hand.
///
/// # Example
///
/// ```
/// use rivet_command::event_loop::EventLoop;
/// use rivet_command::scheduler::CommandScheduler;
///
/// let mut scheduler = CommandScheduler::new();
/// let mut bindings = EventLoop::new();
/// bindings.bind(|scheduler| {
///     if scheduler.is_enabled() {
///         // schedule something
///     }
/// });
///
/// bindings.poll(&mut scheduler);
/// assert_eq!(bindings.len(), 1);
/// ```
#[derive(Default)]
pub struct EventLoop {
    bindings: Vec<Binding>,
}

impl EventLoop {
    /// Creates an empty loop.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Adds a binding, polled after every binding added before it.
    pub fn bind(&mut self, binding: impl FnMut(&mut CommandScheduler) + Send + 'static) {
        self.bindings.push(Box::new(binding));
    }

    /// Polls every binding in insertion order.
    ///
    /// A binding that panics does not stop the ones after it. The panic
    /// payloads are returned in polling order.
    pub fn poll(&mut self, scheduler: &mut CommandScheduler) -> Vec<Box<dyn Any + Send>> {
        let mut panics = Vec::new();
        for binding in &mut self.bindings {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| binding(scheduler))) {
                panics.push(payload);
            }
        }
        panics
    }

    /// Removes every binding.
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    /// Moves every binding of `other` to the end of this loop.
    pub fn append(&mut self, other: &mut EventLoop) {
        self.bindings.append(&mut other.bindings);
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if the loop has no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("bindings", &self.bindings.len())
            .finish()
    }
}
