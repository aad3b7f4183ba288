//! Thread-safe queue of deferred schedule and cancel requests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::command::CommandRef;

/// A deferred scheduler operation.
#[derive(Debug, Clone)]
pub enum Request {
    /// Schedule the command.
    Schedule(CommandRef),
    /// Cancel the command.
    Cancel(CommandRef),
    /// Cancel every scheduled command.
    CancelAll,
}

/// Cloneable sender of requests the scheduler applies on its own thread.
///
/// The scheduler is driven from a single thread and takes `&mut self` for
/// every state change. Other threads (vision pipelines, network handlers)
/// push requests here instead; [`run`](crate::scheduler::CommandScheduler::run)
/// applies them in arrival order right after stepping the running commands.
///
/// # Example
///
/// ```
/// use rivet_command::scheduler::CommandScheduler;
///
/// let scheduler = CommandScheduler::new();
/// let requests = scheduler.requests();
///
/// std::thread::spawn(move || requests.cancel_all())
///     .join()
///     .unwrap();
/// assert_eq!(scheduler.requests().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    queue: Arc<Mutex<VecDeque<Request>>>,
}

impl RequestQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that `command` be scheduled.
    pub fn schedule(&self, command: &CommandRef) {
        self.push(Request::Schedule(command.clone()));
    }

    /// Requests that `command` be canceled.
    pub fn cancel(&self, command: &CommandRef) {
        self.push(Request::Cancel(command.clone()));
    }

    /// Requests that every command be canceled.
    pub fn cancel_all(&self) {
        self.push(Request::CancelAll);
    }

    /// Appends a request.
    pub fn push(&self, request: Request) {
        self.queue.lock().push_back(request);
    }

    /// Removes and returns every pending request.
    pub(crate) fn drain(&self) -> Vec<Request> {
        self.queue.lock().drain(..).collect()
    }

    /// Discards every pending request and returns how many there were.
    pub fn clear(&self) -> usize {
        let mut queue = self.queue.lock();
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    /// Returns the number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns `true` if no requests are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
