//! Unbounded FIFO mailbox between command producers and the simulation.

use shared::Command;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to a shared queue of pending intents.
///
/// Producers push and return immediately. The simulation takes the whole
/// backlog once per tick with [`CommandQueue::drain`]; anything pushed after
/// the swap waits for the next tick.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    pending: Arc<Mutex<Vec<Command>>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: Command) {
        self.lock().push(command);
    }

    /// Swaps the backlog for an empty one and returns it in arrival order.
    pub fn drain(&self) -> Vec<Command> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A producer that panicked mid-push cannot leave a half-written Vec, so
    // the data behind a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Vec<Command>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
