//! Deferred task queue
//!
//! Transport callbacks arrive on arbitrary threads but the host world may
//! only be touched from its own tick. Callbacks enqueue closures here; the
//! controller drains them at the start of each tick.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use crate::sync::SyncController;

/// A deferred unit of work run on the controller's tick
pub type Task = Box<dyn FnOnce(&mut SyncController) + Send + 'static>;

/// Bounded MPSC queue of deferred tasks
pub struct TaskQueue {
    sender: Sender<Task>,
    receiver: Receiver<Task>,
    capacity: usize,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    pub fn sender(&self) -> TaskSender {
        TaskSender {
            sender: self.sender.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Take up to one capacity's worth of queued tasks. Tasks enqueued while
    /// the batch runs wait for the next tick.
    pub fn collect(&self) -> Vec<Task> {
        let mut out = Vec::new();
        for _ in 0..self.capacity {
            match self.receiver.try_recv() {
                Ok(task) => out.push(task),
                Err(_) => break,
            }
        }
        out
    }
}

/// Cloneable producer half of the queue
#[derive(Clone)]
pub struct TaskSender {
    sender: Sender<Task>,
}

impl TaskSender {
    /// Enqueue a task. Drops the task with a warning when the queue is full
    /// or the controller is gone.
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce(&mut SyncController) + Send + 'static,
    {
        match self.sender.try_send(Box::new(task)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("task queue full, dropping task");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("task queue disconnected, dropping task");
            }
        }
    }
}
