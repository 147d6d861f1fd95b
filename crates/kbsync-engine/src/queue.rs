//! Deferred event queue
//!
//! Live repository events that arrive before the bootstrap pass completes
//! are wrapped into [`SyncTask`]s and parked here. The queue is the only
//! concurrency-shared mutable structure besides the bootstrap-complete flag:
//! many producers (event callbacks) append, a single bootstrap-time consumer
//! drains it exactly once.

use std::collections::VecDeque;
use std::sync::Mutex;

use kbsync_core::domain::event::NodeEvent;

use crate::handlers::HandlerRole;

/// A deferred (handler, event) pair
///
/// Plain data, no captured closures; the dispatcher resolves the role back
/// to its handler at drain time through its dispatch table.
#[derive(Debug, Clone)]
pub struct SyncTask {
    /// Which handler should process the event
    pub role: HandlerRole,
    /// The deferred event
    pub event: NodeEvent,
}

/// FIFO queue of deferred sync tasks
///
/// Unbounded capacity; append never blocks beyond the internal lock. Tasks
/// are owned by the queue until dequeued and are dropped after dispatch,
/// whether dispatch succeeded or failed.
#[derive(Debug, Default)]
pub struct EventQueue {
    tasks: Mutex<VecDeque<SyncTask>>,
}

impl EventQueue {
    /// Creates an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a task at the back of the queue
    pub fn push(&self, task: SyncTask) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.push_back(task);
    }

    /// Removes and returns the oldest task, if any
    pub fn pop(&self) -> Option<SyncTask> {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.pop_front()
    }

    /// Number of tasks currently queued
    pub fn len(&self) -> usize {
        let tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.len()
    }

    /// Returns true if no tasks are queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
