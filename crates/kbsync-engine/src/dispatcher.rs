//! Event routing and bootstrap gating
//!
//! The dispatcher owns the role → handler table and the bootstrap-complete
//! flag. Until the flag flips, every valid delivered event is parked on the
//! [`EventQueue`]; afterwards events run synchronously through their
//! handler. The queued backlog is drained exactly once by the bootstrap
//! coordinator through a bounded worker pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kbsync_core::domain::event::NodeEvent;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::handlers::{EventHandler, HandlerRole};
use crate::queue::{EventQueue, SyncTask};
use crate::SyncError;

pub struct EventDispatcher {
    handlers: HashMap<HandlerRole, Arc<dyn EventHandler>>,
    queue: Arc<EventQueue>,
    bootstrap_complete: AtomicBool,
}

impl EventDispatcher {
    pub fn new(handlers: Vec<Arc<dyn EventHandler>>, queue: Arc<EventQueue>) -> Self {
        let handlers = handlers
            .into_iter()
            .map(|handler| (handler.role(), handler))
            .collect();
        Self {
            handlers,
            queue,
            bootstrap_complete: AtomicBool::new(false),
        }
    }

    /// Delivers one live repository event to a handler role
    ///
    /// Malformed events (wrong resource type for the role) error out and are
    /// never queued. Valid events arriving before bootstrap completion are
    /// deferred unfiltered; the filter runs at drain time against the scope
    /// state of that moment. On the synchronous path a handler failure is
    /// logged and dropped, never propagated back to the event source.
    pub async fn handle_event(&self, role: HandlerRole, event: NodeEvent) -> Result<(), SyncError> {
        let handler = self
            .handlers
            .get(&role)
            .ok_or(SyncError::UnknownHandler { role })?;
        handler.validate(&event)?;

        if !self.bootstrap_complete.load(Ordering::Acquire) {
            debug!(role = %role, node_id = %event.node_id, "Bootstrap incomplete, deferring event");
            self.queue.push(SyncTask { role, event });
            return Ok(());
        }

        if !handler.accepts(&event)? {
            debug!(role = %role, node_id = %event.node_id, "Event filtered out");
            return Ok(());
        }
        if let Err(err) = handler.handle(&event).await {
            error!(
                role = %role,
                node_id = %event.node_id,
                kind = %event.kind,
                error = %err,
                "Event handling failed"
            );
        }
        Ok(())
    }

    /// Marks bootstrap as complete; later events dispatch synchronously
    pub fn mark_bootstrap_complete(&self) {
        self.bootstrap_complete.store(true, Ordering::Release);
    }

    pub fn is_bootstrap_complete(&self) -> bool {
        self.bootstrap_complete.load(Ordering::Acquire)
    }

    /// Drains the deferred queue through a pool of `pool_size` workers
    ///
    /// Tasks leave the queue in FIFO order; a worker permit is acquired
    /// before each dequeue so at most `pool_size` tasks run at once. Every
    /// task failure is logged and the drain continues; the queue is empty
    /// when this returns.
    pub async fn drain(&self, pool_size: usize) {
        let total = self.queue.len();
        info!(queued = total, workers = pool_size, "Draining deferred event queue");

        let semaphore = Arc::new(Semaphore::new(pool_size.max(1)));
        let mut workers = JoinSet::new();
        loop {
            // Acquire before popping so dequeue order matches start order
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let Some(task) = self.queue.pop() else {
                break;
            };
            let Some(handler) = self.handlers.get(&task.role).cloned() else {
                error!(role = %task.role, "Deferred task for unknown role dropped");
                continue;
            };
            workers.spawn(async move {
                let _permit = permit;
                dispatch_deferred(handler, task).await;
            });
        }
        while let Some(result) = workers.join_next().await {
            if let Err(err) = result {
                error!(error = %err, "Drain worker task failed");
            }
        }
        info!(drained = total, "Deferred event queue drained");
    }
}

async fn dispatch_deferred(handler: Arc<dyn EventHandler>, task: SyncTask) {
    match handler.accepts(&task.event) {
        Ok(true) => {
            if let Err(err) = handler.handle(&task.event).await {
                error!(
                    role = %task.role,
                    node_id = %task.event.node_id,
                    kind = %task.event.kind,
                    error = %err,
                    "Deferred event handling failed"
                );
            }
        }
        Ok(false) => {
            debug!(
                role = %task.role,
                node_id = %task.event.node_id,
                "Deferred event filtered out at drain time"
            );
        }
        Err(err) => {
            error!(
                role = %task.role,
                node_id = %task.event.node_id,
                error = %err,
                "Deferred event rejected by filter"
            );
        }
    }
}
