//! Initialization watchdog
//!
//! Each handler role resolves its initial folder scope at startup by
//! querying the repository for folders carrying its tracked aspect. The
//! watchdog drives that resolution through a small state machine:
//!
//! ```text
//! UNINITIALIZED → INITIALIZING → READY
//!                       │
//!                       └→ RETRYING → READY | FATAL
//!                              │
//!                              └→ ABANDONED (shutdown)
//! ```
//!
//! An *empty* scope is retried on a fixed interval until a deadline, after
//! which the watchdog emits a fatal signal so the supervisor can restart the
//! process. A *hard* repository error is a misconfiguration and is raised
//! immediately, never retried. The retry worker is a cancellable tokio task;
//! cancellation moves it to the terminal `Abandoned` state.

use std::sync::Arc;
use std::time::Duration;

use kbsync_core::domain::newtypes::AspectName;
use kbsync_core::ports::repository::IRepositoryClient;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::handlers::HandlerRole;
use crate::registry::FolderScopeRegistry;
use crate::SyncError;

/// States of the initialization watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// No resolution attempted yet
    Uninitialized,
    /// First resolution attempt in flight
    Initializing,
    /// Scope resolved non-empty; registry is seeded
    Ready,
    /// First attempt found an empty scope; background retries running
    Retrying,
    /// Deadline exceeded or hard error during retry; restart required
    Fatal,
    /// Retry worker cancelled during shutdown (terminal)
    Abandoned,
}

/// Per-handler initialization state machine
///
/// One instance per handler role; the two roles use different tracked
/// aspects and share nothing.
pub struct InitializationWatchdog {
    role: HandlerRole,
    aspect: AspectName,
    repository: Arc<dyn IRepositoryClient>,
    registry: Arc<FolderScopeRegistry>,
    poll_interval: Duration,
    deadline: Duration,
    state_tx: watch::Sender<WatchdogState>,
    state_rx: watch::Receiver<WatchdogState>,
}

impl InitializationWatchdog {
    /// Creates a watchdog in the `Uninitialized` state
    pub fn new(
        role: HandlerRole,
        aspect: AspectName,
        repository: Arc<dyn IRepositoryClient>,
        registry: Arc<FolderScopeRegistry>,
        poll_interval: Duration,
        deadline: Duration,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(WatchdogState::Uninitialized);
        Self {
            role,
            aspect,
            repository,
            registry,
            poll_interval,
            deadline,
            state_tx,
            state_rx,
        }
    }

    /// Current state
    pub fn state(&self) -> WatchdogState {
        *self.state_rx.borrow()
    }

    /// Returns a receiver that observes state transitions
    pub fn subscribe(&self) -> watch::Receiver<WatchdogState> {
        self.state_rx.clone()
    }

    /// Attempts the initial scope resolution
    ///
    /// Non-empty result seeds the registry and moves to `Ready`. An empty
    /// result spawns exactly one background retry worker and returns its
    /// join handle. A hard repository error is returned immediately as
    /// [`SyncError::InitializationFailed`] with the state set to `Fatal`.
    ///
    /// # Arguments
    /// * `cancel` - Shutdown token; cancelling abandons the retry worker
    /// * `fatal_tx` - Channel the worker signals when the deadline expires
    pub async fn resolve(
        &self,
        cancel: CancellationToken,
        fatal_tx: mpsc::Sender<HandlerRole>,
    ) -> Result<Option<JoinHandle<()>>, SyncError> {
        self.state_tx.send_replace(WatchdogState::Initializing);
        info!(role = %self.role, aspect = %self.aspect, "Resolving folder scope");

        match self.repository.find_folders_with_aspect(&self.aspect).await {
            Err(source) => {
                self.state_tx.send_replace(WatchdogState::Fatal);
                error!(role = %self.role, error = %source, "Hard error resolving folder scope");
                Err(SyncError::InitializationFailed {
                    role: self.role,
                    source,
                })
            }
            Ok(folders) if !folders.is_empty() => {
                self.registry
                    .initialize(folders.into_iter().map(|f| f.id));
                self.state_tx.send_replace(WatchdogState::Ready);
                Ok(None)
            }
            Ok(_) => {
                warn!(
                    role = %self.role,
                    poll_secs = self.poll_interval.as_secs(),
                    "Folder scope empty, starting retry worker"
                );
                self.state_tx.send_replace(WatchdogState::Retrying);
                Ok(Some(self.spawn_retry_worker(cancel, fatal_tx)))
            }
        }
    }

    fn spawn_retry_worker(
        &self,
        cancel: CancellationToken,
        fatal_tx: mpsc::Sender<HandlerRole>,
    ) -> JoinHandle<()> {
        let role = self.role;
        let aspect = self.aspect.clone();
        let repository = self.repository.clone();
        let registry = self.registry.clone();
        let poll_interval = self.poll_interval;
        let deadline = self.deadline;
        let state_tx = self.state_tx.clone();

        tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!(role = %role, "Scope retry worker abandoned");
                        state_tx.send_replace(WatchdogState::Abandoned);
                        return;
                    }
                    _ = tokio::time::sleep(poll_interval) => {}
                }

                if started.elapsed() >= deadline {
                    error!(
                        role = %role,
                        deadline_secs = deadline.as_secs(),
                        "Folder scope never resolved, requesting restart"
                    );
                    state_tx.send_replace(WatchdogState::Fatal);
                    let _ = fatal_tx.send(role).await;
                    return;
                }

                match repository.find_folders_with_aspect(&aspect).await {
                    Err(error) => {
                        error!(role = %role, error = %error, "Hard error during scope retry");
                        state_tx.send_replace(WatchdogState::Fatal);
                        let _ = fatal_tx.send(role).await;
                        return;
                    }
                    Ok(folders) if !folders.is_empty() => {
                        registry.initialize(folders.into_iter().map(|f| f.id));
                        state_tx.send_replace(WatchdogState::Ready);
                        return;
                    }
                    Ok(_) => {
                        warn!(role = %role, "Folder scope still empty");
                    }
                }
            }
        })
    }
}
