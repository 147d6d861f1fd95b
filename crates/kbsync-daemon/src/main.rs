//! kbsync daemon - background AI index synchronization service
//!
//! This binary wires the HTTP adapters to the sync engine and handles:
//! - Folder scope initialization with per-role watchdogs
//! - Startup bulk catch-up (folder skeleton, content pass, tagging pass)
//! - Deferred event drain once bootstrap completes
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon resolves both folder scopes, runs the bulk sync coordinator,
//! then idles under a `CancellationToken` that is triggered on receipt of
//! SIGTERM or SIGINT. A watchdog that never resolves its scope sends a
//! fatal signal instead; the daemon then exits non-zero so the process
//! supervisor restarts it.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use kbsync_core::config::Config;
use kbsync_core::domain::newtypes::{AspectName, FolderPath};
use kbsync_core::ports::{ai_service::IAiService, repository::IRepositoryClient};
use kbsync_engine::bootstrap::BulkSyncCoordinator;
use kbsync_engine::dispatcher::EventDispatcher;
use kbsync_engine::handlers::{
    ContentSyncHandler, EventHandler, HandlerRole, SyncFolderScopeHandler, TagContentHandler,
    TagFolderScopeHandler,
};
use kbsync_engine::ops::SyncOps;
use kbsync_engine::queue::EventQueue;
use kbsync_engine::registry::FolderScopeRegistry;
use kbsync_engine::watchdog::InitializationWatchdog;
use kbsync_repo::{AiServiceClient, RepositoryClient};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Main daemon service that orchestrates scope resolution and bootstrap
///
/// Holds the configuration and a cancellation token for graceful shutdown.
struct DaemonService {
    /// Application configuration loaded from YAML
    config: Config,
    /// Token for signalling graceful shutdown to all async tasks
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Creates a new DaemonService from the default configuration path
    ///
    /// A missing or unreadable configuration file falls back to defaults;
    /// an invalid configuration is a startup error.
    fn new(shutdown: CancellationToken) -> Result<Self> {
        let config_path = Config::default_path();
        let config = Config::load_or_default(&config_path);
        info!(config_path = %config_path.display(), "Loaded configuration");

        let problems = config.validate();
        if !problems.is_empty() {
            for problem in &problems {
                error!(field = %problem.field, "{}", problem.message);
            }
            anyhow::bail!("configuration is invalid ({} problems)", problems.len());
        }

        Ok(Self { config, shutdown })
    }

    /// Runs the daemon
    ///
    /// 1. Builds the repository and AI adapters
    /// 2. Wires registries, handlers, dispatcher, and sync operations
    /// 3. Resolves both folder scopes (watchdogs retry empty scopes)
    /// 4. Runs the bulk sync coordinator, then idles until shutdown
    async fn run(&self) -> Result<()> {
        let repository: Arc<dyn IRepositoryClient> =
            Arc::new(RepositoryClient::new(&self.config)?);
        let ai: Arc<dyn IAiService> = Arc::new(AiServiceClient::new(&self.config)?);

        let content_registry = Arc::new(FolderScopeRegistry::new(HandlerRole::SyncFolderScope));
        let tag_registry = Arc::new(FolderScopeRegistry::new(HandlerRole::TagFolderScope));

        let retry_folder = FolderPath::rooted_at(
            &self.config.folders.pipeline_retry,
            &self.config.repository.root_name,
        )?;
        let ops = Arc::new(SyncOps::new(
            Arc::clone(&repository),
            Arc::clone(&ai),
            Arc::clone(&content_registry),
            retry_folder,
            &self.config,
        ));

        let sync_aspect = AspectName::new(&self.config.sync.aspect)?;
        let pipeline_aspect = AspectName::new(&self.config.tagging.pipeline_aspect)?;

        let handlers: Vec<Arc<dyn EventHandler>> = vec![
            Arc::new(ContentSyncHandler::new(
                Arc::clone(&content_registry),
                Arc::clone(&ops),
            )),
            Arc::new(SyncFolderScopeHandler::new(
                Arc::clone(&content_registry),
                Arc::clone(&ai),
                sync_aspect.clone(),
            )),
            Arc::new(TagContentHandler::new(
                Arc::clone(&tag_registry),
                Arc::clone(&ops),
            )),
            Arc::new(TagFolderScopeHandler::new(
                Arc::clone(&tag_registry),
                pipeline_aspect.clone(),
            )),
        ];
        let queue = Arc::new(EventQueue::new());
        let dispatcher = Arc::new(EventDispatcher::new(handlers, queue));

        // Scope resolution. Empty scopes are retried in the background; the
        // fatal channel fires when a retry deadline expires.
        let (fatal_tx, mut fatal_rx) = mpsc::channel::<HandlerRole>(2);
        let poll = Duration::from_secs(self.config.sync.retry_poll_secs);
        let deadline = Duration::from_secs(self.config.sync.restart_deadline_secs);

        let mut retry_workers: Vec<JoinHandle<()>> = Vec::new();
        for (role, aspect, registry) in [
            (HandlerRole::SyncFolderScope, &sync_aspect, &content_registry),
            (HandlerRole::TagFolderScope, &pipeline_aspect, &tag_registry),
        ] {
            let watchdog = InitializationWatchdog::new(
                role,
                aspect.clone(),
                Arc::clone(&repository),
                Arc::clone(registry),
                poll,
                deadline,
            );
            if let Some(worker) = watchdog
                .resolve(self.shutdown.clone(), fatal_tx.clone())
                .await?
            {
                retry_workers.push(worker);
            }
        }

        let coordinator = BulkSyncCoordinator::new(
            Arc::clone(&repository),
            ops,
            Arc::clone(&dispatcher),
            Arc::clone(&content_registry),
            Arc::clone(&tag_registry),
            &self.config,
        )?;

        info!("Starting bulk synchronization");
        tokio::select! {
            result = coordinator.run(&self.shutdown) => result?,
            Some(role) = fatal_rx.recv() => {
                self.shutdown.cancel();
                anyhow::bail!("{role} scope never initialized, restart required");
            }
        }

        if !self.shutdown.is_cancelled() {
            info!(
                bootstrap_complete = dispatcher.is_bootstrap_complete(),
                "Bulk synchronization finished, entering event loop"
            );
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received");
                }
                Some(role) = fatal_rx.recv() => {
                    self.shutdown.cancel();
                    anyhow::bail!("{role} scope never initialized, restart required");
                }
            }
        }

        self.drain_workers(retry_workers).await;
        Ok(())
    }

    /// Gives background workers a bounded window to observe cancellation
    async fn drain_workers(&self, workers: Vec<JoinHandle<()>>) {
        if workers.is_empty() {
            return;
        }
        let grace = Duration::from_secs(self.config.sync.shutdown_grace_secs);
        let joined = tokio::time::timeout(grace, async {
            for worker in workers {
                if let Err(err) = worker.await {
                    error!(error = %err, "Background worker ended abnormally");
                }
            }
        })
        .await;
        if joined.is_err() {
            warn!(
                grace_secs = grace.as_secs(),
                "Background workers did not stop within the shutdown grace period"
            );
        }
    }
}

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins over the configured level when set
    let configured_level = Config::load_or_default(&Config::default_path()).logging.level;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(configured_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!("kbsync daemon starting (kbsyncd)");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(shutdown_token.clone())?;

    let result = service.run().await;

    match &result {
        Ok(()) => info!("kbsync daemon shut down gracefully"),
        Err(e) => error!(error = %e, "kbsync daemon exiting with error"),
    }

    result
}
