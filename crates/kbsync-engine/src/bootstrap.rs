//! Startup catch-up coordinator
//!
//! Runs once at daemon start, before any live event is applied:
//!
//! 1. Ensure the folder skeleton exists (knowledge base root, pipeline root
//!    with Start/Retry, category folders) and install the aspect rules.
//! 2. Re-publish every stale content-scope folder, paging its documents and
//!    uploading with bounded parallelism.
//! 3. Force leftover pipeline documents back through tagging by moving them
//!    into the Retry folder.
//! 4. Flip the dispatcher's bootstrap-complete flag and drain the deferred
//!    event queue.
//!
//! Per-folder and per-document failures are logged and skipped; only
//! skeleton failures abort the bootstrap.

use std::sync::Arc;
use std::time::Duration;

use kbsync_core::config::Config;
use kbsync_core::domain::folder_record::FolderSyncRecord;
use kbsync_core::domain::newtypes::{AspectName, FolderPath, NodeId};
use kbsync_core::ports::repository::{DocumentSummary, IRepositoryClient};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatcher::EventDispatcher;
use crate::ops::SyncOps;
use crate::registry::FolderScopeRegistry;
use crate::SyncError;

/// Category folders created under the knowledge base root when the
/// configuration enables defaults and names none of its own
const DEFAULT_CATEGORIES: &[&str] = &[
    "Notatka",
    "Dokumentacja",
    "Umowa",
    "Aneks",
    "Wniosek",
    "Oferta",
    "Zamówienie",
    "Raport",
    "Regulamin",
];

pub struct BulkSyncCoordinator {
    repository: Arc<dyn IRepositoryClient>,
    ops: Arc<SyncOps>,
    dispatcher: Arc<EventDispatcher>,
    content_registry: Arc<FolderScopeRegistry>,
    tag_registry: Arc<FolderScopeRegistry>,
    sync_aspect: AspectName,
    pipeline_aspect: AspectName,
    knowledge_base: FolderPath,
    pipeline: FolderPath,
    pipeline_start: FolderPath,
    pipeline_retry: FolderPath,
    categories: Vec<FolderPath>,
    batch_size: u32,
    upload_workers: usize,
    drain_workers: usize,
    index_wait_timeout: Duration,
    index_poll: Duration,
}

impl BulkSyncCoordinator {
    pub fn new(
        repository: Arc<dyn IRepositoryClient>,
        ops: Arc<SyncOps>,
        dispatcher: Arc<EventDispatcher>,
        content_registry: Arc<FolderScopeRegistry>,
        tag_registry: Arc<FolderScopeRegistry>,
        config: &Config,
    ) -> Result<Self, SyncError> {
        let root = &config.repository.root_name;
        let knowledge_base = FolderPath::rooted_at(&config.folders.knowledge_base, root)?;

        let categories = if !config.folders.categories.is_empty() {
            config
                .folders
                .categories
                .iter()
                .map(|path| FolderPath::rooted_at(path, root))
                .collect::<Result<Vec<_>, _>>()?
        } else if config.folders.create_default_categories {
            DEFAULT_CATEGORIES
                .iter()
                .map(|name| knowledge_base.child(name))
                .collect()
        } else {
            warn!("No category folders configured and defaults disabled");
            Vec::new()
        };

        Ok(Self {
            repository,
            ops,
            dispatcher,
            content_registry,
            tag_registry,
            sync_aspect: AspectName::new(&config.sync.aspect)?,
            pipeline_aspect: AspectName::new(&config.tagging.pipeline_aspect)?,
            knowledge_base,
            pipeline: FolderPath::rooted_at(&config.folders.pipeline, root)?,
            pipeline_start: FolderPath::rooted_at(&config.folders.pipeline_start, root)?,
            pipeline_retry: FolderPath::rooted_at(&config.folders.pipeline_retry, root)?,
            categories,
            batch_size: config.sync.batch_size,
            upload_workers: config.sync.upload_workers,
            drain_workers: config.sync.drain_workers,
            index_wait_timeout: Duration::from_secs(config.sync.index_wait_timeout_secs),
            index_poll: Duration::from_secs(config.sync.index_poll_secs),
        })
    }

    /// Runs the full bootstrap sequence
    ///
    /// Returns early without error when `cancel` fires mid-flight; live
    /// dispatch stays gated in that case.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        self.ensure_skeleton(cancel).await?;
        if cancel.is_cancelled() {
            info!("Bootstrap cancelled after skeleton phase");
            return Ok(());
        }
        self.content_pass().await?;
        self.tagging_pass().await?;

        self.dispatcher.mark_bootstrap_complete();
        info!("Bootstrap complete, dispatching live events");
        self.dispatcher.drain(self.drain_workers).await;
        Ok(())
    }

    /// Creates the fixed folder skeleton and installs the aspect rules
    ///
    /// Every folder is created only if missing and then polled until it
    /// becomes visible to repository searches. Rule installation is
    /// idempotent on the repository side and re-applied on every start.
    pub async fn ensure_skeleton(&self, cancel: &CancellationToken) -> Result<(), SyncError> {
        let Some(kb_root) = self.ensure_folder(&self.knowledge_base, cancel).await? else {
            return Ok(());
        };
        self.repository
            .install_ingestion_rule(&kb_root, &self.sync_aspect)
            .await
            .map_err(SyncError::Repository)?;

        let Some(pipeline_root) = self.ensure_folder(&self.pipeline, cancel).await? else {
            return Ok(());
        };
        self.repository
            .install_ingestion_rule(&pipeline_root, &self.pipeline_aspect)
            .await
            .map_err(SyncError::Repository)?;

        for path in [&self.pipeline_start, &self.pipeline_retry] {
            if self.ensure_folder(path, cancel).await?.is_none() {
                return Ok(());
            }
        }
        for path in &self.categories {
            if self.ensure_folder(path, cancel).await?.is_none() {
                return Ok(());
            }
        }
        info!("Folder skeleton ready");
        Ok(())
    }

    /// Finds or creates one folder and waits for search visibility
    ///
    /// # Returns
    /// `Ok(None)` when cancelled while waiting.
    async fn ensure_folder(
        &self,
        path: &FolderPath,
        cancel: &CancellationToken,
    ) -> Result<Option<NodeId>, SyncError> {
        let folder_id = match self
            .repository
            .resolve_path(path)
            .await
            .map_err(SyncError::Repository)?
        {
            Some(id) => id,
            None => {
                info!(path = %path, "Creating missing skeleton folder");
                self.repository
                    .create_folder_path(path)
                    .await
                    .map_err(SyncError::Repository)?
            }
        };

        let started = tokio::time::Instant::now();
        loop {
            if self
                .repository
                .is_indexed(&folder_id)
                .await
                .map_err(SyncError::Repository)?
            {
                return Ok(Some(folder_id));
            }
            if started.elapsed() >= self.index_wait_timeout {
                return Err(SyncError::IndexingTimeout {
                    path: path.to_string(),
                    timeout_secs: self.index_wait_timeout.as_secs(),
                });
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(self.index_poll) => {}
            }
        }
    }

    /// Re-publishes every stale content-scope folder
    ///
    /// Skipped entirely (with a warning) while the content scope is still
    /// unresolved; the watchdog keeps retrying in the background and live
    /// events stay queued meanwhile.
    pub async fn content_pass(&self) -> Result<(), SyncError> {
        let folders = match self.content_registry.snapshot() {
            Ok(folders) => folders,
            Err(err) => {
                warn!(error = %err, "Content scope unresolved, skipping bulk content pass");
                return Ok(());
            }
        };
        info!(folders = folders.len(), "Starting bulk content pass");
        for folder_id in folders {
            if let Err(err) = self.sync_folder(&folder_id).await {
                error!(folder_id = %folder_id, error = %err, "Bulk sync failed for folder");
            }
        }
        Ok(())
    }

    async fn sync_folder(&self, folder_id: &NodeId) -> Result<(), SyncError> {
        let node = self
            .repository
            .get_node(folder_id)
            .await
            .map_err(SyncError::Repository)?;
        let (published_at, updated_at) = self.ops.folder_timestamps(&node.properties);
        let Some(latest) = self
            .repository
            .latest_modification(folder_id)
            .await
            .map_err(SyncError::Repository)?
        else {
            debug!(folder_id = %folder_id, "Folder has no documents");
            return Ok(());
        };

        let record = FolderSyncRecord {
            folder_id: folder_id.clone(),
            published_at,
            updated_at,
            latest_doc_modified_at: latest,
        };
        if !record.is_due() {
            debug!(folder_id = %folder_id, name = %node.name, "Folder up to date");
            return Ok(());
        }

        info!(folder_id = %folder_id, name = %node.name, "Re-publishing stale folder");
        let semaphore = Arc::new(Semaphore::new(self.upload_workers.max(1)));
        let mut uploads = JoinSet::new();
        let mut skip = 0u32;
        loop {
            let page = self
                .repository
                .list_documents(folder_id, skip, self.batch_size)
                .await
                .map_err(SyncError::Repository)?;
            skip += page.items.len() as u32;
            for doc in page.items {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };
                let ops = self.ops.clone();
                uploads.spawn(async move {
                    let _permit = permit;
                    if let Err(err) = ops.process_document(&doc.id, &doc.name).await {
                        error!(node_id = %doc.id, name = %doc.name, error = %err, "Bulk upload failed");
                    }
                });
            }
            if !page.has_more {
                break;
            }
        }
        while let Some(result) = uploads.join_next().await {
            if let Err(err) = result {
                error!(folder_id = %folder_id, error = %err, "Upload task failed");
            }
        }

        self.ops
            .stamp_folder(folder_id, record.never_published())
            .await
    }

    /// Moves documents left in the tagging scope into the Retry folder
    ///
    /// Restart recovery: documents that were mid-pipeline when the previous
    /// run stopped reprocess once live events flow again.
    pub async fn tagging_pass(&self) -> Result<(), SyncError> {
        let folders = match self.tag_registry.snapshot() {
            Ok(folders) => folders,
            Err(err) => {
                warn!(error = %err, "Tagging scope unresolved, skipping retry pass");
                return Ok(());
            }
        };
        for folder_id in folders {
            let documents = match self.collect_documents(&folder_id).await {
                Ok(documents) => documents,
                Err(err) => {
                    error!(folder_id = %folder_id, error = %err, "Failed to list pipeline folder");
                    continue;
                }
            };
            if documents.is_empty() {
                continue;
            }
            info!(
                folder_id = %folder_id,
                documents = documents.len(),
                "Moving leftover pipeline documents to retry"
            );
            for doc in documents {
                if let Err(err) = self.ops.move_to_retry(&doc.id, &doc.name).await {
                    error!(node_id = %doc.id, error = %err, "Failed to move document to retry");
                }
            }
        }
        Ok(())
    }

    /// Collects the full document listing before any moves shift pagination
    async fn collect_documents(
        &self,
        folder_id: &NodeId,
    ) -> Result<Vec<DocumentSummary>, SyncError> {
        let mut documents = Vec::new();
        let mut skip = 0u32;
        loop {
            let page = self
                .repository
                .list_documents(folder_id, skip, self.batch_size)
                .await
                .map_err(SyncError::Repository)?;
            skip += page.items.len() as u32;
            documents.extend(page.items);
            if !page.has_more {
                break;
            }
        }
        Ok(documents)
    }
}
