//! Shared sync operations
//!
//! [`SyncOps`] bundles the repository-facing routines used by both the live
//! event handlers and the bootstrap coordinator: uploading a document (with
//! chunking when oversized), the tagging pipeline flow, dated moves into a
//! target folder, and folder timestamp bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kbsync_core::config::Config;
use kbsync_core::domain::naming;
use kbsync_core::domain::newtypes::{FolderPath, NodeId};
use kbsync_core::domain::tagging::TagAnalysis;
use kbsync_core::ports::ai_service::IAiService;
use kbsync_core::ports::repository::IRepositoryClient;
use tracing::{debug, info, warn};

use crate::chunker::DocumentChunker;
use crate::registry::FolderScopeRegistry;
use crate::tag_decision::TagDecisionEngine;
use crate::SyncError;

/// Repository-facing routines shared by handlers and the bootstrap pass
pub struct SyncOps {
    repository: Arc<dyn IRepositoryClient>,
    ai: Arc<dyn IAiService>,
    chunker: DocumentChunker,
    decision: TagDecisionEngine,
    content_registry: Arc<FolderScopeRegistry>,
    retry_folder: FolderPath,
    default_tag: String,
    published_property: String,
    updated_property: String,
}

impl SyncOps {
    pub fn new(
        repository: Arc<dyn IRepositoryClient>,
        ai: Arc<dyn IAiService>,
        content_registry: Arc<FolderScopeRegistry>,
        retry_folder: FolderPath,
        config: &Config,
    ) -> Self {
        Self {
            repository,
            ai,
            chunker: DocumentChunker::new(config.chunking.max_chars),
            decision: TagDecisionEngine::from_percentages(
                config.tagging.taggable_threshold_percent,
                config.tagging.publicly_allowed_threshold_percent,
            ),
            content_registry,
            retry_folder,
            default_tag: config.tagging.default_tag.clone(),
            published_property: config.sync.published_property.clone(),
            updated_property: config.sync.updated_property.clone(),
        }
    }

    /// Uploads one document into the AI index, chunking when oversized
    ///
    /// `remote_name` is the name the index stores the content under; chunked
    /// parts upload under their part ids instead.
    pub async fn process_document(
        &self,
        node_id: &NodeId,
        remote_name: &str,
    ) -> Result<(), SyncError> {
        let text = self
            .repository
            .download_text(node_id)
            .await
            .map_err(SyncError::Repository)?;

        if self.chunker.is_oversized(&text) {
            let mut metadata = HashMap::new();
            metadata.insert("file_name".to_string(), remote_name.to_string());
            let chunks = self.chunker.split(node_id, &text, &metadata, Utc::now());
            info!(
                node_id = %node_id,
                parts = chunks.len(),
                "Document exceeds chunk limit, uploading in parts"
            );
            for chunk in &chunks {
                self.ai
                    .ingest(node_id, &chunk.id, &chunk.text)
                    .await
                    .map_err(SyncError::AiService)?;
            }
        } else {
            self.ai
                .ingest(node_id, remote_name, &text)
                .await
                .map_err(SyncError::AiService)?;
        }
        debug!(node_id = %node_id, name = remote_name, "Document uploaded");
        Ok(())
    }

    /// Removes a document from the AI index
    pub async fn remove_document(&self, node_id: &NodeId) -> Result<(), SyncError> {
        self.ai
            .remove_document(node_id)
            .await
            .map_err(SyncError::AiService)?;
        info!(node_id = %node_id, "Document removed from AI index");
        Ok(())
    }

    /// Stamps sync timestamps on a folder
    ///
    /// Writes `updated_at` always; includes `published_at` after a full
    /// publish pass.
    pub async fn stamp_folder(
        &self,
        folder_id: &NodeId,
        include_published: bool,
    ) -> Result<(), SyncError> {
        let now = Utc::now();
        let published = include_published.then_some(now);
        self.repository
            .stamp_sync_times(folder_id, published, now)
            .await
            .map_err(SyncError::Repository)
    }

    /// Refreshes the updated-at stamp on the first in-scope ancestor
    ///
    /// Called by the content handler after each processed event so folder
    /// staleness tracking stays accurate. Quietly does nothing when no
    /// ancestor is in scope.
    pub async fn refresh_scope_stamp(&self, ancestors: &[NodeId]) -> Result<(), SyncError> {
        for ancestor in ancestors {
            if self.content_registry.contains(ancestor)? {
                return self.stamp_folder(ancestor, false).await;
            }
        }
        Ok(())
    }

    /// Candidate tags for the classifier: names of in-scope content folders
    ///
    /// Fully numeric names (the dated year/month/day folders) are skipped.
    /// Duplicate names keep the first folder seen.
    pub async fn candidate_tag_folders(&self) -> Result<Vec<(String, NodeId)>, SyncError> {
        let mut candidates: Vec<(String, NodeId)> = Vec::new();
        for folder_id in self.content_registry.snapshot()? {
            let node = self
                .repository
                .get_node(&folder_id)
                .await
                .map_err(SyncError::Repository)?;
            if node.name.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if !candidates.iter().any(|(name, _)| name == &node.name) {
                candidates.push((node.name, folder_id));
            }
        }
        Ok(candidates)
    }

    /// Runs the full tagging pipeline for one document
    ///
    /// Classifies the content against the in-scope folder names, applies the
    /// resulting tags and public-access decision, re-ingests the document
    /// under a timestamped name, and moves it into a dated subfolder of the
    /// folder matching the main tag.
    pub async fn tag_and_route(
        &self,
        node_id: &NodeId,
        file_name: &str,
    ) -> Result<TagAnalysis, SyncError> {
        let candidates = self.candidate_tag_folders().await?;
        let candidate_names: Vec<String> =
            candidates.iter().map(|(name, _)| name.clone()).collect();
        debug!(node_id = %node_id, tags = ?candidate_names, "Candidate tags resolved");

        let text = self
            .repository
            .download_text(node_id)
            .await
            .map_err(SyncError::Repository)?;
        let payload = self
            .ai
            .analyze(&text, &candidate_names)
            .await
            .map_err(SyncError::AiService)?;
        let analysis = self.decision.decide(&payload)?;

        if let Some(message) = &analysis.error_message {
            warn!(node_id = %node_id, error = %message, "Tagging pipeline reported an error");
        }

        let target_folder = candidates
            .iter()
            .find(|(name, _)| name == &analysis.main_tag)
            .map(|(_, id)| id.clone())
            .ok_or_else(|| {
                SyncError::Repository(anyhow::anyhow!(
                    "main tag '{}' has no matching in-scope folder",
                    analysis.main_tag
                ))
            })?;

        self.apply_tags(node_id, &analysis.tags).await?;
        self.repository
            .set_public_access(node_id, analysis.publicly_allowed)
            .await
            .map_err(SyncError::Repository)?;

        let timestamped = naming::append_timestamp_marker(file_name, Utc::now());
        self.repository
            .set_description(node_id, &format!("Moved to folder: {}", analysis.main_tag))
            .await
            .map_err(SyncError::Repository)?;
        self.process_document(node_id, &timestamped).await?;
        self.move_with_timestamp(node_id, &target_folder, &timestamped)
            .await?;

        info!(
            node_id = %node_id,
            main_tag = %analysis.main_tag,
            publicly_allowed = analysis.publicly_allowed,
            "Document tagged and routed"
        );
        Ok(analysis)
    }

    /// Applies tags to a node, always including a non-blank default tag
    async fn apply_tags(&self, node_id: &NodeId, tags: &[String]) -> Result<(), SyncError> {
        let mut all = tags.to_vec();
        if !self.default_tag.trim().is_empty() && !all.contains(&self.default_tag) {
            all.push(self.default_tag.clone());
        }
        self.repository
            .add_tags(node_id, &all)
            .await
            .map_err(SyncError::Repository)
    }

    /// Moves a document into today's dated subfolder of `target_root`
    ///
    /// Creates the `year/month/day` hierarchy as needed, renames the node to
    /// `new_name`, and restores the title from the pre-move file name.
    pub async fn move_with_timestamp(
        &self,
        node_id: &NodeId,
        target_root: &NodeId,
        new_name: &str,
    ) -> Result<(), SyncError> {
        let destination = self.ensure_dated_subfolders(target_root, Utc::now()).await?;
        let original_name = self
            .repository
            .get_node(node_id)
            .await
            .map_err(SyncError::Repository)?
            .name;

        self.repository
            .move_node(node_id, &destination)
            .await
            .map_err(SyncError::Repository)?;
        self.repository
            .rename_node(node_id, new_name)
            .await
            .map_err(SyncError::Repository)?;
        self.repository
            .set_title(node_id, naming::title_from_file_name(&original_name))
            .await
            .map_err(SyncError::Repository)?;
        debug!(node_id = %node_id, destination = %destination, name = new_name, "Document moved");
        Ok(())
    }

    /// Moves a pipeline document into the retry folder for reprocessing
    ///
    /// Used during bootstrap to force leftover pipeline documents back
    /// through tagging on restart. The title is set from the timestamped
    /// name so the rename survives inspection.
    pub async fn move_to_retry(&self, node_id: &NodeId, file_name: &str) -> Result<(), SyncError> {
        let retry_root = self
            .repository
            .resolve_path(&self.retry_folder)
            .await
            .map_err(SyncError::Repository)?
            .ok_or_else(|| {
                SyncError::Repository(anyhow::anyhow!(
                    "retry folder does not exist: {}",
                    self.retry_folder
                ))
            })?;

        let timestamped = naming::append_timestamp_marker(file_name, Utc::now());
        self.move_with_timestamp(node_id, &retry_root, &timestamped)
            .await?;
        self.repository
            .set_title(node_id, naming::title_from_file_name(&timestamped))
            .await
            .map_err(SyncError::Repository)?;
        info!(node_id = %node_id, name = %timestamped, "Document moved to retry folder");
        Ok(())
    }

    /// Finds or creates today's `year/month/day` folders under `root`
    async fn ensure_dated_subfolders(
        &self,
        root: &NodeId,
        now: DateTime<Utc>,
    ) -> Result<NodeId, SyncError> {
        let mut parent = root.clone();
        for segment in [
            now.format("%Y").to_string(),
            now.format("%m").to_string(),
            now.format("%d").to_string(),
        ] {
            parent = self
                .repository
                .ensure_child_folder(&parent, &segment)
                .await
                .map_err(SyncError::Repository)?;
        }
        Ok(parent)
    }

    /// Parses a folder's sync timestamps from its stored properties
    pub fn folder_timestamps(
        &self,
        properties: &HashMap<String, String>,
    ) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let parse = |key: &str| {
            properties
                .get(key)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc))
        };
        (
            parse(&self.published_property),
            parse(&self.updated_property),
        )
    }
}
