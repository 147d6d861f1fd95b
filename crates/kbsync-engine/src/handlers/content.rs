//! Content synchronization handler
//!
//! Mirrors file events inside the content-sync scope into the AI index:
//! creations and meaningful updates upload the document, deletions remove
//! it. After each processed event the first in-scope ancestor folder gets
//! its updated-at stamp refreshed so staleness tracking stays honest.

use std::sync::Arc;

use kbsync_core::domain::errors::DomainError;
use kbsync_core::domain::event::{EventKind, NodeEvent};
use tracing::{debug, info};

use crate::handlers::{EventHandler, HandlerRole};
use crate::ops::SyncOps;
use crate::registry::FolderScopeRegistry;
use crate::SyncError;

pub struct ContentSyncHandler {
    registry: Arc<FolderScopeRegistry>,
    ops: Arc<SyncOps>,
}

impl ContentSyncHandler {
    pub fn new(registry: Arc<FolderScopeRegistry>, ops: Arc<SyncOps>) -> Self {
        Self { registry, ops }
    }

    fn in_scope(&self, event: &NodeEvent) -> Result<bool, SyncError> {
        for ancestor in &event.ancestors {
            if self.registry.contains(ancestor)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait::async_trait]
impl EventHandler for ContentSyncHandler {
    fn role(&self) -> HandlerRole {
        HandlerRole::ContentSync
    }

    fn validate(&self, event: &NodeEvent) -> Result<(), SyncError> {
        if !event.is_file && !event.is_folder {
            return Err(DomainError::MalformedEvent {
                node_id: event.node_id.to_string(),
                reason: "event resource is neither file nor folder".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn accepts(&self, event: &NodeEvent) -> Result<bool, SyncError> {
        if !event.is_file {
            return Ok(false);
        }
        self.in_scope(event)
    }

    async fn handle(&self, event: &NodeEvent) -> Result<(), SyncError> {
        info!(node_id = %event.node_id, kind = %event.kind, "Content sync event");
        match event.kind {
            EventKind::Created => {
                self.ops
                    .process_document(&event.node_id, &event.name)
                    .await?;
            }
            EventKind::Updated => {
                if event.name_changed() || event.content_changed() || event.title_changed() {
                    self.ops
                        .process_document(&event.node_id, &event.name)
                        .await?;
                } else {
                    debug!(
                        node_id = %event.node_id,
                        name = %event.name,
                        "Skipping update, content unchanged"
                    );
                }
            }
            EventKind::Deleted => {
                self.ops.remove_document(&event.node_id).await?;
            }
        }
        self.ops.refresh_scope_stamp(&event.ancestors).await
    }
}
