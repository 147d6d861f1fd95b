//! Tagging pipeline content handler
//!
//! Files dropped into a tagging-scope folder (the pipeline Start or Retry
//! folders) run through the full classification flow: AI analysis against
//! the in-scope folder names, tag and permission application, re-ingestion
//! under a timestamped name, and a move into the main-tag folder.

use std::sync::Arc;

use kbsync_core::domain::errors::DomainError;
use kbsync_core::domain::event::{EventKind, NodeEvent};
use tracing::{info, warn};

use crate::handlers::{EventHandler, HandlerRole};
use crate::ops::SyncOps;
use crate::registry::FolderScopeRegistry;
use crate::SyncError;

pub struct TagContentHandler {
    registry: Arc<FolderScopeRegistry>,
    ops: Arc<SyncOps>,
}

impl TagContentHandler {
    pub fn new(registry: Arc<FolderScopeRegistry>, ops: Arc<SyncOps>) -> Self {
        Self { registry, ops }
    }
}

#[async_trait::async_trait]
impl EventHandler for TagContentHandler {
    fn role(&self) -> HandlerRole {
        HandlerRole::TagContent
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
        for ancestor in &event.ancestors {
            if self.registry.contains(ancestor)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn handle(&self, event: &NodeEvent) -> Result<(), SyncError> {
        match event.kind {
            EventKind::Created | EventKind::Updated => {
                info!(node_id = %event.node_id, name = %event.name, "Tagging pipeline event");
                self.ops
                    .tag_and_route(&event.node_id, &event.name)
                    .await?;
                Ok(())
            }
            EventKind::Deleted => {
                warn!(
                    node_id = %event.node_id,
                    kind = %event.kind,
                    "Unhandled event kind for tagging pipeline"
                );
                Ok(())
            }
        }
    }
}
