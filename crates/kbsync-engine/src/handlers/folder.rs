//! Content-sync scope maintenance
//!
//! Folder events carrying the tracked sync aspect mutate the content-sync
//! registry: created/updated folders enter the scope, deleted folders leave
//! it. Deletion also purges the folder's indexed documents from the AI
//! service, best-effort only: a failed purge is logged, never escalated.

use std::sync::Arc;

use kbsync_core::domain::errors::DomainError;
use kbsync_core::domain::event::{EventKind, NodeEvent};
use kbsync_core::domain::newtypes::AspectName;
use kbsync_core::ports::ai_service::IAiService;
use tracing::{error, info};

use crate::handlers::{EventHandler, HandlerRole};
use crate::registry::FolderScopeRegistry;
use crate::SyncError;

pub struct SyncFolderScopeHandler {
    registry: Arc<FolderScopeRegistry>,
    ai: Arc<dyn IAiService>,
    aspect: AspectName,
}

impl SyncFolderScopeHandler {
    pub fn new(
        registry: Arc<FolderScopeRegistry>,
        ai: Arc<dyn IAiService>,
        aspect: AspectName,
    ) -> Self {
        Self {
            registry,
            ai,
            aspect,
        }
    }
}

#[async_trait::async_trait]
impl EventHandler for SyncFolderScopeHandler {
    fn role(&self) -> HandlerRole {
        HandlerRole::SyncFolderScope
    }

    fn validate(&self, event: &NodeEvent) -> Result<(), SyncError> {
        if !event.is_folder {
            return Err(DomainError::MalformedEvent {
                node_id: event.node_id.to_string(),
                reason: "scope handler received a non-folder event".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn accepts(&self, event: &NodeEvent) -> Result<bool, SyncError> {
        Ok(event.aspects.contains(&self.aspect))
    }

    async fn handle(&self, event: &NodeEvent) -> Result<(), SyncError> {
        match event.kind {
            EventKind::Created | EventKind::Updated => {
                info!(folder_id = %event.node_id, "Folder entering sync scope");
                self.registry.add(event.node_id.clone());
            }
            EventKind::Deleted => {
                info!(folder_id = %event.node_id, "Folder leaving sync scope");
                self.registry.remove(&event.node_id);
                if let Err(error) = self.ai.remove_folder(&event.node_id).await {
                    error!(
                        folder_id = %event.node_id,
                        error = %error,
                        "Failed to purge indexed documents for deleted folder"
                    );
                }
            }
        }
        Ok(())
    }
}
