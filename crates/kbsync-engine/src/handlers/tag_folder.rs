//! Tagging-pipeline scope maintenance
//!
//! Counterpart of the sync scope handler for the tagging pipeline aspect.
//! Unlike content-scope deletion, leaving the tagging scope does not purge
//! anything: pipeline folders only stage documents in transit.

use std::sync::Arc;

use kbsync_core::domain::errors::DomainError;
use kbsync_core::domain::event::{EventKind, NodeEvent};
use kbsync_core::domain::newtypes::AspectName;
use tracing::info;

use crate::handlers::{EventHandler, HandlerRole};
use crate::registry::FolderScopeRegistry;
use crate::SyncError;

pub struct TagFolderScopeHandler {
    registry: Arc<FolderScopeRegistry>,
    aspect: AspectName,
}

impl TagFolderScopeHandler {
    pub fn new(registry: Arc<FolderScopeRegistry>, aspect: AspectName) -> Self {
        Self { registry, aspect }
    }
}

#[async_trait::async_trait]
impl EventHandler for TagFolderScopeHandler {
    fn role(&self) -> HandlerRole {
        HandlerRole::TagFolderScope
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
                info!(folder_id = %event.node_id, "Folder entering tagging scope");
                self.registry.add(event.node_id.clone());
            }
            EventKind::Deleted => {
                info!(folder_id = %event.node_id, "Folder leaving tagging scope");
                self.registry.remove(&event.node_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::testutil::node_id;

    fn handler() -> (TagFolderScopeHandler, Arc<FolderScopeRegistry>) {
        let registry = Arc::new(FolderScopeRegistry::new(HandlerRole::TagFolderScope));
        registry.initialize(Vec::new());
        let h = TagFolderScopeHandler::new(
            registry.clone(),
            AspectName::new("cm:generalclassifiable").unwrap(),
        );
        (h, registry)
    }

    fn folder_event(kind: EventKind, id: &str, aspects: Vec<&str>) -> NodeEvent {
        NodeEvent {
            kind,
            node_id: node_id(id),
            name: id.to_string(),
            is_file: false,
            is_folder: true,
            ancestors: Vec::new(),
            aspects_before: Vec::new(),
            aspects: aspects
                .into_iter()
                .map(|a| AspectName::new(a).unwrap())
                .collect(),
            properties_before: HashMap::new(),
            properties: HashMap::new(),
            content_hash_before: None,
            content_hash: None,
        }
    }

    #[tokio::test]
    async fn test_scope_add_and_remove() {
        let (h, registry) = handler();
        let created = folder_event(EventKind::Created, "p1", vec!["cm:generalclassifiable"]);
        assert!(h.accepts(&created).unwrap());
        h.handle(&created).await.unwrap();
        assert!(registry.contains(&node_id("p1")).unwrap());

        let deleted = folder_event(EventKind::Deleted, "p1", vec!["cm:generalclassifiable"]);
        h.handle(&deleted).await.unwrap();
        assert!(!registry.contains(&node_id("p1")).unwrap());
    }

    #[tokio::test]
    async fn test_aspect_filter() {
        let (h, _) = handler();
        let event = folder_event(EventKind::Created, "p1", vec!["ai:synced"]);
        assert!(!h.accepts(&event).unwrap());
    }
}
