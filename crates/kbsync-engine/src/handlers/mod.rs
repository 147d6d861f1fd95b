//! Event handlers
//!
//! One handler per role. Content handlers react to file events inside their
//! scope; folder handlers maintain the scope registries themselves. The
//! dispatcher owns the routing table; handlers only see events already
//! addressed to them.

pub mod content;
pub mod folder;
pub mod tag_content;
pub mod tag_folder;

pub use content::ContentSyncHandler;
pub use folder::SyncFolderScopeHandler;
pub use tag_content::TagContentHandler;
pub use tag_folder::TagFolderScopeHandler;

use std::fmt;

use kbsync_core::domain::event::NodeEvent;

use crate::SyncError;

/// Identifies which handler a deferred task belongs to
///
/// Used as the key of the dispatch table; queued tasks store a role instead
/// of a handler reference so the queue stays plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerRole {
    /// Mirrors document content into the AI index
    ContentSync,
    /// Maintains the content synchronization scope registry
    SyncFolderScope,
    /// Runs documents through the tagging pipeline
    TagContent,
    /// Maintains the tagging pipeline scope registry
    TagFolderScope,
}

impl fmt::Display for HandlerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerRole::ContentSync => f.write_str("content-sync"),
            HandlerRole::SyncFolderScope => f.write_str("sync-folder-scope"),
            HandlerRole::TagContent => f.write_str("tag-content"),
            HandlerRole::TagFolderScope => f.write_str("tag-folder-scope"),
        }
    }
}

/// Contract every event handler implements
///
/// The dispatcher calls [`validate`](EventHandler::validate) on every
/// delivered event (even ones that will be queued), applies
/// [`accepts`](EventHandler::accepts) only on the synchronous path and at
/// drain time, and invokes [`handle`](EventHandler::handle) for accepted
/// events.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    /// The role this handler serves
    fn role(&self) -> HandlerRole;

    /// Cheap structural check: is the event's resource type right for this
    /// handler? Wrong type is a malformed event, surfaced to the caller and
    /// never queued.
    fn validate(&self, event: &NodeEvent) -> Result<(), SyncError>;

    /// Filter predicate: should this event be processed?
    ///
    /// Errors when the handler's scope registry is still uninitialized;
    /// a handler must reject events with an initialization-state error
    /// rather than silently no-op.
    fn accepts(&self, event: &NodeEvent) -> Result<bool, SyncError>;

    /// Processes one accepted event
    async fn handle(&self, event: &NodeEvent) -> Result<(), SyncError>;
}
