//! Per-folder synchronization bookkeeping
//!
//! A [`FolderSyncRecord`] captures when a folder's contents were last fully
//! pushed to the AI index (`published_at`) versus last touched by any sync
//! activity (`updated_at`), compared against the newest document
//! modification inside the folder's subtree.

use chrono::{DateTime, Utc};

use crate::domain::newtypes::NodeId;

/// Sync timestamps for one in-scope folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSyncRecord {
    /// The folder this record describes
    pub folder_id: NodeId,
    /// Last time the folder's contents were fully published (None = never)
    pub published_at: Option<DateTime<Utc>>,
    /// Last time any sync activity touched the folder (None = never)
    pub updated_at: Option<DateTime<Utc>>,
    /// Modification time of the newest document in the folder's subtree
    pub latest_doc_modified_at: DateTime<Utc>,
}

impl FolderSyncRecord {
    /// Returns true if the folder is due for a resync
    ///
    /// A folder is due iff it has never been synced (`updated_at` is None)
    /// or its last sync predates the newest document modification. Equal
    /// timestamps mean the folder is up to date.
    pub fn is_due(&self) -> bool {
        match self.updated_at {
            None => true,
            Some(updated) => updated < self.latest_doc_modified_at,
        }
    }

    /// Returns true if the folder has never completed a full publish
    pub fn never_published(&self) -> bool {
        self.published_at.is_none()
    }
}
