//! Content repository port (driven/secondary port)
//!
//! This module defines the interface for interacting with the hierarchical
//! content repository that owns the documents being mirrored into the AI
//! index. The primary implementation targets an Alfresco-style REST API,
//! but the trait is deliberately generic over any repository that models
//! folders, documents, aspects, and tags.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - Uses `#[async_trait]` for async trait methods.
//! - `FolderInfo` / `DocumentSummary` / `NodeInfo` are port-level DTOs, not
//!   domain entities; the engine maps them onto its own records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::{AspectName, FolderPath, NodeId};

/// A folder discovered by an aspect query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderInfo {
    /// Repository identifier of the folder
    pub id: NodeId,
    /// Folder name
    pub name: String,
    /// Logical path of the folder from the repository root
    pub path: FolderPath,
    /// Folder properties as raw key/value pairs
    pub properties: HashMap<String, String>,
}

/// Metadata of a single node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Repository identifier of the node
    pub id: NodeId,
    /// Node name
    pub name: String,
    /// Whether the node is a folder
    pub is_folder: bool,
    /// Primary parent folder (None for the repository root)
    pub parent_id: Option<NodeId>,
    /// Node properties as raw key/value pairs
    pub properties: HashMap<String, String>,
    /// Aspects applied to the node
    pub aspects: Vec<AspectName>,
}

/// A document returned from a subtree listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Repository identifier of the document
    pub id: NodeId,
    /// Document file name
    pub name: String,
    /// Last modification time
    pub modified_at: DateTime<Utc>,
}

/// One page of a paginated document listing
#[derive(Debug, Clone)]
pub struct DocumentPage {
    /// Documents in this page
    pub items: Vec<DocumentSummary>,
    /// True if more pages follow
    pub has_more: bool,
}

/// Port trait for content repository operations
///
/// This is the engine's only view of the repository. Implementations handle
/// the concrete REST protocol, authentication, and error mapping.
///
/// ## Implementation Notes
///
/// - Query methods reflect the repository's *search index*, which may lag
///   behind writes; [`IRepositoryClient::is_indexed`] lets callers poll for
///   visibility after creating a node.
/// - Mutation methods are expected to be idempotent where the underlying
///   API allows it (re-applying a tag or aspect is not an error).
#[async_trait::async_trait]
pub trait IRepositoryClient: Send + Sync {
    /// Finds all folders carrying the given aspect
    ///
    /// Used to discover the synchronization and tagging scopes at startup.
    async fn find_folders_with_aspect(&self, aspect: &AspectName)
        -> anyhow::Result<Vec<FolderInfo>>;

    /// Resolves a logical folder path to a node ID
    ///
    /// # Returns
    /// `Ok(None)` when the path does not exist.
    async fn resolve_path(&self, path: &FolderPath) -> anyhow::Result<Option<NodeId>>;

    /// Creates all missing folders along `path` and returns the leaf folder
    ///
    /// Existing segments are reused; only missing ones are created.
    async fn create_folder_path(&self, path: &FolderPath) -> anyhow::Result<NodeId>;

    /// Returns true once the node is visible to repository searches
    ///
    /// Freshly created nodes may take several seconds to appear in the
    /// search index even though direct lookups already succeed.
    async fn is_indexed(&self, node_id: &NodeId) -> anyhow::Result<bool>;

    /// Retrieves metadata for a single node
    async fn get_node(&self, node_id: &NodeId) -> anyhow::Result<NodeInfo>;

    /// Lists documents in the folder's subtree, oldest modification first
    ///
    /// # Arguments
    /// * `folder_id` - Root of the subtree to list
    /// * `skip` - Number of results to skip (pagination offset)
    /// * `max_items` - Page size
    async fn list_documents(
        &self,
        folder_id: &NodeId,
        skip: u32,
        max_items: u32,
    ) -> anyhow::Result<DocumentPage>;

    /// Returns the modification time of the newest document in the subtree
    ///
    /// # Returns
    /// `Ok(None)` when the subtree contains no documents.
    async fn latest_modification(
        &self,
        folder_id: &NodeId,
    ) -> anyhow::Result<Option<DateTime<Utc>>>;

    /// Downloads a document's content as plain text
    async fn download_text(&self, node_id: &NodeId) -> anyhow::Result<String>;

    /// Finds or creates a direct child folder by name
    ///
    /// Used to build date-based (`year/month/day`) hierarchies under a
    /// folder known only by id.
    async fn ensure_child_folder(&self, parent_id: &NodeId, name: &str) -> anyhow::Result<NodeId>;

    /// Renames a node
    async fn rename_node(&self, node_id: &NodeId, new_name: &str) -> anyhow::Result<()>;

    /// Updates a node's title property
    async fn set_title(&self, node_id: &NodeId, title: &str) -> anyhow::Result<()>;

    /// Updates a node's description property
    async fn set_description(&self, node_id: &NodeId, description: &str) -> anyhow::Result<()>;

    /// Sets arbitrary properties on a node
    async fn set_properties(
        &self,
        node_id: &NodeId,
        properties: &HashMap<String, String>,
    ) -> anyhow::Result<()>;

    /// Moves a node into another folder
    async fn move_node(&self, node_id: &NodeId, target_folder: &NodeId) -> anyhow::Result<()>;

    /// Adds tags to a node; tags that are already present are ignored
    async fn add_tags(&self, node_id: &NodeId, tags: &[String]) -> anyhow::Result<()>;

    /// Grants or revokes public read access on a node
    async fn set_public_access(&self, node_id: &NodeId, allowed: bool) -> anyhow::Result<()>;

    /// Installs the ingestion rule on a folder
    ///
    /// The rule makes the repository apply `aspect` to every node later
    /// added under the folder, so new content flows through the event
    /// pipeline without manual intervention. Installing an already-present
    /// rule is a no-op.
    async fn install_ingestion_rule(
        &self,
        folder_id: &NodeId,
        aspect: &AspectName,
    ) -> anyhow::Result<()>;

    /// Records sync timestamps on a folder
    ///
    /// # Arguments
    /// * `published_at` - Full-publish time; `None` leaves the stored value untouched
    /// * `updated_at` - Sync touch time, always written
    async fn stamp_sync_times(
        &self,
        folder_id: &NodeId,
        published_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}
