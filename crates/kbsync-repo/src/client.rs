//! Content repository REST client
//!
//! Implements [`IRepositoryClient`] against an Alfresco-style REST API:
//! the core nodes API for CRUD and children listings, the search API (AFTS)
//! for aspect and subtree queries, and a webscript endpoint for folder rule
//! installation. Logical pipe-separated paths are resolved segment by
//! segment through children listings because freshly created folders are
//! visible there before the search index catches up.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use kbsync_core::config::Config;
use kbsync_core::domain::naming::decode_qname_segment;
use kbsync_core::domain::newtypes::{AspectName, FolderPath, NodeId, PATH_SEPARATOR};
use kbsync_core::ports::repository::{
    DocumentPage, DocumentSummary, FolderInfo, IRepositoryClient, NodeInfo,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;

/// Core nodes API prefix
const NODES_API: &str = "/alfresco/api/-default-/public/alfresco/versions/1/nodes";

/// Search API endpoint (AFTS queries)
const SEARCH_API: &str = "/alfresco/api/-default-/public/search/versions/1/search";

/// Webscript that installs the aspect-apply rule on a folder
const RULE_WEBSCRIPT: &str = "/alfresco/service/api/ai/setupFolderRule";

/// Node reference prefix used in AFTS queries
const STORE_PREFIX: &str = "workspace://SpacesStore/";

/// Alias the nodes API accepts for the repository root folder
const ROOT_ALIAS: &str = "-root-";

/// Page size for children listings during path resolution
const CHILDREN_PAGE_SIZE: u32 = 100;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct EntryResponse<T> {
    entry: T,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    list: ListBody<T>,
}

#[derive(Debug, Deserialize)]
struct ListBody<T> {
    #[serde(default)]
    pagination: Option<PaginationInfo>,
    entries: Vec<EntryResponse<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaginationInfo {
    #[serde(default)]
    has_more_items: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodePayload {
    id: String,
    name: String,
    #[serde(default)]
    is_folder: bool,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    properties: Option<HashMap<String, Value>>,
    #[serde(default)]
    aspect_names: Option<Vec<String>>,
    #[serde(default)]
    path: Option<PathInfo>,
    #[serde(default)]
    permissions: Option<PermissionsInfo>,
}

#[derive(Debug, Deserialize)]
struct PathInfo {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionsInfo {
    #[serde(default)]
    locally_set: Option<Vec<PermissionElement>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionElement {
    authority_id: String,
    name: String,
    access_status: String,
}

impl NodePayload {
    /// Flattens JSON property values to strings, dropping structured ones
    fn string_properties(&self) -> HashMap<String, String> {
        self.properties
            .as_ref()
            .map(|props| {
                props
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ============================================================================
// RepositoryClient
// ============================================================================

/// Reqwest-backed implementation of the repository port
///
/// Every request carries basic authentication; credentials and the root
/// folder name come from [`Config`].
pub struct RepositoryClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    root_name: String,
    published_property: String,
    updated_property: String,
}

impl RepositoryClient {
    /// Creates a client from the repository section of the configuration
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(config.repository.base_url.clone(), config)
    }

    /// Creates a client pointing at a custom base URL (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>, config: &Config) -> Result<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url).context("invalid repository base URL")?;
        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username: config.repository.username.clone(),
            password: config.repository.password.clone(),
            root_name: config.repository.root_name.clone(),
            published_property: config.sync.published_property.clone(),
            updated_property: config.sync.updated_property.clone(),
        })
    }

    fn request(&self, method: Method, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    fn node_url(&self, suffix: &str) -> String {
        format!("{}{}{}", self.base_url, NODES_API, suffix)
    }

    async fn search(&self, body: Value) -> Result<ListResponse<NodePayload>> {
        self.request(Method::POST, format!("{}{}", self.base_url, SEARCH_API))
            .json(&body)
            .send()
            .await
            .context("Failed to send search request")?
            .error_for_status()
            .context("Search returned error status")?
            .json()
            .await
            .context("Failed to parse search response")
    }

    /// Lists children of a folder, filtered to folders or files only
    async fn list_children(
        &self,
        parent: &str,
        folders_only: bool,
        skip: u32,
    ) -> Result<ListResponse<NodePayload>> {
        let filter = if folders_only {
            "(isFolder=true)"
        } else {
            "(isFile=true)"
        };
        self.request(Method::GET, self.node_url(&format!("/{parent}/children")))
            .query(&[
                ("skipCount", skip.to_string()),
                ("maxItems", CHILDREN_PAGE_SIZE.to_string()),
                ("where", filter.to_string()),
            ])
            .send()
            .await
            .context("Failed to list folder children")?
            .error_for_status()
            .context("Children listing returned error status")?
            .json()
            .await
            .context("Failed to parse children listing")
    }

    /// Finds a direct child folder by name, paging through the listing
    async fn find_child_folder(&self, parent: &str, name: &str) -> Result<Option<String>> {
        let mut skip = 0u32;
        loop {
            let page = self.list_children(parent, true, skip).await?;
            let count = page.list.entries.len() as u32;
            if let Some(hit) = page
                .list
                .entries
                .into_iter()
                .find(|child| child.entry.name == name)
            {
                return Ok(Some(hit.entry.id));
            }
            let has_more = page
                .list
                .pagination
                .and_then(|p| p.has_more_items)
                .unwrap_or(false);
            if !has_more || count == 0 {
                return Ok(None);
            }
            skip += count;
        }
    }

    async fn create_child_folder(&self, parent: &str, name: &str) -> Result<String> {
        let created: EntryResponse<NodePayload> = self
            .request(Method::POST, self.node_url(&format!("/{parent}/children")))
            .json(&json!({ "name": name, "nodeType": "cm:folder" }))
            .send()
            .await
            .context("Failed to create folder")?
            .error_for_status()
            .context("Folder creation returned error status")?
            .json()
            .await
            .context("Failed to parse folder creation response")?;
        info!(folder_id = %created.entry.id, name, "Created folder");
        Ok(created.entry.id)
    }

    async fn update_node(&self, node_id: &NodeId, body: Value) -> Result<()> {
        self.request(Method::PUT, self.node_url(&format!("/{node_id}")))
            .json(&body)
            .send()
            .await
            .context("Failed to update node")?
            .error_for_status()
            .context("Node update returned error status")?;
        Ok(())
    }

    /// Converts a search-result path (`/Company Home/Sub`) plus the node
    /// name into a logical pipe-separated path
    fn logical_path(&self, payload: &NodePayload) -> Result<FolderPath> {
        let parent = payload
            .path
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .unwrap_or("")
            .trim_matches('/')
            .replace('/', &PATH_SEPARATOR.to_string());
        let full = if parent.is_empty() {
            payload.name.clone()
        } else {
            format!("{parent}{PATH_SEPARATOR}{}", payload.name)
        };
        FolderPath::rooted_at(full, &self.root_name)
            .context("folder path does not start at the repository root")
    }

    fn node_info(&self, payload: NodePayload) -> Result<NodeInfo> {
        Ok(NodeInfo {
            id: NodeId::new(&payload.id)?,
            name: payload.name.clone(),
            is_folder: payload.is_folder,
            parent_id: payload
                .parent_id
                .as_deref()
                .map(NodeId::new)
                .transpose()?,
            properties: payload.string_properties(),
            aspects: payload
                .aspect_names
                .as_deref()
                .unwrap_or_default()
                .iter()
                .filter_map(|a| AspectName::new(a).ok())
                .collect(),
        })
    }
}

#[async_trait::async_trait]
impl IRepositoryClient for RepositoryClient {
    async fn find_folders_with_aspect(
        &self,
        aspect: &AspectName,
    ) -> Result<Vec<FolderInfo>> {
        let body = json!({
            "query": {
                "language": "afts",
                "query": format!("ASPECT:\"{aspect}\" AND TYPE:\"cm:folder\""),
            },
            "include": ["properties", "path"],
        });
        let response = self.search(body).await?;
        debug!(aspect = %aspect, folders = response.list.entries.len(), "Aspect query complete");

        let mut folders = Vec::with_capacity(response.list.entries.len());
        for entry in response.list.entries {
            let path = self.logical_path(&entry.entry)?;
            folders.push(FolderInfo {
                id: NodeId::new(&entry.entry.id)?,
                name: entry.entry.name.clone(),
                path,
                properties: entry.entry.string_properties(),
            });
        }
        Ok(folders)
    }

    async fn resolve_path(&self, path: &FolderPath) -> Result<Option<NodeId>> {
        let mut parent = ROOT_ALIAS.to_string();
        for segment in path.segments().skip(1) {
            match self.find_child_folder(&parent, segment).await? {
                Some(id) => parent = id,
                None => return Ok(None),
            }
        }
        if parent == ROOT_ALIAS {
            // The root alias is not a stable id; fetch the real one
            let root: EntryResponse<NodePayload> = self
                .request(Method::GET, self.node_url(&format!("/{ROOT_ALIAS}")))
                .send()
                .await
                .context("Failed to fetch repository root")?
                .error_for_status()
                .context("Root fetch returned error status")?
                .json()
                .await
                .context("Failed to parse repository root")?;
            parent = root.entry.id;
        }
        Ok(Some(NodeId::new(parent)?))
    }

    async fn create_folder_path(&self, path: &FolderPath) -> Result<NodeId> {
        let mut parent = ROOT_ALIAS.to_string();
        for segment in path.segments().skip(1) {
            parent = match self.find_child_folder(&parent, segment).await? {
                Some(id) => id,
                None => {
                    self.create_child_folder(&parent, &decode_qname_segment(segment))
                        .await?
                }
            };
        }
        Ok(NodeId::new(parent)?)
    }

    async fn is_indexed(&self, node_id: &NodeId) -> Result<bool> {
        let body = json!({
            "query": {
                "language": "afts",
                "query": format!("ID:\"{STORE_PREFIX}{node_id}\""),
            },
            "paging": { "maxItems": 1 },
        });
        let response = self.search(body).await?;
        Ok(!response.list.entries.is_empty())
    }

    async fn get_node(&self, node_id: &NodeId) -> Result<NodeInfo> {
        let node: EntryResponse<NodePayload> = self
            .request(Method::GET, self.node_url(&format!("/{node_id}")))
            .send()
            .await
            .context("Failed to fetch node")?
            .error_for_status()
            .context("Node fetch returned error status")?
            .json()
            .await
            .context("Failed to parse node response")?;
        self.node_info(node.entry)
    }

    async fn list_documents(
        &self,
        folder_id: &NodeId,
        skip: u32,
        max_items: u32,
    ) -> Result<DocumentPage> {
        let body = json!({
            "query": {
                "language": "afts",
                "query": format!("ANCESTOR:\"{STORE_PREFIX}{folder_id}\" AND TYPE:\"cm:content\""),
            },
            "sort": [{ "type": "FIELD", "field": "cm:modified", "ascending": true }],
            "paging": { "skipCount": skip, "maxItems": max_items },
        });
        let response = self.search(body).await?;

        let has_more = response
            .list
            .pagination
            .as_ref()
            .and_then(|p| p.has_more_items)
            .unwrap_or(false);
        let mut items = Vec::with_capacity(response.list.entries.len());
        for entry in response.list.entries {
            let modified_at = entry
                .entry
                .modified_at
                .context("document entry is missing its modification time")?;
            items.push(DocumentSummary {
                id: NodeId::new(&entry.entry.id)?,
                name: entry.entry.name,
                modified_at,
            });
        }
        Ok(DocumentPage { items, has_more })
    }

    async fn latest_modification(
        &self,
        folder_id: &NodeId,
    ) -> Result<Option<DateTime<Utc>>> {
        let body = json!({
            "query": {
                "language": "afts",
                "query": format!("ANCESTOR:\"{STORE_PREFIX}{folder_id}\" AND TYPE:\"cm:content\""),
            },
            "sort": [{ "type": "FIELD", "field": "cm:modified", "ascending": false }],
            "paging": { "maxItems": 1 },
        });
        let response = self.search(body).await?;
        Ok(response
            .list
            .entries
            .first()
            .and_then(|entry| entry.entry.modified_at))
    }

    async fn download_text(&self, node_id: &NodeId) -> Result<String> {
        self.request(Method::GET, self.node_url(&format!("/{node_id}/content")))
            .send()
            .await
            .context("Failed to download content")?
            .error_for_status()
            .context("Content download returned error status")?
            .text()
            .await
            .context("Failed to read content body")
    }

    async fn ensure_child_folder(&self, parent_id: &NodeId, name: &str) -> Result<NodeId> {
        let id = match self.find_child_folder(parent_id.as_str(), name).await? {
            Some(id) => id,
            None => self.create_child_folder(parent_id.as_str(), name).await?,
        };
        Ok(NodeId::new(id)?)
    }

    async fn rename_node(&self, node_id: &NodeId, new_name: &str) -> Result<()> {
        self.update_node(node_id, json!({ "name": new_name })).await
    }

    async fn set_title(&self, node_id: &NodeId, title: &str) -> Result<()> {
        self.update_node(node_id, json!({ "properties": { "cm:title": title } }))
            .await
    }

    async fn set_description(&self, node_id: &NodeId, description: &str) -> Result<()> {
        self.update_node(
            node_id,
            json!({ "properties": { "cm:description": description } }),
        )
        .await
    }

    async fn set_properties(
        &self,
        node_id: &NodeId,
        properties: &HashMap<String, String>,
    ) -> Result<()> {
        self.update_node(node_id, json!({ "properties": properties }))
            .await
    }

    async fn move_node(&self, node_id: &NodeId, target_folder: &NodeId) -> Result<()> {
        self.request(Method::POST, self.node_url(&format!("/{node_id}/move")))
            .json(&json!({ "targetParentId": target_folder.as_str() }))
            .send()
            .await
            .context("Failed to move node")?
            .error_for_status()
            .context("Node move returned error status")?;
        debug!(node_id = %node_id, target = %target_folder, "Node moved");
        Ok(())
    }

    async fn add_tags(&self, node_id: &NodeId, tags: &[String]) -> Result<()> {
        for tag in tags {
            self.request(Method::POST, self.node_url(&format!("/{node_id}/tags")))
                .json(&json!({ "tag": tag }))
                .send()
                .await
                .context("Failed to add tag")?
                .error_for_status()
                .context("Tag creation returned error status")?;
        }
        debug!(node_id = %node_id, count = tags.len(), "Tags applied");
        Ok(())
    }

    async fn set_public_access(&self, node_id: &NodeId, allowed: bool) -> Result<()> {
        let node: EntryResponse<NodePayload> = self
            .request(Method::GET, self.node_url(&format!("/{node_id}")))
            .query(&[("include", "permissions")])
            .send()
            .await
            .context("Failed to fetch node permissions")?
            .error_for_status()
            .context("Permission fetch returned error status")?
            .json()
            .await
            .context("Failed to parse node permissions")?;

        // Keep everything except GROUP_EVERYONE, then re-add it as a
        // Consumer only when the document is publicly allowed
        let mut locally_set: Vec<PermissionElement> = node
            .entry
            .permissions
            .and_then(|p| p.locally_set)
            .unwrap_or_default()
            .into_iter()
            .filter(|element| element.authority_id != "GROUP_EVERYONE")
            .collect();
        if allowed {
            locally_set.push(PermissionElement {
                authority_id: "GROUP_EVERYONE".to_string(),
                name: "Consumer".to_string(),
                access_status: "ALLOWED".to_string(),
            });
        }

        self.update_node(
            node_id,
            json!({
                "permissions": {
                    "isInheritanceEnabled": false,
                    "locallySet": locally_set,
                }
            }),
        )
        .await?;
        debug!(node_id = %node_id, allowed, "Public access updated");
        Ok(())
    }

    async fn install_ingestion_rule(
        &self,
        folder_id: &NodeId,
        aspect: &AspectName,
    ) -> Result<()> {
        let url = Url::parse_with_params(
            &format!("{}{}", self.base_url, RULE_WEBSCRIPT),
            &[("nodeId", folder_id.as_str()), ("aspectId", aspect.as_str())],
        )
        .context("Failed to build rule webscript URL")?;
        self.request(Method::POST, url)
            .send()
            .await
            .context("Failed to invoke rule webscript")?
            .error_for_status()
            .context("Rule webscript returned error status")?;
        info!(folder_id = %folder_id, aspect = %aspect, "Ingestion rule installed");
        Ok(())
    }

    async fn stamp_sync_times(
        &self,
        folder_id: &NodeId,
        published_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut properties = serde_json::Map::new();
        properties.insert(
            self.updated_property.clone(),
            Value::String(updated_at.to_rfc3339()),
        );
        if let Some(published) = published_at {
            properties.insert(
                self.published_property.clone(),
                Value::String(published.to_rfc3339()),
            );
        }
        self.update_node(folder_id, json!({ "properties": properties }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_base_url() {
        let config = Config::default();
        assert!(RepositoryClient::with_base_url("not a url", &config).is_err());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = Config::default();
        let client =
            RepositoryClient::with_base_url("http://localhost:8080/", &config).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_node_payload_string_properties() {
        let payload: NodePayload = serde_json::from_str(
            r#"{
                "id": "n1",
                "name": "Reports",
                "isFolder": true,
                "properties": {
                    "ai:updatedTime": "2026-08-01T12:00:00Z",
                    "cm:likes": 3
                }
            }"#,
        )
        .unwrap();
        let props = payload.string_properties();
        assert_eq!(
            props.get("ai:updatedTime").map(String::as_str),
            Some("2026-08-01T12:00:00Z")
        );
        // Non-string values are dropped
        assert!(!props.contains_key("cm:likes"));
    }

    #[test]
    fn test_logical_path_from_search_entry() {
        let config = Config::default();
        let client =
            RepositoryClient::with_base_url("http://localhost:8080", &config).unwrap();
        let payload: NodePayload = serde_json::from_str(
            r#"{
                "id": "n1",
                "name": "Reports",
                "path": { "name": "/Company Home/Knowledge Base" }
            }"#,
        )
        .unwrap();
        let path = client.logical_path(&payload).unwrap();
        assert_eq!(path.as_str(), "Company Home|Knowledge Base|Reports");
    }

    #[test]
    fn test_logical_path_requires_configured_root() {
        let config = Config::default();
        let client =
            RepositoryClient::with_base_url("http://localhost:8080", &config).unwrap();
        let payload: NodePayload = serde_json::from_str(
            r#"{
                "id": "n1",
                "name": "Reports",
                "path": { "name": "/Elsewhere" }
            }"#,
        )
        .unwrap();
        assert!(client.logical_path(&payload).is_err());
    }
}
