//! In-memory port implementations for engine tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use kbsync_core::domain::newtypes::{AspectName, FolderPath, NodeId};
use kbsync_core::ports::ai_service::IAiService;
use kbsync_core::ports::repository::{
    DocumentPage, DocumentSummary, FolderInfo, IRepositoryClient, NodeInfo,
};
use serde_json::{json, Value};

pub fn node_id(s: &str) -> NodeId {
    NodeId::new(s).unwrap()
}

/// Scriptable in-memory repository double
///
/// Mutations append human-readable entries to `calls` so tests can assert
/// on exact operation sequences.
#[derive(Default)]
pub struct MockRepository {
    scope_script: Mutex<VecDeque<anyhow::Result<Vec<String>>>>,
    nodes: Mutex<HashMap<NodeId, NodeInfo>>,
    texts: Mutex<HashMap<NodeId, String>>,
    documents: Mutex<HashMap<NodeId, Vec<DocumentSummary>>>,
    paths: Mutex<HashMap<String, NodeId>>,
    unindexed: Mutex<HashSet<NodeId>>,
    fail_download: Mutex<HashSet<NodeId>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next result of `find_folders_with_aspect`; once the
    /// script is exhausted the scope query returns empty
    pub fn script_scope(&self, result: anyhow::Result<Vec<&str>>) {
        self.scope_script
            .lock()
            .unwrap()
            .push_back(result.map(|ids| ids.into_iter().map(String::from).collect()));
    }

    pub fn add_node(&self, id: &str, name: &str, is_folder: bool) {
        self.add_node_with_properties(id, name, is_folder, HashMap::new());
    }

    pub fn add_node_with_properties(
        &self,
        id: &str,
        name: &str,
        is_folder: bool,
        properties: HashMap<String, String>,
    ) {
        self.nodes.lock().unwrap().insert(
            node_id(id),
            NodeInfo {
                id: node_id(id),
                name: name.to_string(),
                is_folder,
                parent_id: None,
                properties,
                aspects: Vec::new(),
            },
        );
    }

    pub fn set_text(&self, id: &str, text: &str) {
        self.texts.lock().unwrap().insert(node_id(id), text.to_string());
    }

    pub fn fail_download_for(&self, id: &str) {
        self.fail_download.lock().unwrap().insert(node_id(id));
    }

    pub fn add_document(&self, folder: &str, id: &str, name: &str, modified: DateTime<Utc>) {
        self.documents
            .lock()
            .unwrap()
            .entry(node_id(folder))
            .or_default()
            .push(DocumentSummary {
                id: node_id(id),
                name: name.to_string(),
                modified_at: modified,
            });
    }

    pub fn register_path(&self, path: &str, id: &str) {
        self.paths
            .lock()
            .unwrap()
            .insert(path.to_string(), node_id(id));
    }

    /// Marks a node as not yet visible to searches
    pub fn mark_unindexed(&self, id: &str) {
        self.unindexed.lock().unwrap().insert(node_id(id));
    }

    pub fn mark_indexed(&self, id: &str) {
        self.unindexed.lock().unwrap().remove(&node_id(id));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl IRepositoryClient for MockRepository {
    async fn find_folders_with_aspect(
        &self,
        aspect: &AspectName,
    ) -> anyhow::Result<Vec<FolderInfo>> {
        let next = self.scope_script.lock().unwrap().pop_front();
        let ids = match next {
            Some(result) => result?,
            None => Vec::new(),
        };
        let nodes = self.nodes.lock().unwrap();
        Ok(ids
            .into_iter()
            .map(|id| {
                let id = node_id(&id);
                let name = nodes
                    .get(&id)
                    .map(|n| n.name.clone())
                    .unwrap_or_else(|| id.as_str().to_string());
                FolderInfo {
                    id,
                    name,
                    path: FolderPath::rooted_at(format!("Company Home|{aspect}"), "Company Home")
                        .unwrap(),
                    properties: HashMap::new(),
                }
            })
            .collect())
    }

    async fn resolve_path(&self, path: &FolderPath) -> anyhow::Result<Option<NodeId>> {
        Ok(self.paths.lock().unwrap().get(path.as_str()).cloned())
    }

    async fn create_folder_path(&self, path: &FolderPath) -> anyhow::Result<NodeId> {
        self.record(format!("create_path:{path}"));
        let id = node_id(&format!("created:{path}"));
        self.paths
            .lock()
            .unwrap()
            .insert(path.as_str().to_string(), id.clone());
        Ok(id)
    }

    async fn is_indexed(&self, id: &NodeId) -> anyhow::Result<bool> {
        Ok(!self.unindexed.lock().unwrap().contains(id))
    }

    async fn get_node(&self, id: &NodeId) -> anyhow::Result<NodeInfo> {
        self.nodes
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("node not found: {id}"))
    }

    async fn list_documents(
        &self,
        folder_id: &NodeId,
        skip: u32,
        max_items: u32,
    ) -> anyhow::Result<DocumentPage> {
        let docs = self.documents.lock().unwrap();
        let all = docs.get(folder_id).cloned().unwrap_or_default();
        let items: Vec<DocumentSummary> = all
            .iter()
            .skip(skip as usize)
            .take(max_items as usize)
            .cloned()
            .collect();
        let has_more = (skip as usize + items.len()) < all.len();
        Ok(DocumentPage { items, has_more })
    }

    async fn latest_modification(
        &self,
        folder_id: &NodeId,
    ) -> anyhow::Result<Option<DateTime<Utc>>> {
        let docs = self.documents.lock().unwrap();
        Ok(docs
            .get(folder_id)
            .and_then(|d| d.iter().map(|doc| doc.modified_at).max()))
    }

    async fn download_text(&self, id: &NodeId) -> anyhow::Result<String> {
        if self.fail_download.lock().unwrap().contains(id) {
            anyhow::bail!("download failed: {id}");
        }
        self.texts
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no content: {id}"))
    }

    async fn ensure_child_folder(&self, parent: &NodeId, name: &str) -> anyhow::Result<NodeId> {
        self.record(format!("ensure_child:{parent}/{name}"));
        Ok(node_id(&format!("{parent}/{name}")))
    }

    async fn rename_node(&self, id: &NodeId, new_name: &str) -> anyhow::Result<()> {
        self.record(format!("rename:{id}:{new_name}"));
        Ok(())
    }

    async fn set_title(&self, id: &NodeId, title: &str) -> anyhow::Result<()> {
        self.record(format!("title:{id}:{title}"));
        Ok(())
    }

    async fn set_description(&self, id: &NodeId, description: &str) -> anyhow::Result<()> {
        self.record(format!("description:{id}:{description}"));
        Ok(())
    }

    async fn set_properties(
        &self,
        id: &NodeId,
        properties: &HashMap<String, String>,
    ) -> anyhow::Result<()> {
        let mut keys: Vec<&String> = properties.keys().collect();
        keys.sort();
        self.record(format!(
            "properties:{id}:{}",
            keys.into_iter().cloned().collect::<Vec<_>>().join(",")
        ));
        Ok(())
    }

    async fn move_node(&self, id: &NodeId, target: &NodeId) -> anyhow::Result<()> {
        self.record(format!("move:{id}->{target}"));
        Ok(())
    }

    async fn add_tags(&self, id: &NodeId, tags: &[String]) -> anyhow::Result<()> {
        self.record(format!("tags:{id}:{}", tags.join(",")));
        Ok(())
    }

    async fn set_public_access(&self, id: &NodeId, allowed: bool) -> anyhow::Result<()> {
        self.record(format!("public:{id}:{allowed}"));
        Ok(())
    }

    async fn install_ingestion_rule(
        &self,
        folder_id: &NodeId,
        aspect: &AspectName,
    ) -> anyhow::Result<()> {
        self.record(format!("rule:{folder_id}:{aspect}"));
        Ok(())
    }

    async fn stamp_sync_times(
        &self,
        folder_id: &NodeId,
        published_at: Option<DateTime<Utc>>,
        _updated_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.record(format!("stamp:{folder_id}:published={}", published_at.is_some()));
        Ok(())
    }
}

/// Recording in-memory AI service double
#[derive(Default)]
pub struct MockAiService {
    analysis: Mutex<Option<Value>>,
    fail_ingest: Mutex<HashSet<NodeId>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockAiService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_analysis(&self, payload: Value) {
        *self.analysis.lock().unwrap() = Some(payload);
    }

    pub fn fail_ingest_for(&self, id: &str) {
        self.fail_ingest.lock().unwrap().insert(node_id(id));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Builds a well-formed classification payload for tests
pub fn analysis_payload(main: &str, labels: &[(&str, f64)], public_score: f64) -> Value {
    json!({
        "data": {
            "classification": { "labels": [main] },
            "classification_multi": {
                "labels": labels.iter().map(|(l, _)| *l).collect::<Vec<_>>(),
                "scores": labels.iter().map(|(_, s)| *s).collect::<Vec<_>>(),
            },
            "classification_public": { "scores": [public_score] },
            "error": null,
        }
    })
}

#[async_trait::async_trait]
impl IAiService for MockAiService {
    async fn ingest(&self, id: &NodeId, remote_name: &str, _text: &str) -> anyhow::Result<()> {
        if self.fail_ingest.lock().unwrap().contains(id) {
            anyhow::bail!("ingest failed: {id}");
        }
        self.record(format!("ingest:{id}:{remote_name}"));
        Ok(())
    }

    async fn analyze(&self, _text: &str, _candidate_tags: &[String]) -> anyhow::Result<Value> {
        self.record("analyze".to_string());
        Ok(self
            .analysis
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| analysis_payload("Report", &[("Report", 0.95)], 0.7)))
    }

    async fn remove_document(&self, id: &NodeId) -> anyhow::Result<()> {
        self.record(format!("remove:{id}"));
        Ok(())
    }

    async fn remove_folder(&self, id: &NodeId) -> anyhow::Result<()> {
        self.record(format!("remove_folder:{id}"));
        Ok(())
    }
}
