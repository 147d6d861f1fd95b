//! Shared helpers for adapter integration tests

use kbsync_core::config::Config;
use kbsync_core::domain::newtypes::NodeId;
use kbsync_repo::{AiServiceClient, RepositoryClient};
use wiremock::MockServer;

/// Core nodes API prefix used by the repository client
pub const NODES_API: &str = "/alfresco/api/-default-/public/alfresco/versions/1/nodes";

/// Search API path used by the repository client
pub const SEARCH_API: &str = "/alfresco/api/-default-/public/search/versions/1/search";

pub fn node_id(s: &str) -> NodeId {
    NodeId::new(s).unwrap()
}

pub fn nodes_path(suffix: &str) -> String {
    format!("{NODES_API}{suffix}")
}

/// Starts a mock server and a repository client pointed at it
pub async fn repository_client() -> (MockServer, RepositoryClient) {
    let server = MockServer::start().await;
    let client = RepositoryClient::with_base_url(server.uri(), &Config::default()).unwrap();
    (server, client)
}

/// Starts a mock server and an AI client pointed at it
pub async fn ai_client() -> (MockServer, AiServiceClient) {
    let server = MockServer::start().await;
    let client = AiServiceClient::with_base_url(server.uri()).unwrap();
    (server, client)
}

/// Builds a one-entry search response body
pub fn search_entries(entries: Vec<serde_json::Value>, has_more: bool) -> serde_json::Value {
    serde_json::json!({
        "list": {
            "pagination": { "hasMoreItems": has_more },
            "entries": entries.into_iter()
                .map(|entry| serde_json::json!({ "entry": entry }))
                .collect::<Vec<_>>(),
        }
    })
}
