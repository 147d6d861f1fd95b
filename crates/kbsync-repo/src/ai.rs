//! AI service REST client
//!
//! Implements [`IAiService`] against the ingestion/tagging service:
//! documents upload as multipart forms, tagging requests carry the
//! candidate tag list as repeated form fields, deletions go through query
//! parameters. Tagging responses may arrive wrapped in a chat-completions
//! envelope whose message content is the stringified payload; this adapter
//! unwraps the envelope so the engine only ever sees the payload itself.

use anyhow::{Context, Result};
use kbsync_core::config::Config;
use kbsync_core::domain::newtypes::NodeId;
use kbsync_core::ports::ai_service::IAiService;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

const DOCUMENTS_ENDPOINT: &str = "/documents";
const FOLDERS_ENDPOINT: &str = "/folders";
const TAGS_ENDPOINT: &str = "/tags";

/// Reqwest-backed implementation of the AI service port
pub struct AiServiceClient {
    client: Client,
    base_url: String,
}

impl AiServiceClient {
    /// Creates a client from the AI section of the configuration
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(config.ai.base_url.clone())
    }

    /// Creates a client pointing at a custom base URL (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        Url::parse(&base_url).context("invalid AI service base URL")?;
        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Extracts the tagging payload from a raw response body
///
/// Accepts either the bare payload or a chat-completions envelope where
/// `choices[0].message.content` holds the payload as a JSON string.
fn parse_payload(body: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(body).context("AI tagging response is not valid JSON")?;
    if let Some(content) = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    {
        return serde_json::from_str(content)
            .context("embedded tagging payload is not valid JSON");
    }
    Ok(value)
}

#[async_trait::async_trait]
impl IAiService for AiServiceClient {
    async fn ingest(&self, node_id: &NodeId, remote_name: &str, text: &str) -> Result<()> {
        let form = Form::new()
            .text("documentId", node_id.to_string())
            .text("fileName", remote_name.to_string())
            .part(
                "file",
                Part::bytes(text.as_bytes().to_vec()).file_name(remote_name.to_string()),
            );
        self.client
            .post(self.endpoint(DOCUMENTS_ENDPOINT))
            .multipart(form)
            .send()
            .await
            .context("Failed to send document upload")?
            .error_for_status()
            .context("Document upload returned error status")?;
        debug!(node_id = %node_id, name = remote_name, "Document ingested");
        Ok(())
    }

    async fn analyze(&self, text: &str, candidate_tags: &[String]) -> Result<Value> {
        let mut form = Form::new().part(
            "file",
            Part::bytes(text.as_bytes().to_vec()).file_name("document.txt"),
        );
        for tag in candidate_tags {
            form = form.text("candidateTags", tag.clone());
        }
        let body = self
            .client
            .post(self.endpoint(TAGS_ENDPOINT))
            .multipart(form)
            .send()
            .await
            .context("Failed to send tagging request")?
            .error_for_status()
            .context("Tagging request returned error status")?
            .text()
            .await
            .context("Failed to read tagging response")?;
        parse_payload(&body)
    }

    async fn remove_document(&self, node_id: &NodeId) -> Result<()> {
        let url = Url::parse_with_params(
            &self.endpoint(DOCUMENTS_ENDPOINT),
            &[("documentId", node_id.as_str())],
        )
        .context("Failed to build document delete URL")?;
        self.client
            .delete(url)
            .send()
            .await
            .context("Failed to send document delete")?
            .error_for_status()
            .context("Document delete returned error status")?;
        debug!(node_id = %node_id, "Document removed from index");
        Ok(())
    }

    async fn remove_folder(&self, node_id: &NodeId) -> Result<()> {
        let url = Url::parse_with_params(
            &self.endpoint(FOLDERS_ENDPOINT),
            &[("folderId", node_id.as_str())],
        )
        .context("Failed to build folder delete URL")?;
        self.client
            .delete(url)
            .send()
            .await
            .context("Failed to send folder delete")?
            .error_for_status()
            .context("Folder delete returned error status")?;
        debug!(folder_id = %node_id, "Folder documents removed from index");
        Ok(())
    }
}
