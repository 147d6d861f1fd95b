//! AI service port (driven/secondary port)
//!
//! Interface to the external AI stack: document ingestion into the vector
//! index and tagging analysis. The tagging endpoint returns a raw JSON
//! payload on purpose; interpreting scores against thresholds is engine
//! logic, not adapter logic.

use serde_json::Value;

use crate::domain::newtypes::NodeId;

/// Port trait for AI index and tagging operations
#[async_trait::async_trait]
pub trait IAiService: Send + Sync {
    /// Uploads one document (or document chunk) into the AI index
    ///
    /// # Arguments
    /// * `document_id` - Repository node the content belongs to
    /// * `remote_name` - Name the index should store the part under; chunked
    ///   documents upload each part under a distinct name
    /// * `text` - Plain-text content of the part
    async fn ingest(&self, document_id: &NodeId, remote_name: &str, text: &str)
        -> anyhow::Result<()>;

    /// Requests a tagging analysis for the given text
    ///
    /// # Arguments
    /// * `candidate_tags` - Labels the classifier may choose from
    ///
    /// # Returns
    /// The service's raw JSON payload. Expected shape: a `data` object with
    /// `classification` (main label), `classification_multi` (labels and
    /// scores), `classification_public` (public score), and an optional
    /// `error` string, but the engine validates this rather than the adapter.
    async fn analyze(&self, text: &str, candidate_tags: &[String]) -> anyhow::Result<Value>;

    /// Removes all indexed parts of a document from the AI index
    async fn remove_document(&self, document_id: &NodeId) -> anyhow::Result<()>;

    /// Removes every indexed document that lives under the given folder
    async fn remove_folder(&self, folder_id: &NodeId) -> anyhow::Result<()>;
}
