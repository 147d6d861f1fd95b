//! AI tagging analysis results

use serde::{Deserialize, Serialize};

/// Outcome of an AI-based document tagging analysis
///
/// `tags` preserves the order in which labels passed the threshold filter,
/// with the main tag appended last if the filter excluded it. The invariant
/// `tags.contains(&main_tag)` always holds for values produced by the
/// decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAnalysis {
    /// All tags assigned to the document, main tag included
    pub tags: Vec<String>,
    /// The primary classification label
    pub main_tag: String,
    /// Whether the content is suitable for public disclosure
    pub publicly_allowed: bool,
    /// Error reported by the tagging pipeline, if any
    pub error_message: Option<String>,
}
