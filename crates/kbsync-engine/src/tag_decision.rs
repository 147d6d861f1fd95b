//! Tagging decision logic
//!
//! Turns the raw classification payload returned by the AI pipeline into a
//! [`TagAnalysis`]. The payload carries three sections under `data`:
//!
//! - `classification` - single-label primary tag
//! - `classification_multi` - parallel label/score arrays
//! - `classification_public` - public-disclosure confidence score
//!
//! plus an optional `error` string. Thresholds are fractions derived from
//! configured percentages. A multi-label score must *exceed* the taggable
//! threshold (strict); the public score must *reach* the public threshold
//! (non-strict). The main tag is force-added if the filter excluded it, so
//! `main_tag ∈ tags` always holds. Missing or malformed fields are hard
//! parse failures, never soft defaults.

use kbsync_core::domain::tagging::TagAnalysis;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors raised while interpreting a classification payload
#[derive(Debug, Error)]
pub enum TagParseError {
    /// A required field is absent
    #[error("classification payload is missing `{field}`")]
    MissingField { field: &'static str },

    /// A field is present but has the wrong shape
    #[error("classification payload field `{field}` is malformed: {reason}")]
    MalformedField {
        field: &'static str,
        reason: String,
    },
}

/// Applies thresholds to classification payloads
#[derive(Debug, Clone)]
pub struct TagDecisionEngine {
    /// Strict lower bound a multi-label score must exceed (fraction)
    taggable_threshold: f64,
    /// Non-strict lower bound for the public score (fraction)
    publicly_allowed_threshold: f64,
}

impl TagDecisionEngine {
    /// Creates an engine from configured percentages (0-100)
    pub fn from_percentages(taggable_percent: u8, publicly_allowed_percent: u8) -> Self {
        Self {
            taggable_threshold: f64::from(taggable_percent) / 100.0,
            publicly_allowed_threshold: f64::from(publicly_allowed_percent) / 100.0,
        }
    }

    /// Interprets one classification payload
    pub fn decide(&self, payload: &Value) -> Result<TagAnalysis, TagParseError> {
        let data = payload
            .get("data")
            .ok_or(TagParseError::MissingField { field: "data" })?;

        let main_tag = data
            .pointer("/classification/labels/0")
            .and_then(Value::as_str)
            .ok_or(TagParseError::MissingField {
                field: "classification.labels[0]",
            })?
            .to_string();

        let labels = as_array(data, "/classification_multi/labels", "classification_multi.labels")?;
        let scores = as_array(data, "/classification_multi/scores", "classification_multi.scores")?;

        let mut tags = Vec::new();
        for (label, score) in labels.iter().zip(scores.iter()) {
            let label = label.as_str().ok_or_else(|| TagParseError::MalformedField {
                field: "classification_multi.labels",
                reason: "label is not a string".to_string(),
            })?;
            let score = score.as_f64().ok_or_else(|| TagParseError::MalformedField {
                field: "classification_multi.scores",
                reason: "score is not a number".to_string(),
            })?;
            if score > self.taggable_threshold {
                debug!(label, score, threshold = self.taggable_threshold, "Label kept");
                tags.push(label.to_string());
            }
        }
        if !tags.contains(&main_tag) {
            tags.push(main_tag.clone());
        }

        let public_score = data
            .pointer("/classification_public/scores/0")
            .and_then(Value::as_f64)
            .ok_or(TagParseError::MissingField {
                field: "classification_public.scores[0]",
            })?;
        let publicly_allowed = public_score >= self.publicly_allowed_threshold;

        let error_message = match data.get("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(msg)) => Some(msg.clone()),
            Some(other) => Some(other.to_string()),
        };

        Ok(TagAnalysis {
            tags,
            main_tag,
            publicly_allowed,
            error_message,
        })
    }
}

fn as_array<'a>(
    data: &'a Value,
    pointer: &str,
    field: &'static str,
) -> Result<&'a Vec<Value>, TagParseError> {
    data.pointer(pointer)
        .ok_or(TagParseError::MissingField { field })?
        .as_array()
        .ok_or_else(|| TagParseError::MalformedField {
            field,
            reason: "expected an array".to_string(),
        })
}
