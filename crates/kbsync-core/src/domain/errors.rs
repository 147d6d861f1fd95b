//! Domain error types
//!
//! Errors raised by domain validation and invariant checks. Engine-level
//! failures (queue, dispatch, bootstrap) live in the engine crate.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid node identifier format
    #[error("Invalid node ID: {0}")]
    InvalidNodeId(String),

    /// Invalid aspect name (must be a prefixed QName like `ai:synced`)
    #[error("Invalid aspect name: {0}")]
    InvalidAspectName(String),

    /// Invalid logical folder path
    #[error("Invalid folder path: {0}")]
    InvalidFolderPath(String),

    /// A logical path did not start at the repository root segment
    #[error("Folder path must start at '{root}': {path}")]
    PathNotRooted {
        /// Expected root segment
        root: String,
        /// The offending path
        path: String,
    },

    /// An event carried the wrong resource type for the receiving handler
    #[error("Malformed event for node {node_id}: {reason}")]
    MalformedEvent {
        /// Node the event referred to
        node_id: String,
        /// Why the event was rejected
        reason: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
