//! kbsync engine - event-driven AI index synchronization
//!
//! Keeps an external AI index aligned with a mutable, hierarchical content
//! repository: documents are uploaded, removed, and re-tagged as repository
//! events occur, folders dynamically enter and leave the synchronized scope,
//! and a bulk catch-up pass runs at startup before any live event is applied.
//!
//! ## Modules
//!
//! - [`queue`] - Deferred event queue used while bootstrap is incomplete
//! - [`registry`] - Folder scope registries (content sync, tagging pipeline)
//! - [`watchdog`] - Initialization/retry state machine per handler role
//! - [`chunker`] - Oversized-document splitting
//! - [`tag_decision`] - Classification payload → tagging decision
//! - [`handlers`] - Per-role event handlers
//! - [`dispatcher`] - Event routing and bootstrap gating
//! - [`ops`] - Shared sync operations against the repository and AI ports
//! - [`bootstrap`] - Startup catch-up coordinator

pub mod bootstrap;
pub mod chunker;
pub mod dispatcher;
pub mod handlers;
pub mod ops;
pub mod queue;
pub mod registry;
pub mod tag_decision;
pub mod watchdog;

#[cfg(test)]
pub(crate) mod testutil;

use kbsync_core::domain::errors::DomainError;
use thiserror::Error;

use crate::handlers::HandlerRole;
use crate::tag_decision::TagParseError;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// A domain invariant was violated
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A classification payload could not be interpreted
    #[error(transparent)]
    TagParse(#[from] TagParseError),

    /// A handler was asked to read its scope registry before initialization
    #[error("{role} scope registry is not initialized")]
    RegistryUninitialized {
        /// Handler role whose registry was read too early
        role: HandlerRole,
    },

    /// Folder scope resolution hit a hard repository error
    ///
    /// Unlike an empty result, a hard error is a misconfiguration and is
    /// never retried.
    #[error("{role} scope resolution failed: {source}")]
    InitializationFailed {
        role: HandlerRole,
        #[source]
        source: anyhow::Error,
    },

    /// A repository call failed
    #[error("repository operation failed: {0}")]
    Repository(#[source] anyhow::Error),

    /// An AI service call failed
    #[error("AI service operation failed: {0}")]
    AiService(#[source] anyhow::Error),

    /// A newly created folder never became visible to repository searches
    #[error("folder {path} not searchable after {timeout_secs}s")]
    IndexingTimeout { path: String, timeout_secs: u64 },

    /// No handler is registered for the requested role
    #[error("no handler registered for role {role}")]
    UnknownHandler { role: HandlerRole },
}
