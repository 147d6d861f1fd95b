//! HTTP adapters for kbsync's outbound ports
//!
//! Two reqwest-based clients live here:
//!
//! - [`client::RepositoryClient`] implements the content repository port
//!   against an Alfresco-style REST API (node CRUD, AFTS search, webscript
//!   rule install).
//! - [`ai::AiServiceClient`] implements the AI-service port (multipart
//!   ingestion, tagging analysis, deletion).
//!
//! Both clients authenticate per request and surface failures as
//! `anyhow::Error` with request context attached; the engine maps them onto
//! its own error type at the call site.

pub mod ai;
pub mod client;

pub use ai::AiServiceClient;
pub use client::RepositoryClient;
