//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the engine core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRepositoryClient`] - Content repository operations (folders, documents, tags)
//! - [`IAiService`] - AI index ingestion and tagging analysis

pub mod ai_service;
pub mod repository;

pub use ai_service::IAiService;
pub use repository::{DocumentPage, DocumentSummary, FolderInfo, IRepositoryClient, NodeInfo};
