//! kbsync core: domain model, configuration, and port definitions.
//!
//! This crate contains no I/O. It defines:
//! - The domain model (node events, folder sync records, tag analysis)
//! - Typed configuration loaded from YAML
//! - Port traits implemented by adapter crates (repository, AI service)

pub mod config;
pub mod domain;
pub mod ports;
