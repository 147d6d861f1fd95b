//! Domain model for kbsync
//!
//! Pure data types and invariants, free of I/O:
//! - [`newtypes`] - Validated identifier and path wrappers
//! - [`event`] - Repository node events delivered to the engine
//! - [`folder_record`] - Per-folder sync bookkeeping and staleness
//! - [`tagging`] - AI tagging analysis results
//! - [`naming`] - File name marker and QName decoding helpers
//! - [`errors`] - Domain error types

pub mod errors;
pub mod event;
pub mod folder_record;
pub mod naming;
pub mod newtypes;
pub mod tagging;
