//! Integration tests for the HTTP adapters
//!
//! All tests run against a wiremock server; no real repository or AI
//! service is contacted.

mod common;
mod test_ai;
mod test_repository;
