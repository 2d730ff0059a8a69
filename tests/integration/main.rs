//! Integration tests for the crawler
//!
//! Orchestration is exercised against the in-memory stub renderer; the HTTP
//! renderer is exercised end-to-end against wiremock servers.

mod http_renderer_tests;
mod orchestrator_tests;
