#![deny(missing_docs)]

//! Core library for the Legal Digest summarization server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// PDF and plain-text document extraction.
pub mod extraction;
/// Text-generation engine abstraction and backends.
pub mod inference;
/// Structured logging and tracing setup.
pub mod logging;
/// Model Context Protocol server implementation.
pub mod mcp;
/// Summarization metrics helpers.
pub mod metrics;
/// Chunking, batching, and aggregation pipeline.
pub mod processing;
