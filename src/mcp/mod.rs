//! Model Context Protocol (MCP) integration for Legal Digest.
//!
//! This module wires the summarization service into an MCP server so editors and agent hosts can
//! condense documents over stdio. The surface area consists of:
//!
//! - Tools: `summarize` and `metrics`.
//! - Resources: `mcp://health`, `mcp://settings`, and `mcp://usage`.
//!
//! Handlers, schemas, and formatting helpers are kept in focused submodules to make tests and
//! reviews small and targeted.

mod format;
pub mod handlers;
mod registry;
mod schemas;
mod server;

pub use server::LegalDigestMcpServer;
