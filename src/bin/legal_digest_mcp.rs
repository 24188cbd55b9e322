//! MCP server entrypoint (stdio transport).
//!
//! Exposes the summarization pipeline as MCP tools and resources over stdio so editor and agent
//! integrations can condense documents without the HTTP server. Logs go to stderr because stdout
//! carries the protocol.
use anyhow::{Context, Result};
use legal_digest::{
    config, inference,
    logging::{self, ConsoleTarget},
    mcp::LegalDigestMcpServer,
    processing::SummarizationService,
};
use rmcp::{service::ServiceExt, transport::stdio};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing_with(ConsoleTarget::Stderr);
    let config = config::get_config();

    let client = inference::build_inference_client(config)
        .context("failed to construct summarization backend")?;
    let summarization = Arc::new(SummarizationService::new(
        client,
        config.pipeline_settings(),
    ));
    let server = LegalDigestMcpServer::new(summarization.clone());

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server over stdio")?;

    service
        .waiting()
        .await
        .context("MCP server terminated unexpectedly")?;

    if let Err(error) = summarization.shutdown().await {
        tracing::warn!(%error, "Summarization engine shutdown failed");
    }
    Ok(())
}
