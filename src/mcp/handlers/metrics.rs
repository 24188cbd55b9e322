//! Handler for the metrics tool.

use std::sync::Arc;

use crate::processing::SummarizationService;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde_json::json;

/// Handle the `metrics` tool, returning the current summarization counters.
pub(crate) async fn handle_metrics(
    service: &Arc<SummarizationService>,
) -> Result<CallToolResult, McpError> {
    let snapshot = service.metrics_snapshot();
    Ok(CallToolResult::structured(json!({
        "jobsCompleted": snapshot.jobs_completed,
        "jobsFailed": snapshot.jobs_failed,
        "chunksProcessed": snapshot.chunks_processed,
        "chunksFailed": snapshot.chunks_failed,
        "memoryRejections": snapshot.memory_rejections,
        "lastChunkCount": snapshot.last_chunk_count,
    })))
}
