//! Handler for the `summarize` MCP tool.

use std::sync::Arc;

use crate::{
    inference::MAX_GENERATION_LENGTH,
    mcp::handlers::parse_arguments,
    processing::{JobControls, SummarizationService, SummarizeError, SummarizeOptions},
};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;
use serde_json::json;

/// Request payload accepted by the `summarize` tool.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SummarizeToolRequest {
    /// Raw document text to condense.
    pub(crate) text: String,
    /// Optional per-chunk maximum summary length.
    #[serde(default)]
    pub(crate) max_length: Option<usize>,
    /// Optional per-chunk minimum summary length.
    #[serde(default)]
    pub(crate) min_length: Option<usize>,
}

/// Handle the `summarize` tool by running a full summarization job over the supplied text.
pub(crate) async fn handle_summarize(
    service: &Arc<SummarizationService>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: SummarizeToolRequest = parse_arguments(arguments)?;
    if args.text.trim().is_empty() {
        return Err(McpError::invalid_params("`text` must not be empty", None));
    }
    if matches!(args.max_length, Some(0)) {
        return Err(McpError::invalid_params("`max_length` must be > 0", None));
    }
    if [args.max_length, args.min_length]
        .into_iter()
        .flatten()
        .any(|length| length > MAX_GENERATION_LENGTH)
    {
        return Err(McpError::invalid_params(
            format!("lengths must not exceed {MAX_GENERATION_LENGTH}"),
            None,
        ));
    }
    if let (Some(max), Some(min)) = (args.max_length, args.min_length) {
        if min > max {
            return Err(McpError::invalid_params(
                "`min_length` must not exceed `max_length`",
                None,
            ));
        }
    }

    let options = SummarizeOptions {
        max_length: args.max_length,
        min_length: args.min_length,
    };
    let outcome = service
        .summarize_text(&args.text, options, JobControls::default())
        .await
        .map_err(map_summarize_error)?;

    Ok(CallToolResult::structured(json!({
        "status": "ok",
        "summary": outcome.summary,
        "jobId": outcome.job_id,
        "documentDigest": outcome.document_digest,
        "chunkCount": outcome.chunk_count,
        "batchCount": outcome.batch_count,
        "failedChunks": outcome.failed_chunks,
        "elapsedSeconds": outcome.elapsed_seconds,
        "completedAt": outcome.completed_at,
    })))
}

fn map_summarize_error(error: SummarizeError) -> McpError {
    match error {
        SummarizeError::EmptyInput | SummarizeError::Extraction(_) => {
            McpError::invalid_params(error.to_string(), None)
        }
        other => McpError::internal_error(other.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn request_rejects_unknown_fields() {
        let mut arguments = JsonObject::new();
        arguments.insert("text".into(), json!("Some text"));
        arguments.insert("collection".into(), json!("legacy"));
        let error = parse_arguments::<SummarizeToolRequest>(Some(arguments))
            .expect_err("unknown field");
        assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn request_parses_optional_lengths() {
        let mut arguments = JsonObject::new();
        arguments.insert("text".into(), json!("Some text"));
        arguments.insert("max_length".into(), json!(80));
        let request: SummarizeToolRequest =
            parse_arguments(Some(arguments)).expect("valid request");
        assert_eq!(request.max_length, Some(80));
        assert_eq!(request.min_length, None);
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let service = Arc::new(SummarizationService::new(
            Arc::new(crate::inference::ExtractiveInferenceClient::new()),
            crate::processing::PipelineSettings::default(),
        ));
        let mut arguments = JsonObject::new();
        arguments.insert("text".into(), json!("The tenant pays rent."));
        arguments.insert("max_length".into(), json!(u64::MAX));

        let error = handle_summarize(&service, Some(arguments))
            .await
            .expect_err("oversized max_length");
        assert_eq!(error.code, ErrorCode::INVALID_PARAMS);
        assert_eq!(service.metrics_snapshot().jobs_completed, 0);
    }

    #[test]
    fn empty_input_maps_to_invalid_params() {
        assert_eq!(
            map_summarize_error(SummarizeError::EmptyInput).code,
            ErrorCode::INVALID_PARAMS
        );
        assert_eq!(
            map_summarize_error(SummarizeError::NoSummaryGenerated).code,
            ErrorCode::INTERNAL_ERROR
        );
    }
}
