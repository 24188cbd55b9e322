//! Formatting helpers shared across MCP handlers and resources.

use crate::{
    inference::EngineStatus,
    processing::{MemoryReading, PipelineSettings},
};
use rmcp::model::ResourceContents;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value, json};

pub(crate) const APPLICATION_JSON: &str = "application/json";

/// Build the health payload summarizing engine readiness and memory headroom.
pub(crate) fn health_payload(
    engine: &str,
    status: EngineStatus,
    model: Option<&str>,
    memory: Option<MemoryReading>,
    memory_threshold: f64,
) -> String {
    let mut engine_section = Map::new();
    engine_section.insert("backend".into(), Value::String(engine.to_string()));
    engine_section.insert("status".into(), Value::String(status.label().into()));
    if let Some(model) = model {
        engine_section.insert("model".into(), Value::String(model.to_string()));
    }

    let mut memory_section = Map::new();
    memory_section.insert("threshold".into(), json!(memory_threshold));
    match memory {
        Some(reading) => {
            memory_section.insert("totalBytes".into(), json!(reading.total_bytes));
            memory_section.insert("freeBytes".into(), json!(reading.free_bytes));
            memory_section.insert("utilization".into(), json!(reading.utilization()));
            memory_section.insert(
                "admitting".into(),
                Value::Bool(reading.utilization() <= memory_threshold),
            );
        }
        None => {
            memory_section.insert("error".into(), Value::String("memory probe unavailable".into()));
        }
    }

    let payload = json!({
        "engine": Value::Object(engine_section),
        "memory": Value::Object(memory_section),
    });

    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
}

/// Serialize a value to JSON, falling back to compact formatting on error.
pub(crate) fn serialize_json<T: Serialize>(value: &T, context_uri: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| {
        tracing::warn!(uri = context_uri, %error, "Failed to serialize JSON prettily");
        serde_json::to_string(value).unwrap_or_else(|_| "{}".into())
    })
}

/// Build JSON resource contents for MCP resource responses.
pub(crate) fn json_resource_contents(uri: &str, text: String) -> ResourceContents {
    ResourceContents::TextResourceContents {
        uri: uri.to_string(),
        mime_type: Some(APPLICATION_JSON.into()),
        text,
        meta: None,
    }
}

/// Effective pipeline settings exposed through the `settings` resource.
#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct SettingsSnapshot {
    /// Chunking and batching knobs.
    pub(crate) pipeline: PipelineSettingsSnapshot,
    /// Per-chunk generation bounds.
    pub(crate) generation: GenerationSettingsSnapshot,
}

/// Chunking, batching, and admission settings.
#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct PipelineSettingsSnapshot {
    /// Upper bound on characters per chunk.
    pub(crate) max_chunk_chars: usize,
    /// Chunks dispatched concurrently per batch.
    pub(crate) batch_size: usize,
    /// Pause between batches in milliseconds.
    pub(crate) inter_batch_delay_ms: u64,
    /// Memory utilization above which batches are refused.
    pub(crate) memory_threshold: f64,
    /// Per-chunk timeout in seconds, when enabled.
    pub(crate) chunk_timeout_secs: Option<u64>,
    /// Whether jobs run one at a time.
    pub(crate) exclusive_jobs: bool,
}

/// Generation bounds applied to each chunk unless overridden per request.
#[derive(Debug, Serialize, JsonSchema)]
pub(crate) struct GenerationSettingsSnapshot {
    /// Upper bound on each chunk summary.
    pub(crate) max_length: usize,
    /// Lower bound on each chunk summary.
    pub(crate) min_length: usize,
}

impl From<&PipelineSettings> for SettingsSnapshot {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            pipeline: PipelineSettingsSnapshot {
                max_chunk_chars: settings.max_chunk_chars,
                batch_size: settings.batch_size,
                inter_batch_delay_ms: settings.inter_batch_delay.as_millis() as u64,
                memory_threshold: settings.memory_threshold,
                chunk_timeout_secs: settings.chunk_timeout.map(|timeout| timeout.as_secs()),
                exclusive_jobs: settings.exclusive_jobs,
            },
            generation: GenerationSettingsSnapshot {
                max_length: settings.chunk_generation.max_length,
                min_length: settings.chunk_generation.min_length,
            },
        }
    }
}
