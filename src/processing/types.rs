//! Core data types and error definitions for the summarization pipeline.

use crate::extraction::ExtractionError;
use crate::inference::{GenerationConfig, InferenceError};
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

/// Job-level failures surfaced to the boundary layer.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Normalization left no usable text; no batch was dispatched.
    #[error("Text is empty after preprocessing")]
    EmptyInput,
    /// The memory guard refused a batch; the job was aborted.
    #[error(
        "Server memory limit reached ({:.0}% used, limit {:.0}%)",
        as_percent(.utilization),
        as_percent(.threshold)
    )]
    MemoryPressure {
        /// Observed utilization in `[0, 1]`.
        utilization: f64,
        /// Configured admission threshold.
        threshold: f64,
    },
    /// Every chunk failed or produced no content.
    #[error("Failed to generate summary: no chunk produced any content")]
    NoSummaryGenerated,
    /// The job was cancelled before it finished.
    #[error("Summarization job was cancelled")]
    Cancelled,
    /// The text-generation engine could not be made ready.
    #[error("Summarization engine unavailable: {0}")]
    EngineUnavailable(String),
    /// Text could not be extracted from the uploaded document.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

fn as_percent(ratio: &f64) -> f64 {
    ratio * 100.0
}

/// Why a single chunk produced no summary. Recovered locally and never surfaced as a job error.
#[derive(Debug, Error)]
pub enum ChunkInferenceError {
    /// The engine did not answer within the per-chunk timeout.
    #[error("inference timed out after {after:?}")]
    TimedOut {
        /// Timeout that elapsed.
        after: Duration,
    },
    /// The engine returned an error or an unusable response.
    #[error(transparent)]
    Engine(#[from] InferenceError),
    /// The shared concurrency limiter was closed while the chunk waited for a slot.
    #[error("concurrency limiter closed")]
    LimiterClosed,
}

/// Bounded slice of normalized document text; the unit of inference work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based position in the document.
    pub index: usize,
    /// Chunk contents, at most `max_chunk_chars` characters.
    pub text: String,
}

/// Result of summarizing one chunk.
///
/// A successful call may legitimately return an empty string; that is still `Summarized` and is
/// dropped during aggregation without counting as a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// The engine produced a summary for the chunk.
    Summarized(String),
    /// The chunk failed and was skipped.
    Failed {
        /// Human-readable failure reason, kept for logs and diagnostics.
        reason: String,
    },
}

impl Fragment {
    /// Summary text, when the chunk succeeded with non-blank output.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Summarized(text) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        }
    }

    /// Whether the chunk was recorded as failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl From<Result<String, ChunkInferenceError>> for Fragment {
    fn from(result: Result<String, ChunkInferenceError>) -> Self {
        match result {
            Ok(text) => Self::Summarized(text),
            Err(error) => Self::Failed {
                reason: error.to_string(),
            },
        }
    }
}

/// Progress report emitted after each batch settles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Chunks settled so far.
    pub processed: usize,
    /// Total chunks in the job.
    pub total: usize,
    /// Seconds since the job started.
    pub elapsed_seconds: f64,
}

impl ProgressEvent {
    /// Completion ratio in percent.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Transient state of one summarization request.
#[derive(Debug)]
pub struct Job {
    /// Identifier used to correlate logs and responses.
    pub id: Uuid,
    /// Chunk count at the time the job started.
    pub total: usize,
    /// Chunks settled so far.
    pub processed: usize,
    started: Instant,
}

impl Job {
    /// Start a job clock for `total` chunks.
    pub fn start(total: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            total,
            processed: 0,
            started: Instant::now(),
        }
    }

    /// Time since the job started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Mark `count` more chunks as settled and build the matching progress event.
    pub fn advance(&mut self, count: usize) -> ProgressEvent {
        self.processed = (self.processed + count).min(self.total);
        ProgressEvent {
            processed: self.processed,
            total: self.total,
            elapsed_seconds: self.elapsed().as_secs_f64(),
        }
    }
}

/// Per-request options supplied by the boundary.
#[derive(Debug, Clone, Default)]
pub struct SummarizeOptions {
    /// Override for the per-chunk maximum output length.
    pub max_length: Option<usize>,
    /// Override for the per-chunk minimum output length.
    pub min_length: Option<usize>,
}

impl SummarizeOptions {
    /// Apply the overrides on top of the configured per-chunk preset.
    pub fn generation_config(&self, base: &GenerationConfig) -> GenerationConfig {
        base.clone().with_lengths(self.max_length, self.min_length)
    }
}

/// Summary of a completed summarization job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutcome {
    /// Identifier assigned to the job.
    pub job_id: Uuid,
    /// SHA-256 of the normalized document text.
    pub document_digest: String,
    /// Final merged summary.
    pub summary: String,
    /// Number of chunks the document was split into.
    pub chunk_count: usize,
    /// Number of batches dispatched.
    pub batch_count: usize,
    /// Chunks skipped because inference failed.
    pub failed_chunks: usize,
    /// Wall-clock duration of the job.
    pub elapsed_seconds: f64,
    /// RFC3339 completion timestamp.
    pub completed_at: String,
}
