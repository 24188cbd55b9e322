//! Summarization service coordinating preprocessing, batching, and aggregation for each job.

use crate::{
    inference::{EngineStatus, GenerationConfig, InferenceClient, InferenceEngine},
    metrics::{MetricsSnapshot, SummaryMetrics},
    processing::{
        aggregate::{aggregate, failed_count},
        memory::{
            DEFAULT_MEMORY_THRESHOLD, MemoryGuard, MemoryProbe, MemoryReading, ProcMeminfoProbe,
        },
        preprocess::{DEFAULT_MAX_CHUNK_CHARS, TextPreprocessor},
        scheduler::{
            BatchScheduler, DEFAULT_BATCH_SIZE, DEFAULT_CHUNK_TIMEOUT, DEFAULT_INTER_BATCH_DELAY,
            ProgressSink, SchedulerSettings, batch_count,
        },
        types::{Job, SummarizeError, SummarizeOptions, SummaryOutcome},
    },
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;

/// Tunables injected into [`SummarizationService`] by the hosting binary.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Upper bound on characters per chunk.
    pub max_chunk_chars: usize,
    /// Chunks per batch and the bound on in-flight inference calls.
    pub batch_size: usize,
    /// Pause between consecutive batches.
    pub inter_batch_delay: Duration,
    /// Memory utilization above which batches are refused.
    pub memory_threshold: f64,
    /// Per-chunk inference timeout.
    pub chunk_timeout: Option<Duration>,
    /// Generation parameters applied to every chunk unless a request overrides the lengths.
    pub chunk_generation: GenerationConfig,
    /// Run at most one job at a time across the process.
    pub exclusive_jobs: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay: DEFAULT_INTER_BATCH_DELAY,
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
            chunk_timeout: Some(DEFAULT_CHUNK_TIMEOUT),
            chunk_generation: GenerationConfig::chunk_preset(),
            exclusive_jobs: false,
        }
    }
}

impl PipelineSettings {
    /// Subset of the settings consumed by the batch scheduler.
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            batch_size: self.batch_size.max(1),
            inter_batch_delay: self.inter_batch_delay,
            chunk_timeout: self.chunk_timeout,
        }
    }
}

/// Per-job hooks supplied by the caller.
#[derive(Clone, Default)]
pub struct JobControls {
    /// Receives one event per settled batch.
    pub progress: Option<Arc<dyn ProgressSink>>,
    /// Cancels the job between or during batches.
    pub cancel: CancellationToken,
}

impl JobControls {
    /// Controls reporting progress to `sink`.
    pub fn with_progress(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            progress: Some(sink),
            cancel: CancellationToken::new(),
        }
    }
}

/// Runs summarization jobs against a shared engine.
///
/// One instance is built at process start and shared through an `Arc` by the HTTP routes, the
/// MCP tools, and the CLI. Jobs are independent; they share only the engine, the concurrency
/// limiter, and the metrics counters.
pub struct SummarizationService {
    engine: InferenceEngine,
    preprocessor: TextPreprocessor,
    guard: MemoryGuard,
    probe: Arc<dyn MemoryProbe>,
    settings: PipelineSettings,
    metrics: Arc<SummaryMetrics>,
    limiter: Arc<Semaphore>,
    exclusive: Option<Semaphore>,
}

/// Abstraction over the summarization pipeline used by external surfaces (HTTP, MCP).
#[async_trait]
pub trait SummarizationApi: Send + Sync {
    /// Summarize raw document text.
    async fn summarize_text(
        &self,
        text: &str,
        options: SummarizeOptions,
        controls: JobControls,
    ) -> Result<SummaryOutcome, SummarizeError>;

    /// Readiness of the underlying engine.
    fn engine_status(&self) -> EngineStatus;

    /// Name of the active engine backend.
    fn engine_name(&self) -> &str;

    /// Effective pipeline settings.
    fn settings(&self) -> &PipelineSettings;

    /// Current memory reading, when the probe can be read.
    fn memory_reading(&self) -> Option<MemoryReading>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl SummarizationService {
    /// Build a service around `client`, probing memory through `/proc/meminfo`.
    pub fn new(client: Arc<dyn InferenceClient>, settings: PipelineSettings) -> Self {
        let batch_size = settings.batch_size.max(1);
        Self {
            engine: InferenceEngine::new(client).with_lifecycle_timeout(settings.chunk_timeout),
            preprocessor: TextPreprocessor::new(settings.max_chunk_chars),
            guard: MemoryGuard::new(settings.memory_threshold),
            probe: Arc::new(ProcMeminfoProbe::default()),
            limiter: Arc::new(Semaphore::new(batch_size)),
            exclusive: settings.exclusive_jobs.then(|| Semaphore::new(1)),
            metrics: Arc::new(SummaryMetrics::new()),
            settings,
        }
    }

    /// Replace the memory probe.
    pub fn with_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Engine wrapper, for lifecycle control and status reporting.
    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Warm the engine so the first request does not pay the start-up cost.
    pub async fn initialize(&self) -> Result<(), SummarizeError> {
        self.engine
            .ensure_ready()
            .await
            .map_err(|error| SummarizeError::EngineUnavailable(error.to_string()))
    }

    /// Release engine resources; later jobs fail with `EngineUnavailable`.
    pub async fn shutdown(&self) -> Result<(), SummarizeError> {
        self.engine
            .shutdown()
            .await
            .map_err(|error| SummarizeError::EngineUnavailable(error.to_string()))
    }

    /// Normalize, chunk, summarize in batches, and merge `text` into a single summary.
    pub async fn summarize_text(
        &self,
        text: &str,
        options: SummarizeOptions,
        controls: JobControls,
    ) -> Result<SummaryOutcome, SummarizeError> {
        let result = self.run_job(text, &options, &controls).await;
        match &result {
            Ok(outcome) => self
                .metrics
                .record_job(outcome.chunk_count as u64, outcome.failed_chunks as u64),
            Err(error) => {
                if matches!(error, SummarizeError::MemoryPressure { .. }) {
                    self.metrics.record_memory_rejection();
                }
                self.metrics.record_failure();
                tracing::error!(%error, "Summarization job failed");
            }
        }
        result
    }

    async fn run_job(
        &self,
        text: &str,
        options: &SummarizeOptions,
        controls: &JobControls,
    ) -> Result<SummaryOutcome, SummarizeError> {
        let _exclusive = self.acquire_exclusive(&controls.cancel).await?;

        let prepared = self.preprocessor.prepare(text)?;
        self.initialize().await?;

        let mut job = Job::start(prepared.chunks.len());
        let scheduler_settings = self.settings.scheduler_settings();
        let batches = batch_count(prepared.chunks.len(), scheduler_settings.batch_size);
        tracing::info!(
            job = %job.id,
            chunks = prepared.chunks.len(),
            batches,
            engine = self.engine.name(),
            "Starting summarization job"
        );

        let generation = options.generation_config(&self.settings.chunk_generation);
        let scheduler = BatchScheduler::new(
            self.engine.client(),
            self.guard,
            Arc::clone(&self.probe),
            scheduler_settings,
        )
        .with_limiter(Arc::clone(&self.limiter));
        let fragments = scheduler
            .run(
                &mut job,
                &prepared.chunks,
                &generation,
                controls.progress.as_deref(),
                &controls.cancel,
            )
            .await?;

        let failed_chunks = failed_count(&fragments);
        let summary = aggregate(&fragments)?;
        let elapsed_seconds = job.elapsed().as_secs_f64();
        tracing::info!(
            job = %job.id,
            chunks = prepared.chunks.len(),
            failed_chunks,
            elapsed_seconds,
            "Summarization job finished"
        );

        Ok(SummaryOutcome {
            job_id: job.id,
            document_digest: hex::encode(Sha256::digest(prepared.normalized.as_bytes())),
            summary,
            chunk_count: prepared.chunks.len(),
            batch_count: batches,
            failed_chunks,
            elapsed_seconds,
            completed_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        })
    }

    async fn acquire_exclusive(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<SemaphorePermit<'_>>, SummarizeError> {
        let Some(exclusive) = &self.exclusive else {
            return Ok(None);
        };
        tokio::select! {
            _ = cancel.cancelled() => Err(SummarizeError::Cancelled),
            permit = exclusive.acquire() => permit
                .map(Some)
                .map_err(|_| SummarizeError::Cancelled),
        }
    }

    /// Return the current summarization metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl SummarizationApi for SummarizationService {
    async fn summarize_text(
        &self,
        text: &str,
        options: SummarizeOptions,
        controls: JobControls,
    ) -> Result<SummaryOutcome, SummarizeError> {
        SummarizationService::summarize_text(self, text, options, controls).await
    }

    fn engine_status(&self) -> EngineStatus {
        self.engine.status()
    }

    fn engine_name(&self) -> &str {
        self.engine.name()
    }

    fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn memory_reading(&self) -> Option<MemoryReading> {
        self.probe.read().ok()
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        SummarizationService::metrics_snapshot(self)
    }
}
