//! Batched, memory-guarded dispatch of chunks to the inference engine.
//!
//! Chunks are sent in consecutive batches of `batch_size`. Before each batch the memory guard is
//! consulted; a refusal aborts the job. Chunks inside a batch run concurrently, each holding a
//! permit from a shared semaphore, and the batch settles only once every chunk has either produced
//! a summary or failed. Results keep chunk order regardless of completion order.

use super::memory::{Admission, MemoryGuard, MemoryProbe};
use super::types::{Chunk, ChunkInferenceError, Fragment, Job, ProgressEvent, SummarizeError};
use crate::inference::{GenerationConfig, InferenceClient};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

/// Default number of chunks dispatched together.
pub const DEFAULT_BATCH_SIZE: usize = 4;
/// Default pause between consecutive batches.
pub const DEFAULT_INTER_BATCH_DELAY: Duration = Duration::from_millis(50);
/// Default upper bound on a single inference call.
pub const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(120);

/// Receiver of per-batch progress events.
pub trait ProgressSink: Send + Sync {
    /// Called once after every settled batch, in order.
    fn report(&self, event: ProgressEvent);
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn report(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.send(event);
    }
}

/// Tuning knobs for [`BatchScheduler`].
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    /// Chunks per batch, also the concurrency bound.
    pub batch_size: usize,
    /// Pause between batches; never applied after the final batch.
    pub inter_batch_delay: Duration,
    /// Per-chunk inference timeout; `None` waits indefinitely.
    pub chunk_timeout: Option<Duration>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            inter_batch_delay: DEFAULT_INTER_BATCH_DELAY,
            chunk_timeout: Some(DEFAULT_CHUNK_TIMEOUT),
        }
    }
}

/// Number of batches needed to cover `chunk_count` chunks.
pub fn batch_count(chunk_count: usize, batch_size: usize) -> usize {
    chunk_count.div_ceil(batch_size.max(1))
}

/// Drives a chunk sequence through the engine in memory-checked batches.
pub struct BatchScheduler {
    client: Arc<dyn InferenceClient>,
    guard: MemoryGuard,
    probe: Arc<dyn MemoryProbe>,
    settings: SchedulerSettings,
    limiter: Arc<Semaphore>,
}

impl BatchScheduler {
    /// Build a scheduler with a private limiter sized to the batch.
    pub fn new(
        client: Arc<dyn InferenceClient>,
        guard: MemoryGuard,
        probe: Arc<dyn MemoryProbe>,
        mut settings: SchedulerSettings,
    ) -> Self {
        settings.batch_size = settings.batch_size.max(1);
        let limiter = Arc::new(Semaphore::new(settings.batch_size));
        Self {
            client,
            guard,
            probe,
            settings,
            limiter,
        }
    }

    /// Share a limiter with other schedulers so concurrent jobs respect one global bound.
    pub fn with_limiter(mut self, limiter: Arc<Semaphore>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Effective settings.
    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Summarize `chunks` batch by batch, returning one fragment per chunk in chunk order.
    ///
    /// Fails with [`SummarizeError::MemoryPressure`] when the guard refuses a batch and with
    /// [`SummarizeError::Cancelled`] when `cancel` fires; fragments of earlier batches are
    /// discarded in both cases. Individual chunk failures never fail the job.
    pub async fn run(
        &self,
        job: &mut Job,
        chunks: &[Chunk],
        generation: &GenerationConfig,
        progress: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Fragment>, SummarizeError> {
        let batch_size = self.settings.batch_size;
        let total_batches = batch_count(chunks.len(), batch_size);
        let mut fragments = Vec::with_capacity(chunks.len());

        for (batch_index, batch) in chunks.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                return Err(SummarizeError::Cancelled);
            }

            if let Admission::Deny { utilization } = self.guard.check(self.probe.as_ref()) {
                tracing::warn!(
                    job = %job.id,
                    batch = batch_index + 1,
                    total_batches,
                    "Batch refused by memory guard; aborting job"
                );
                return Err(SummarizeError::MemoryPressure {
                    utilization,
                    threshold: self.guard.threshold(),
                });
            }

            tracing::debug!(
                job = %job.id,
                batch = batch_index + 1,
                total_batches,
                size = batch.len(),
                "Dispatching batch"
            );
            let settled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SummarizeError::Cancelled),
                settled = join_all(batch.iter().map(|chunk| self.summarize_chunk(chunk, generation))) => settled,
            };

            for (chunk, fragment) in batch.iter().zip(&settled) {
                if let Fragment::Failed { reason } = fragment {
                    tracing::warn!(job = %job.id, chunk = chunk.index, %reason, "Error processing section");
                }
            }
            fragments.extend(settled);

            let event = job.advance(batch.len());
            tracing::info!(
                job = %job.id,
                "Progress: {:.0}% ({}/{} sections) - Time elapsed: {:.1}s",
                event.percent(),
                event.processed,
                event.total,
                event.elapsed_seconds
            );
            if let Some(sink) = progress {
                sink.report(event);
            }

            if batch_index + 1 < total_batches {
                self.pace(cancel).await?;
            }
        }

        Ok(fragments)
    }

    async fn summarize_chunk(&self, chunk: &Chunk, generation: &GenerationConfig) -> Fragment {
        Fragment::from(self.call_engine(chunk, generation).await)
    }

    async fn call_engine(
        &self,
        chunk: &Chunk,
        generation: &GenerationConfig,
    ) -> Result<String, ChunkInferenceError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ChunkInferenceError::LimiterClosed)?;
        let call = self.client.summarize(&chunk.text, generation);
        match self.settings.chunk_timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .map_err(|_| ChunkInferenceError::TimedOut { after })?
                .map_err(ChunkInferenceError::from),
            None => call.await.map_err(ChunkInferenceError::from),
        }
    }

    async fn pace(&self, cancel: &CancellationToken) -> Result<(), SummarizeError> {
        let delay = self.settings.inter_batch_delay;
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(SummarizeError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
