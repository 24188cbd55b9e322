use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct SummaryMetrics {
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    chunks_processed: AtomicU64,
    chunks_failed: AtomicU64,
    memory_rejections: AtomicU64,
    last_chunk_count: AtomicU64,
}

impl SummaryMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished job together with its chunk totals.
    pub fn record_job(&self, chunk_count: u64, failed_chunks: u64) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
        self.chunks_processed
            .fetch_add(chunk_count, Ordering::Relaxed);
        self.chunks_failed.fetch_add(failed_chunks, Ordering::Relaxed);
        self.last_chunk_count.store(chunk_count, Ordering::Relaxed);
    }

    /// Record a job that ended with an error.
    pub fn record_failure(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch refused by the memory guard.
    pub fn record_memory_rejection(&self) {
        self.memory_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let last = self.last_chunk_count.load(Ordering::Relaxed);
        MetricsSnapshot {
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            chunks_processed: self.chunks_processed.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
            memory_rejections: self.memory_rejections.load(Ordering::Relaxed),
            last_chunk_count: (last > 0).then_some(last),
        }
    }
}

/// Immutable view of summarization counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of jobs that produced a summary since startup.
    pub jobs_completed: u64,
    /// Number of jobs that ended with an error.
    pub jobs_failed: u64,
    /// Total chunks dispatched across completed jobs.
    pub chunks_processed: u64,
    /// Chunks whose inference call failed and was skipped.
    pub chunks_failed: u64,
    /// Batches refused because memory utilization was too high.
    pub memory_rejections: u64,
    /// Chunk count of the most recent completed job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_jobs_and_chunks() {
        let metrics = SummaryMetrics::new();
        metrics.record_job(4, 1);
        metrics.record_job(3, 0);
        metrics.record_failure();
        metrics.record_memory_rejection();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.jobs_completed, 2);
        assert_eq!(snapshot.jobs_failed, 1);
        assert_eq!(snapshot.chunks_processed, 7);
        assert_eq!(snapshot.chunks_failed, 1);
        assert_eq!(snapshot.memory_rejections, 1);
        assert_eq!(snapshot.last_chunk_count, Some(3));
    }

    #[test]
    fn snapshot_is_consistent() {
        let metrics = SummaryMetrics::new();
        assert_eq!(metrics.snapshot().jobs_completed, 0);
        assert_eq!(metrics.snapshot().last_chunk_count, None);
    }
}
