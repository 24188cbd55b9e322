//! Summarization core: preprocessing, memory admission, batch scheduling, and aggregation.

pub mod aggregate;
pub mod memory;
pub mod preprocess;
pub mod scheduler;
mod service;
pub mod types;

pub use aggregate::aggregate;
pub use memory::{Admission, MemoryGuard, MemoryProbe, MemoryReading, ProcMeminfoProbe};
pub use preprocess::{PreparedText, TextPreprocessor, normalize_text};
pub use scheduler::{BatchScheduler, ProgressSink, SchedulerSettings};
pub use service::{JobControls, PipelineSettings, SummarizationApi, SummarizationService};
pub use types::{
    Chunk, Fragment, Job, ProgressEvent, SummarizeError, SummarizeOptions, SummaryOutcome,
};
