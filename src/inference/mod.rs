//! Text-generation engine contract and lifecycle.
//!
//! The summarization core treats the engine as a black box: given one chunk of text and a
//! [`GenerationConfig`], it returns a short summary or fails. Two backends ship with the crate:
//! an Ollama HTTP adapter and a deterministic extractive fallback that needs no model. The
//! [`InferenceEngine`] wrapper owns the chosen client and tracks its readiness so the service can
//! initialize it exactly once and shut it down explicitly.

mod extractive;
mod ollama;

pub use extractive::ExtractiveInferenceClient;
pub use ollama::OllamaInferenceClient;

use crate::config::{Config, SummarizationProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Largest summary length a caller may request for one chunk.
pub const MAX_GENERATION_LENGTH: usize = 4096;

/// Default bound on engine warm-up and shutdown calls.
pub const DEFAULT_LIFECYCLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors surfaced by a text-generation backend.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Provider was explicitly disabled or unreachable.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Generation parameters handed to the engine with every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound on the generated summary length.
    pub max_length: usize,
    /// Lower bound on the generated summary length.
    pub min_length: usize,
    /// Beam count for beam-search decoders; ignored by backends without beam search.
    pub num_beams: u32,
    /// Whether sampling is enabled; when off, decoding is greedy.
    pub do_sample: bool,
    /// Sampling temperature.
    pub temperature: f32,
    /// Top-k sampling cutoff.
    pub top_k: u32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
    /// Penalty applied to repeated tokens.
    pub repetition_penalty: f32,
}

impl GenerationConfig {
    /// Preset used when warming the engine for whole-document work.
    pub fn document_preset() -> Self {
        Self {
            max_length: 1024,
            min_length: 50,
            num_beams: 4,
            do_sample: true,
            temperature: 0.7,
            top_k: 50,
            top_p: 0.95,
            repetition_penalty: 1.2,
        }
    }

    /// Preset used for each chunk-level summarization call.
    pub fn chunk_preset() -> Self {
        Self {
            max_length: 100,
            min_length: 20,
            num_beams: 2,
            do_sample: false,
            temperature: 0.3,
            top_k: 20,
            top_p: 0.8,
            repetition_penalty: 1.1,
        }
    }

    /// Override the length bounds, keeping `1 <= min_length <= max_length <= MAX_GENERATION_LENGTH`.
    pub fn with_lengths(mut self, max_length: Option<usize>, min_length: Option<usize>) -> Self {
        if let Some(max) = max_length {
            self.max_length = max.clamp(1, MAX_GENERATION_LENGTH);
        }
        if let Some(min) = min_length {
            self.min_length = min;
        }
        self.min_length = self.min_length.min(self.max_length);
        self
    }
}

/// Interface implemented by text-generation backends.
///
/// Implementations must tolerate up to `batch_size` concurrent `summarize` calls.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Short identifier used in logs and health payloads.
    fn name(&self) -> &str;

    /// Prepare the backend before the first job (load weights, warm caches).
    async fn initialize(&self, _preset: &GenerationConfig) -> Result<(), InferenceError> {
        Ok(())
    }

    /// Summarize a single chunk of text.
    async fn summarize(
        &self,
        text: &str,
        config: &GenerationConfig,
    ) -> Result<String, InferenceError>;

    /// Release backend resources.
    async fn shutdown(&self) -> Result<(), InferenceError> {
        Ok(())
    }
}

/// Readiness of the engine held by [`InferenceEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// No initialization attempted yet.
    Uninitialized,
    /// Initialization in progress.
    Initializing,
    /// Engine accepted initialization and serves requests.
    Ready,
    /// Last initialization attempt failed; the next job retries.
    Failed,
    /// Engine was shut down and refuses further work.
    ShutDown,
}

impl EngineStatus {
    /// Coarse label reported to clients (`ready`, `initializing`, `unavailable`).
    pub fn label(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Uninitialized | Self::Initializing => "initializing",
            Self::Failed | Self::ShutDown => "unavailable",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Initializing,
            2 => Self::Ready,
            3 => Self::Failed,
            4 => Self::ShutDown,
            _ => Self::Uninitialized,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Initializing => 1,
            Self::Ready => 2,
            Self::Failed => 3,
            Self::ShutDown => 4,
        }
    }
}

/// Owns a text-generation client and its init/shutdown lifecycle.
pub struct InferenceEngine {
    client: Arc<dyn InferenceClient>,
    status: AtomicU8,
    lifecycle: Mutex<()>,
    lifecycle_timeout: Option<Duration>,
}

impl InferenceEngine {
    /// Wrap a client; no initialization happens until [`Self::ensure_ready`].
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            client,
            status: AtomicU8::new(EngineStatus::Uninitialized.as_u8()),
            lifecycle: Mutex::new(()),
            lifecycle_timeout: Some(DEFAULT_LIFECYCLE_TIMEOUT),
        }
    }

    /// Bound warm-up and shutdown calls; `None` waits indefinitely.
    pub fn with_lifecycle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lifecycle_timeout = timeout;
        self
    }

    /// Current readiness of the engine.
    pub fn status(&self) -> EngineStatus {
        EngineStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Name of the wrapped backend.
    pub fn name(&self) -> &str {
        self.client.name()
    }

    /// Shared handle to the wrapped client.
    pub fn client(&self) -> Arc<dyn InferenceClient> {
        Arc::clone(&self.client)
    }

    /// Initialize the backend once; later calls return immediately while the engine is ready.
    pub async fn ensure_ready(&self) -> Result<(), InferenceError> {
        let _lifecycle = self.lifecycle.lock().await;
        match self.status() {
            EngineStatus::Ready => return Ok(()),
            EngineStatus::ShutDown => {
                return Err(InferenceError::ProviderUnavailable(
                    "engine has been shut down".into(),
                ));
            }
            _ => {}
        }

        self.set_status(EngineStatus::Initializing);
        tracing::info!(engine = self.client.name(), "Starting summarization engine initialization");
        let preset = GenerationConfig::document_preset();
        match self
            .bounded("initialization", self.client.initialize(&preset))
            .await
        {
            Ok(()) => {
                self.set_status(EngineStatus::Ready);
                tracing::info!(engine = self.client.name(), "Summarization engine ready");
                Ok(())
            }
            Err(error) => {
                self.set_status(EngineStatus::Failed);
                tracing::error!(engine = self.client.name(), %error, "Engine initialization failed");
                Err(error)
            }
        }
    }

    /// Shut the backend down; subsequent jobs fail with `ProviderUnavailable`.
    pub async fn shutdown(&self) -> Result<(), InferenceError> {
        let _lifecycle = self.lifecycle.lock().await;
        let was_ready = self.status() == EngineStatus::Ready;
        self.set_status(EngineStatus::ShutDown);
        if was_ready {
            self.bounded("shutdown", self.client.shutdown()).await?;
        }
        tracing::info!(engine = self.client.name(), "Summarization engine shut down");
        Ok(())
    }

    async fn bounded<F>(&self, stage: &str, call: F) -> Result<(), InferenceError>
    where
        F: std::future::Future<Output = Result<(), InferenceError>>,
    {
        let Some(limit) = self.lifecycle_timeout else {
            return call.await;
        };
        tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(InferenceError::ProviderUnavailable(format!(
                "engine {stage} timed out after {}s",
                limit.as_secs_f64()
            )))
        })
    }

    fn set_status(&self, status: EngineStatus) {
        self.status.store(status.as_u8(), Ordering::Release);
    }
}

/// Build the inference client selected by configuration.
pub fn build_inference_client(config: &Config) -> Result<Arc<dyn InferenceClient>, InferenceError> {
    match config.summarization_provider {
        SummarizationProvider::Ollama => Ok(Arc::new(OllamaInferenceClient::new(
            config.ollama_url.clone(),
            config.summarization_model.clone(),
        )?)),
        SummarizationProvider::Extractive => Ok(Arc::new(ExtractiveInferenceClient::new())),
    }
}
