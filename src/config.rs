use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::inference::GenerationConfig;
use crate::processing::PipelineSettings;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_SUMMARIZATION_MODEL: &str = "llama3.2";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Legal Digest server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Text-generation backend used for per-chunk summaries.
    pub summarization_provider: SummarizationProvider,
    /// Model identifier passed to the provider.
    pub summarization_model: String,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Upper bound on characters per chunk.
    pub max_chunk_chars: usize,
    /// Number of chunks dispatched concurrently per batch.
    pub batch_size: usize,
    /// Pause between consecutive batches, in milliseconds.
    pub inter_batch_delay_ms: u64,
    /// Memory utilization above which batches are refused.
    pub memory_threshold: f64,
    /// Per-chunk timeout in seconds; `0` disables the timeout.
    pub chunk_timeout_secs: u64,
    /// Maximum output length requested for each chunk summary.
    pub chunk_summary_max_length: usize,
    /// Minimum output length requested for each chunk summary.
    pub chunk_summary_min_length: usize,
    /// Allow only one summarization job at a time.
    pub exclusive_jobs: bool,
    /// Body limit applied to document uploads.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported text-generation backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic in-process extractive summaries; needs no model.
    Extractive,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = PipelineSettings::default();
        let chunk_defaults = GenerationConfig::chunk_preset();

        let summarization_provider = match load_env_optional("SUMMARIZATION_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".into()))?,
            None => SummarizationProvider::Ollama,
        };

        let memory_threshold: f64 =
            parse_optional("MEMORY_THRESHOLD")?.unwrap_or(defaults.memory_threshold);
        if !(memory_threshold > 0.0 && memory_threshold <= 1.0) {
            return Err(ConfigError::InvalidValue("MEMORY_THRESHOLD".into()));
        }

        let max_chunk_chars: usize =
            parse_optional("TEXT_CHUNK_MAX_CHARS")?.unwrap_or(defaults.max_chunk_chars);
        if max_chunk_chars == 0 {
            return Err(ConfigError::InvalidValue("TEXT_CHUNK_MAX_CHARS".into()));
        }

        let batch_size: usize = parse_optional("SUMMARY_BATCH_SIZE")?.unwrap_or(defaults.batch_size);
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_BATCH_SIZE".into()));
        }

        let chunk_summary_max_length: usize =
            parse_optional("CHUNK_SUMMARY_MAX_LENGTH")?.unwrap_or(chunk_defaults.max_length);
        let chunk_summary_min_length: usize =
            parse_optional("CHUNK_SUMMARY_MIN_LENGTH")?.unwrap_or(chunk_defaults.min_length);
        if chunk_summary_min_length > chunk_summary_max_length {
            return Err(ConfigError::InvalidValue("CHUNK_SUMMARY_MIN_LENGTH".into()));
        }

        Ok(Self {
            summarization_provider,
            summarization_model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARIZATION_MODEL.to_string()),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            max_chunk_chars,
            batch_size,
            inter_batch_delay_ms: parse_optional("INTER_BATCH_DELAY_MS")?
                .unwrap_or(defaults.inter_batch_delay.as_millis() as u64),
            memory_threshold,
            chunk_timeout_secs: parse_optional("CHUNK_TIMEOUT_SECS")?.unwrap_or(
                defaults
                    .chunk_timeout
                    .map(|timeout| timeout.as_secs())
                    .unwrap_or(0),
            ),
            chunk_summary_max_length,
            chunk_summary_min_length,
            exclusive_jobs: parse_bool_optional("EXCLUSIVE_JOBS")?.unwrap_or(false),
            max_upload_bytes: parse_optional("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }

    /// Translate the loaded configuration into settings for the summarization pipeline.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        let mut chunk_generation = GenerationConfig::chunk_preset();
        chunk_generation.max_length = self.chunk_summary_max_length;
        chunk_generation.min_length = self.chunk_summary_min_length;

        PipelineSettings {
            max_chunk_chars: self.max_chunk_chars,
            batch_size: self.batch_size,
            inter_batch_delay: Duration::from_millis(self.inter_batch_delay_ms),
            memory_threshold: self.memory_threshold,
            chunk_timeout: (self.chunk_timeout_secs > 0)
                .then(|| Duration::from_secs(self.chunk_timeout_secs)),
            chunk_generation,
            exclusive_jobs: self.exclusive_jobs,
        }
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_bool_optional(key: &str) -> Result<Option<bool>, ConfigError> {
    load_env_optional(key)
        .map(|value| match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        })
        .transpose()
}

impl std::str::FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "extractive" | "none" => Ok(Self::Extractive),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        provider = ?config.summarization_provider,
        model = %config.summarization_model,
        max_chunk_chars = config.max_chunk_chars,
        batch_size = config.batch_size,
        memory_threshold = config.memory_threshold,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
