//! Ollama-backed summarization client.
//!
//! Issues non-streaming `POST /api/generate` requests directly against the runtime. Length
//! bounds from [`GenerationConfig`] are expressed as a word budget in the prompt and as a token
//! cap through `num_predict`; Ollama has no beam search, so `num_beams` is ignored.

use super::{GenerationConfig, InferenceClient, InferenceError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const WARM_KEEP_ALIVE: &str = "10m";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a local or remote Ollama runtime.
pub struct OllamaInferenceClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaInferenceClient {
    /// Construct a client targeting `base_url` with the given model.
    pub fn new(base_url: String, model: String) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .user_agent("legal-digest/summary")
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|error| {
                InferenceError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    async fn post_generate(&self, payload: Value) -> Result<OllamaResponse, InferenceError> {
        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                InferenceError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(InferenceError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404 (is model '{}' pulled?)",
                self.endpoint(),
                self.model
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            InferenceError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(InferenceError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
    done: bool,
}

/// Build the per-chunk summarization prompt.
pub(crate) fn build_prompt(text: &str, config: &GenerationConfig) -> String {
    format!(
        "You summarize passages of legal documents. Keep parties, dates, amounts, obligations and \
         cited provisions. Do not speculate. Reply with the summary only, using between {} and {} \
         words.\n\nPassage:\n{}",
        config.min_length,
        config.max_length,
        text.trim()
    )
}

fn generation_options(config: &GenerationConfig) -> Value {
    let temperature = if config.do_sample {
        config.temperature
    } else {
        0.0
    };
    json!({
        "temperature": temperature,
        "top_k": config.top_k,
        "top_p": config.top_p,
        "repeat_penalty": config.repetition_penalty,
        "num_predict": config.max_length.saturating_mul(2),
    })
}

#[async_trait]
impl InferenceClient for OllamaInferenceClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn initialize(&self, _preset: &GenerationConfig) -> Result<(), InferenceError> {
        // A generate call without a prompt loads the model and keeps it resident.
        self.post_generate(json!({
            "model": self.model,
            "keep_alive": WARM_KEEP_ALIVE,
            "stream": false,
        }))
        .await?;
        tracing::debug!(model = %self.model, "Ollama model loaded");
        Ok(())
    }

    async fn summarize(
        &self,
        text: &str,
        config: &GenerationConfig,
    ) -> Result<String, InferenceError> {
        let body = self
            .post_generate(json!({
                "model": self.model,
                "prompt": build_prompt(text, config),
                "stream": false,
                "options": generation_options(config),
            }))
            .await?;
        Ok(body.response.trim().to_string())
    }

    async fn shutdown(&self) -> Result<(), InferenceError> {
        self.post_generate(json!({
            "model": self.model,
            "keep_alive": 0,
            "stream": false,
        }))
        .await?;
        tracing::debug!(model = %self.model, "Ollama model unloaded");
        Ok(())
    }
}
