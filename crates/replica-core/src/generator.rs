//! Generative content capability.
//!
//! The orchestrator hands a composed prompt to a [`ContentGenerator`] and
//! treats whatever text comes back as a draft document. [`GeminiGenerator`]
//! talks to a `generateContent` style JSON endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GenerationConfig;
use crate::error::{Error, GenerationError, Result};

/// Header carrying the API key, so it never appears in request URLs.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Produces text for a prompt.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate a draft document for `prompt`.
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;

    /// Identifier recorded in clone metadata.
    fn name(&self) -> &str;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: SamplingConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SamplingConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Client for a Gemini `generateContent` endpoint.
pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    sampling: (f32, u32),
}

impl GeminiGenerator {
    /// Builds a generator, reading the API key from the configured variable.
    pub fn from_env(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Config(format!(
                "{} is not set; export an API key for the generation service",
                config.api_key_env
            ))
        })?;
        Self::with_api_key(config, api_key)
    }

    /// Builds a generator with an explicit API key.
    pub fn with_api_key(config: &GenerationConfig, api_key: impl Into<String>) -> Result<Self> {
        // The orchestrator enforces the generation time bound.
        let client = Client::builder()
            .user_agent(concat!("replica/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            sampling: (config.temperature, config.max_output_tokens),
        })
    }

    fn request_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        let (temperature, max_output_tokens) = self.sampling;
        let body = GenerateRequest {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: SamplingConfig {
                temperature,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens,
            },
        };

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Calling generation service");
        let response = self
            .client
            .post(self.request_url())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| format!("{} {}", envelope.error.status, envelope.error.message))
                .unwrap_or(text);
            warn!(status = status.as_u16(), "Generation service returned an error");
            return Err(GenerationError::categorize(&format!(
                "{} {}",
                status.as_u16(),
                detail.trim()
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|err| GenerationError::Other(format!("malformed response: {err}")))?;
        let output: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();

        if output.trim().is_empty() {
            return Err(GenerationError::Other(
                "the model returned no content".to_string(),
            ));
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Connection-level failures carry no provider verdict, so they are never
/// categorized. The URL is dropped from the message.
fn transport_error(err: reqwest::Error) -> GenerationError {
    GenerationError::Other(err.without_url().to_string())
}
