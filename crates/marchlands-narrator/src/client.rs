//! HTTP backends for the narrator.
//!
//! Enum dispatch over the two supported API dialects, avoiding the
//! dyn-compatibility issues with async methods. Both backends send a
//! rendered prompt and return the response text plus the token count the
//! API reports, so the session can account for spend.

use marchlands_engine::ProviderError;

use crate::config::{BackendKind, NarratorConfig};
use crate::prompt::RenderedPrompt;

/// A completed model call: the raw text and the tokens it cost.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Raw response text, expected to contain JSON.
    pub text: String,
    /// Total tokens the API billed for the call.
    pub tokens: u64,
}

/// A model backend that can complete a prompt.
pub enum LlmBackend {
    /// Google Gemini `generateContent` API.
    Gemini(GeminiBackend),
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
}

impl LlmBackend {
    /// Build the backend the configuration names.
    pub fn from_config(config: &NarratorConfig) -> Self {
        match config.backend {
            BackendKind::Gemini => Self::Gemini(GeminiBackend::new(config)),
            BackendKind::OpenAi => Self::OpenAi(OpenAiBackend::new(config)),
        }
    }

    /// Send a prompt and return the completion.
    ///
    /// # Errors
    ///
    /// [`ProviderError::RateLimited`] on HTTP 429, otherwise
    /// [`ProviderError::Unavailable`] for transport or API errors.
    pub async fn complete(&self, prompt: &RenderedPrompt) -> Result<Completion, ProviderError> {
        match self {
            Self::Gemini(backend) => backend.complete(prompt).await,
            Self::OpenAi(backend) => backend.complete(prompt).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Gemini(_) => "gemini",
            Self::OpenAi(_) => "openai-compatible",
        }
    }
}

/// Backend for the Gemini `generateContent` API.
///
/// Sends requests to `{api_url}/models/{model}:generateContent` with the
/// key in the `x-goog-api-key` header. The system prompt travels in the
/// top-level `system_instruction` field.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    /// Create a new Gemini backend.
    pub fn new(config: &NarratorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<Completion, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);

        let body = serde_json::json!({
            "system_instruction": {"parts": [{"text": prompt.system}]},
            "contents": [
                {"role": "user", "parts": [{"text": prompt.user}]}
            ],
            "generationConfig": {
                "temperature": 0.8,
                "maxOutputTokens": 1024,
                "responseMimeType": "application/json"
            }
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ProviderError::Unavailable(format!(
                "Gemini returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("Gemini response parse failed: {e}")))?;

        extract_gemini_completion(&json)
    }
}

/// Extract text and token usage from a Gemini `generateContent` response.
fn extract_gemini_completion(json: &serde_json::Value) -> Result<Completion, ProviderError> {
    let text = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            ProviderError::Unavailable(
                "Gemini response missing candidates[0].content.parts[0].text".to_owned(),
            )
        })?;

    let tokens = json
        .get("usageMetadata")
        .and_then(|u| u.get("totalTokenCount"))
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);

    Ok(Completion { text, tokens })
}

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Works with OpenAI, DeepSeek, and Ollama endpoints. Sends requests to
/// `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create a new OpenAI-compatible backend.
    pub fn new(config: &NarratorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn complete(&self, prompt: &RenderedPrompt) -> Result<Completion, ProviderError> {
        let url = format!("{}/chat/completions", self.api_url);

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user}
            ],
            "temperature": 0.8,
            "max_tokens": 1024,
            "response_format": {"type": "json_object"}
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(ProviderError::Unavailable(format!(
                "OpenAI returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("OpenAI response parse failed: {e}")))?;

        extract_openai_completion(&json)
    }
}

/// Extract text and token usage from an OpenAI chat completions response.
fn extract_openai_completion(json: &serde_json::Value) -> Result<Completion, ProviderError> {
    let text = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            ProviderError::Unavailable(
                "OpenAI response missing choices[0].message.content".to_owned(),
            )
        })?;

    let tokens = json
        .get("usage")
        .and_then(|u| u.get("total_tokens"))
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0);

    Ok(Completion { text, tokens })
}
