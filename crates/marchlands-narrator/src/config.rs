//! Narrator configuration loaded from environment variables.
//!
//! The narrator needs to know which API dialect to speak and how to reach
//! it. Everything but the key has a sensible default, so the minimal
//! setup is exporting `MARCHLANDS_LLM_API_KEY`.

use crate::error::NarratorError;

/// Which API dialect the backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Google Gemini `generateContent` API.
    Gemini,
    /// OpenAI-compatible chat completions API (OpenAI, DeepSeek, Ollama).
    OpenAi,
}

/// Connection settings for the narrator's model backend.
#[derive(Debug, Clone)]
pub struct NarratorConfig {
    /// API dialect.
    pub backend: BackendKind,
    /// Base API URL, without a trailing slash.
    pub api_url: String,
    /// API key.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
}

impl NarratorConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `MARCHLANDS_LLM_API_KEY` -- API key
    ///
    /// Optional:
    /// - `MARCHLANDS_LLM_BACKEND` -- `gemini` (default) or `openai`
    /// - `MARCHLANDS_LLM_API_URL` -- base URL (defaults per backend)
    /// - `MARCHLANDS_LLM_MODEL` -- model name (defaults per backend)
    pub fn from_env() -> Result<Self, NarratorError> {
        let backend = match std::env::var("MARCHLANDS_LLM_BACKEND") {
            Ok(value) => parse_backend(&value)?,
            Err(_) => BackendKind::Gemini,
        };

        let api_key = std::env::var("MARCHLANDS_LLM_API_KEY")
            .map_err(|_| NarratorError::Config("MARCHLANDS_LLM_API_KEY is not set".to_owned()))?;

        let api_url = std::env::var("MARCHLANDS_LLM_API_URL")
            .unwrap_or_else(|_| default_api_url(backend).to_owned());
        let model = std::env::var("MARCHLANDS_LLM_MODEL")
            .unwrap_or_else(|_| default_model(backend).to_owned());

        Ok(Self {
            backend,
            api_url,
            api_key,
            model,
        })
    }
}

fn parse_backend(value: &str) -> Result<BackendKind, NarratorError> {
    match value.to_lowercase().as_str() {
        "gemini" => Ok(BackendKind::Gemini),
        "openai" => Ok(BackendKind::OpenAi),
        other => Err(NarratorError::Config(format!(
            "unknown MARCHLANDS_LLM_BACKEND: {other} (expected gemini or openai)"
        ))),
    }
}

const fn default_api_url(backend: BackendKind) -> &'static str {
    match backend {
        BackendKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        BackendKind::OpenAi => "https://api.openai.com/v1",
    }
}

const fn default_model(backend: BackendKind) -> &'static str {
    match backend {
        BackendKind::Gemini => "gemini-2.0-flash",
        BackendKind::OpenAi => "gpt-4o-mini",
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn backend_names_parse_case_insensitively() {
        assert_eq!(parse_backend("Gemini").unwrap(), BackendKind::Gemini);
        assert_eq!(parse_backend("OPENAI").unwrap(), BackendKind::OpenAi);
        assert!(parse_backend("mistral").is_err());
    }

    #[test]
    fn defaults_follow_the_backend() {
        assert!(default_api_url(BackendKind::Gemini).contains("googleapis"));
        assert!(default_model(BackendKind::OpenAi).starts_with("gpt"));
    }
}
