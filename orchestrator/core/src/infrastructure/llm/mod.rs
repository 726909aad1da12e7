// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Infrastructure - Anti-Corruption Layer Implementations
//
// Each adapter translates between the domain LLMProvider interface and one
// vendor API. The Explainer only ever holds an `Arc<dyn LLMProvider>`.

pub mod gemini;
pub mod ollama;
pub mod openai;

pub use gemini::GeminiAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAIAdapter;

use crate::domain::llm::{LLMError, LLMProvider};
use crate::domain::node_config::{GenerationConfig, ProviderType};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build the provider the manifest selects.
pub fn build_provider(config: &GenerationConfig) -> anyhow::Result<Arc<dyn LLMProvider>> {
    let timeout = config.timeout();
    let provider: Arc<dyn LLMProvider> = match config.provider_type {
        ProviderType::Gemini => {
            let api_key = config
                .resolve_api_key()
                .context("Failed to resolve Gemini API key")?
                .ok_or_else(|| anyhow::anyhow!("Gemini provider requires an api_key"))?;
            Arc::new(GeminiAdapter::new(
                config.endpoint.clone(),
                api_key,
                config.model.clone(),
                timeout,
            )?)
        }
        ProviderType::OpenAI => {
            let api_key = config
                .resolve_api_key()
                .context("Failed to resolve OpenAI API key")?
                .unwrap_or_default();
            Arc::new(OpenAIAdapter::new(
                config.endpoint.clone(),
                api_key,
                config.model.clone(),
                timeout,
            )?)
        }
        ProviderType::Ollama => Arc::new(OllamaAdapter::new(
            config.endpoint.clone(),
            config.model.clone(),
            timeout,
        )?),
    };

    info!(
        provider = config.provider_type.as_str(),
        model = %config.model,
        timeout_secs = timeout.as_secs(),
        "Text generation provider configured"
    );
    Ok(provider)
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, LLMError> {
    reqwest::Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(|e| LLMError::Network(format!("failed to build HTTP client: {}", e)))
}

/// Timeouts are reported separately from other transport failures.
pub(crate) fn map_transport_error(error: reqwest::Error, timeout: Duration) -> LLMError {
    if error.is_timeout() {
        LLMError::Timeout(timeout.as_secs())
    } else {
        LLMError::Network(error.to_string())
    }
}

/// Turn a non-success response into the matching LLMError.
pub(crate) async fn error_from_response(response: reqwest::Response, model: &str) -> LLMError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    LLMError::from_status(status, body, model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_ollama_needs_no_key() {
        let config = GenerationConfig {
            provider_type: ProviderType::Ollama,
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            model: "llama3".into(),
            ..GenerationConfig::default()
        };
        assert!(build_provider(&config).is_ok());
    }

    #[test]
    fn test_build_gemini_requires_key() {
        let config = GenerationConfig {
            api_key: None,
            ..GenerationConfig::default()
        };
        let err = build_provider(&config).err().unwrap();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_build_gemini_with_literal_key() {
        let config = GenerationConfig {
            api_key: Some("literal-key".into()),
            ..GenerationConfig::default()
        };
        assert!(build_provider(&config).is_ok());
    }
}
