// Copyright (c) 2026 HeartPredict
// SPDX-License-Identifier: AGPL-3.0

// Ollama LLM Provider Adapter
//
// Anti-Corruption Layer for Ollama local models, for deployments where
// patient data may not leave the host.

use super::{error_from_response, http_client, map_transport_error};
use crate::domain::llm::{
    FinishReason, GenerationOptions, GenerationResponse, LLMError, LLMProvider, TokenUsage,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OllamaAdapter {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
    eval_count: Option<u32>,
    prompt_eval_count: Option<u32>,
}

impl OllamaAdapter {
    pub fn new(endpoint: String, model: String, timeout: Duration) -> Result<Self, LLMError> {
        Ok(Self {
            client: http_client(timeout)?,
            endpoint,
            model,
            timeout,
        })
    }
}

#[async_trait]
impl LLMProvider for OllamaAdapter {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: OllamaOptions {
                temperature: options.temperature,
                top_k: options.top_k,
                top_p: options.top_p,
                num_predict: options.max_tokens.map(|t| t as i32),
            },
        };

        let url = format!("{}/api/generate", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(error_from_response(response, &self.model).await);
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LLMError::Provider(format!("Failed to parse response: {}", e)))?;

        let prompt_tokens = ollama_response.prompt_eval_count.unwrap_or(0);
        let completion_tokens = ollama_response.eval_count.unwrap_or(0);

        Ok(GenerationResponse {
            text: ollama_response.response,
            usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            provider: "ollama".to_string(),
            model: self.model.clone(),
            finish_reason: if ollama_response.done {
                FinishReason::Stop
            } else {
                FinishReason::Length
            },
        })
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        let url = format!("{}/api/tags", self.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(LLMError::Network(format!("HTTP {}", response.status())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_non_streaming() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/generate")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"model": "llama3", "stream": false}),
            ))
            .with_status(200)
            .with_body(r#"{"response":"local text","done":true,"eval_count":4,"prompt_eval_count":6}"#)
            .create_async()
            .await;

        let adapter =
            OllamaAdapter::new(server.url(), "llama3".into(), Duration::from_secs(5)).unwrap();
        let response = adapter
            .generate("hi", &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(response.text, "local text");
        assert_eq!(response.usage.total_tokens, 10);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_model() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/generate")
            .with_status(404)
            .create_async()
            .await;

        let adapter =
            OllamaAdapter::new(server.url(), "llama3".into(), Duration::from_secs(5)).unwrap();
        let err = adapter
            .generate("hi", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::ModelNotFound(m) if m == "llama3"));
    }

    #[tokio::test]
    async fn test_health_check_lists_tags() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[]}"#)
            .create_async()
            .await;

        let adapter =
            OllamaAdapter::new(server.url(), "llama3".into(), Duration::from_secs(5)).unwrap();
        assert!(adapter.health_check().await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_health_check_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(500)
            .create_async()
            .await;

        let adapter =
            OllamaAdapter::new(server.url(), "llama3".into(), Duration::from_secs(5)).unwrap();
        let err = adapter.health_check().await.unwrap_err();
        assert!(matches!(err, LLMError::Network(msg) if msg.contains("500")));
    }
}
