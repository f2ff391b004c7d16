//! HTTP implementations of the embedding and LLM capabilities.
//!
//! Both speak the OpenAI-compatible wire shapes (`/embeddings` and
//! `/chat/completions`), which every common local and hosted provider
//! exposes. Cancellation aborts the in-flight request.

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::{ChatMessage, EmbeddingProvider, LlmClient};
use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{EngineError, Result};

/// Embedding over an OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl HttpEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<f32>> {
        let mut body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        if let Some(dims) = self.dimensions {
            body["dimensions"] = serde_json::json!(dims);
        }

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            result = request.send() => {
                result.map_err(|e| EngineError::Embedding(e.to_string()))?
            }
        };

        if !response.status().is_success() {
            return Err(EngineError::Embedding(format!(
                "embedding endpoint returned HTTP {}",
                response.status()
            )));
        }

        let parsed: EmbeddingResponse = tokio::select! {
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            result = response.json() => {
                result.map_err(|e| EngineError::Embedding(e.to_string()))?
            }
        };

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EngineError::Embedding("empty embedding response".into()))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Completion over an OpenAI-compatible `/chat/completions` endpoint.
pub struct HttpLlmClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let mut wire_messages = vec![serde_json::json!({
            "role": "system",
            "content": system_prompt,
        })];
        for m in messages {
            wire_messages.push(serde_json::json!({
                "role": m.role,
                "content": m.content,
            }));
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": wire_messages,
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            result = request.send() => {
                result.map_err(|e| EngineError::Llm(e.to_string()))?
            }
        };

        if !response.status().is_success() {
            return Err(EngineError::Llm(format!(
                "llm endpoint returned HTTP {}",
                response.status()
            )));
        }

        let parsed: CompletionResponse = tokio::select! {
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            result = response.json() => {
                result.map_err(|e| EngineError::Llm(e.to_string()))?
            }
        };

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EngineError::Llm("empty completion response".into()))
    }
}
