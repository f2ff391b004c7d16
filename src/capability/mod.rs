//! Injected capabilities: embedding and LLM completion.
//!
//! The engine is polymorphic over these two traits and never talks to
//! a provider directly. Both calls are the only suspension points in
//! the core, and both must honor the cancellation token.

pub mod http;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::Result;

/// One chat message for the LLM capability.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Trait for embedding text into fixed-width float vectors.
///
/// All vectors produced against one database must share dimensionality;
/// the model id is pinned in the database on first use.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text into a vector.
    async fn embed(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<f32>>;

    /// Identifier recorded as the database's embedding-model pin.
    fn model_id(&self) -> &str;
}

/// Trait for non-streaming LLM completion.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete a conversation under a system prompt, returning the
    /// full response text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String>;
}

/// Create the embedding provider from config.
pub fn create_embedding_provider(config: &EmbeddingConfig) -> Box<dyn EmbeddingProvider> {
    Box::new(http::HttpEmbeddingProvider::new(config))
}

/// Create the LLM client from config.
pub fn create_llm_client(config: &LlmConfig) -> Box<dyn LlmClient> {
    Box::new(http::HttpLlmClient::new(config))
}

/// Deterministic in-process capabilities for unit tests.
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Embedder that maps known texts to fixed vectors and everything
    /// else to a fallback vector.
    pub struct MockEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        fallback: Vec<f32>,
    }

    impl MockEmbedder {
        pub fn new(dim: usize) -> Self {
            let mut fallback = vec![0.0; dim];
            fallback[0] = 1.0;
            Self {
                vectors: HashMap::new(),
                fallback,
            }
        }

        pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
            self.vectors.insert(text.to_string(), vector);
            self
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbedder {
        async fn embed(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<f32>> {
            if cancel.is_cancelled() {
                return Err(crate::error::EngineError::Cancelled);
            }
            Ok(self
                .vectors
                .get(text)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone()))
        }

        fn model_id(&self) -> &str {
            "mock-embedder"
        }
    }

    /// LLM that replays queued responses in order and records every
    /// call it receives.
    #[derive(Default)]
    pub struct MockLlm {
        responses: Mutex<VecDeque<String>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockLlm {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn queue(&self, response: &str) {
            self.responses.lock().unwrap().push_back(response.to_string());
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlm {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _system_prompt: &str,
            cancel: &CancellationToken,
        ) -> Result<String> {
            if cancel.is_cancelled() {
                return Err(crate::error::EngineError::Cancelled);
            }
            let user = messages.first().map(|m| m.content.clone()).unwrap_or_default();
            self.calls.lock().unwrap().push(user);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }
    }
}
