#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use mnema::capability::{ChatMessage, EmbeddingProvider, LlmClient};
use mnema::db::{open_memory_database, queries};
use mnema::error::EngineError;
use mnema::memory::types::{Chunk, ChunkKind};
use mnema::memory::{EngineConfig, MemoryEngine};

/// Embedder mapping known texts to fixed vectors; unknown texts get a
/// fallback spike. An optional one-shot hook fires at the start of the
/// next embed call, which lets tests interleave writes into the
/// window between a dedup check and its insert.
pub struct MapEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    fallback: Vec<f32>,
    hook: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl MapEmbedder {
    pub fn new(dim: usize) -> Self {
        let mut fallback = vec![0.0; dim];
        fallback[0] = 1.0;
        Self {
            vectors: Mutex::new(HashMap::new()),
            fallback,
            hook: Mutex::new(None),
        }
    }

    pub fn set(&self, text: &str, vector: Vec<f32>) {
        self.vectors.lock().unwrap().insert(text.to_string(), vector);
    }

    pub fn set_hook(&self, hook: impl FnOnce() + Send + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }
}

#[async_trait]
impl EmbeddingProvider for MapEmbedder {
    async fn embed(&self, text: &str, cancel: &CancellationToken) -> mnema::error::Result<Vec<f32>> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if let Some(hook) = self.hook.lock().unwrap().take() {
            hook();
        }
        Ok(self
            .vectors
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }

    fn model_id(&self) -> &str {
        "test-embedder"
    }
}

/// LLM replaying queued responses in order; records every user prompt.
#[derive(Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedLlm {
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
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _system_prompt: &str,
        cancel: &CancellationToken,
    ) -> mnema::error::Result<String> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
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

/// Build an engine over a fresh in-memory database.
pub fn test_engine(embedder: Arc<MapEmbedder>, llm: Arc<ScriptedLlm>) -> MemoryEngine {
    let conn = open_memory_database().unwrap();
    MemoryEngine::new(conn, embedder, llm, EngineConfig::default()).unwrap()
}

/// Deterministic embedding with a spike at `seed`.
pub fn spike(dim: usize, seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    v[seed % dim] = 1.0;
    v
}

/// A vector whose cosine similarity to `spike(dim, seed)` is `sim`.
pub fn with_similarity(dim: usize, seed: usize, sim: f32) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    v[seed % dim] = sim;
    v[(seed + 1) % dim] = (1.0 - sim * sim).sqrt();
    v
}

/// Insert a chunk row directly, bypassing the engine pipelines.
pub fn seed_chunk(
    engine: &MemoryEngine,
    id: &str,
    agent: &str,
    scope: &str,
    kind: ChunkKind,
    content: &str,
    embedding: Vec<f32>,
    intensity: f64,
) {
    let now = queries::now_iso();
    seed_chunk_at(engine, id, agent, scope, kind, content, embedding, intensity, &now, &now);
}

/// Insert a chunk row with explicit timestamps.
#[allow(clippy::too_many_arguments)]
pub fn seed_chunk_at(
    engine: &MemoryEngine,
    id: &str,
    agent: &str,
    scope: &str,
    kind: ChunkKind,
    content: &str,
    embedding: Vec<f32>,
    intensity: f64,
    accessed: &str,
    created: &str,
) {
    engine.with_connection(|conn| {
        queries::insert_chunk(
            conn,
            &Chunk {
                id: id.to_string(),
                agent_id: agent.to_string(),
                scope: scope.to_string(),
                content: content.to_string(),
                content_hash: match kind {
                    ChunkKind::Memory => Some(mnema::ident::content_hash(content)),
                    ChunkKind::Fact => None,
                },
                embedding,
                metadata: None,
                kind,
                running_intensity: intensity,
                encounter_count: 1,
                access_count: 0,
                last_accessed_at: accessed.to_string(),
                superseded_by: None,
                created_at: created.to_string(),
            },
        )
        .unwrap();
    });
}

/// Fetch a chunk by id through the engine's connection.
pub fn get_chunk(engine: &MemoryEngine, id: &str) -> Option<Chunk> {
    engine.with_connection(|conn| queries::get_chunk_by_id(conn, id).unwrap())
}

/// Count all chunk rows (active and superseded).
pub fn chunk_count(engine: &MemoryEngine) -> i64 {
    engine.with_connection(|conn| {
        conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0)).unwrap()
    })
}
