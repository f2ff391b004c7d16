//! Read path — brute-force scored recall.
//!
//! Candidates are fetched most-recently-accessed first, scored in
//! process against the query embedding, filtered by similarity and
//! effective strength, and ranked by the composite score. Returned
//! chunks get a best-effort retrieval boost; a busy/locked database
//! skips the boost rather than failing the search.

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::db::queries;
use crate::error::Result;
use crate::memory::types::ChunkKind;
use crate::memory::{days_since, hours_since, MemoryEngine};
use crate::strength;
use crate::vector;

const DEFAULT_LIMIT: usize = 10;
const MIN_LIMIT: usize = 1;
const MAX_LIMIT: usize = 50;

/// One ranked recall result. Values are a snapshot from before the
/// retrieval boost.
#[derive(Debug, Clone, Serialize)]
pub struct RecallResult {
    pub id: String,
    pub content: String,
    pub kind: ChunkKind,
    pub scope: String,
    pub similarity: f64,
    pub strength: f64,
    pub recency: f64,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    pub created_at: String,
}

impl MemoryEngine {
    /// Search the agent's active chunks by semantic similarity.
    pub async fn recall_memories(
        &self,
        agent_id: &str,
        query: &str,
        limit: Option<usize>,
        kind: Option<ChunkKind>,
        scope: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RecallResult>> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(MIN_LIMIT, MAX_LIMIT);

        let query_embedding = self.embed(query, cancel).await?;

        let scope = queries::normalize_scope(scope);
        let candidates = {
            let conn = self.lock_db();
            let cap = self.config.max_search_chunks as i64;
            match kind {
                Some(kind) => queries::get_active_chunks(
                    &conn,
                    agent_id,
                    kind,
                    cap,
                    Some(&[scope.clone()]),
                )?,
                None => queries::get_all_active_chunks(&conn, agent_id, cap, Some(&[scope]))?,
            }
        };

        let now = Utc::now();
        let mut results: Vec<(RecallResult, f64)> = Vec::new();
        for chunk in &candidates {
            let similarity = vector::cosine_similarity(&query_embedding, &chunk.embedding)?;
            if similarity < self.config.min_similarity {
                continue;
            }
            let strength_now = strength::effective_strength(
                chunk.running_intensity,
                chunk.access_count,
                hours_since(&chunk.last_accessed_at, &now),
            );
            if strength_now < strength::STRENGTH_FLOOR {
                continue;
            }
            let recency = strength::recency_score(days_since(&chunk.created_at, &now));
            let score = strength::search_score(similarity, strength_now, recency);
            results.push((
                RecallResult {
                    id: chunk.id.clone(),
                    content: chunk.content.clone(),
                    kind: chunk.kind,
                    scope: chunk.scope.clone(),
                    similarity,
                    strength: strength_now,
                    recency,
                    score,
                    metadata: chunk.metadata.clone(),
                    created_at: chunk.created_at.clone(),
                },
                chunk.running_intensity,
            ));
        }

        results.sort_by(|a, b| {
            b.0.score
                .partial_cmp(&a.0.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        // Best-effort retrieval boost. Cancellation skips the writes;
        // a busy or locked database skips a chunk's boost without
        // failing the search. Runs (vacuously) even on zero results.
        if !cancel.is_cancelled() {
            self.boost_returned(&results)?;
        }

        Ok(results.into_iter().map(|(r, _)| r).collect())
    }

    fn boost_returned(&self, results: &[(RecallResult, f64)]) -> Result<()> {
        let conn = self.lock_db();
        let now = queries::now_iso();
        for (result, intensity) in results {
            let boosted = strength::retrieval_boost(*intensity);
            match queries::touch_chunk(&conn, &result.id, boosted, &now) {
                Ok(()) => {}
                Err(err) if err.is_transient_busy() => {
                    tracing::warn!(id = %result.id, "retrieval boost skipped: database busy");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}
