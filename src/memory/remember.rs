//! The remember-facts pipeline.
//!
//! Free-form text goes in; extracted facts are resolved one at a time
//! against the agent's active facts. Each fact is independently
//! committed — there is no outer transaction over the batch, so a
//! failure on fact k leaves facts 1..k-1 in place and visible through
//! the returned action log.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::db::queries;
use crate::error::{EngineError, Result};
use crate::ident;
use crate::memory::extract::{self, ConflictVerdict};
use crate::memory::types::{Chunk, ChunkKind};
use crate::memory::MemoryEngine;
use crate::strength;
use crate::vector;

/// What happened to one extracted fact.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FactAction {
    /// A new fact chunk was created.
    Inserted { content: String, intensity: f64 },
    /// An existing fact absorbed this one as a duplicate encounter.
    Reinforced {
        content: String,
        old_intensity: f64,
        new_intensity: f64,
    },
    /// A new fact replaced a contradicted existing one.
    Superseded {
        new_content: String,
        old_content: String,
    },
}

/// A working-set candidate scored against the current fact.
struct Scored {
    index: usize,
    similarity: f64,
}

impl MemoryEngine {
    /// Extract facts from `text` and fold them into the agent's fact
    /// store, returning one action per extracted fact in order.
    pub async fn remember_facts(
        &self,
        agent_id: &str,
        text: &str,
        scope: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FactAction>> {
        let len = text.chars().count();
        if len > self.config.max_text_length {
            return Err(EngineError::InputTooLong {
                len,
                max: self.config.max_text_length,
            });
        }

        let facts = extract::extract_facts(self.llm.as_ref(), text, cancel).await?;
        if facts.is_empty() {
            return Ok(Vec::new());
        }

        let scope = queries::normalize_scope(scope);

        // The working set for the whole batch: active facts in this
        // agent and scope, mutated in memory as the batch commits so
        // later facts see earlier ones.
        let mut working_set = {
            let conn = self.lock_db();
            queries::get_active_chunks(
                &conn,
                agent_id,
                ChunkKind::Fact,
                self.config.max_search_facts as i64,
                Some(&[scope.clone()]),
            )?
        };

        tracing::debug!(
            agent_id,
            facts = facts.len(),
            candidates = working_set.len(),
            "resolving extracted facts"
        );

        let mut actions = Vec::with_capacity(facts.len());

        for fact in facts {
            let embedding = self.embed(&fact.fact, cancel).await?;

            let top = top_candidates(&working_set, &embedding, self.config.top_k)?;
            let best = top.first();

            let verdict = match best {
                None => None,
                Some(s) if s.similarity < self.config.ambiguous_threshold => None,
                Some(s) if s.similarity > self.config.duplicate_threshold => {
                    Some(ConflictVerdict::Duplicate)
                }
                Some(s) => {
                    let existing = &working_set[s.index].content;
                    Some(
                        extract::classify_conflict(
                            self.llm.as_ref(),
                            &fact.fact,
                            existing,
                            cancel,
                        )
                        .await?,
                    )
                }
            };

            match verdict {
                None | Some(ConflictVerdict::Distinct) => {
                    let chunk = compose_fact(agent_id, &scope, &fact.fact, fact.intensity, embedding);
                    {
                        let conn = self.lock_db();
                        queries::insert_chunk(&conn, &chunk)?;
                    }
                    actions.push(FactAction::Inserted {
                        content: chunk.content.clone(),
                        intensity: chunk.running_intensity,
                    });
                    working_set.push(chunk);
                }
                Some(ConflictVerdict::Duplicate) => {
                    let index = best.expect("duplicate verdict implies a candidate").index;
                    let (old_intensity, new_intensity) = {
                        let existing = &working_set[index];
                        let new_intensity = strength::updated_intensity(
                            existing.running_intensity,
                            existing.encounter_count,
                            fact.intensity,
                        );
                        (existing.running_intensity, new_intensity)
                    };
                    let now = queries::now_iso();
                    {
                        let conn = self.lock_db();
                        queries::reinforce_chunk(&conn, &working_set[index].id, new_intensity, &now)?;
                    }
                    // Mirror the committed row so later facts in this
                    // batch see the updated counts.
                    let existing = &mut working_set[index];
                    existing.running_intensity = new_intensity.clamp(0.0, 1.0);
                    existing.encounter_count += 1;
                    existing.access_count += 1;
                    existing.last_accessed_at = now;
                    actions.push(FactAction::Reinforced {
                        content: existing.content.clone(),
                        old_intensity,
                        new_intensity,
                    });
                }
                Some(ConflictVerdict::Supersedes) => {
                    let index = best.expect("supersedes verdict implies a candidate").index;
                    let chunk = compose_fact(agent_id, &scope, &fact.fact, fact.intensity, embedding);
                    let old_id = working_set[index].id.clone();
                    {
                        // Insert-then-mark in one transaction so a
                        // dangling superseded_by is never observable.
                        let mut conn = self.lock_db();
                        let tx = conn.transaction().map_err(EngineError::Storage)?;
                        queries::insert_chunk(&tx, &chunk)?;
                        queries::supersede_chunk(&tx, &chunk.id, &old_id)?;
                        tx.commit().map_err(EngineError::Storage)?;
                    }
                    let old = working_set.swap_remove(index);
                    actions.push(FactAction::Superseded {
                        new_content: chunk.content.clone(),
                        old_content: old.content,
                    });
                    working_set.push(chunk);
                }
            }
        }

        Ok(actions)
    }
}

/// Score every working-set entry and keep the top K by similarity.
fn top_candidates(working_set: &[Chunk], embedding: &[f32], k: usize) -> Result<Vec<Scored>> {
    let mut scored = Vec::with_capacity(working_set.len());
    for (index, chunk) in working_set.iter().enumerate() {
        let similarity = vector::cosine_similarity(embedding, &chunk.embedding)?;
        scored.push(Scored { index, similarity });
    }
    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(k);
    Ok(scored)
}

/// Compose a brand-new fact chunk.
fn compose_fact(
    agent_id: &str,
    scope: &str,
    content: &str,
    intensity: f64,
    embedding: Vec<f32>,
) -> Chunk {
    let now = queries::now_iso();
    Chunk {
        id: ident::new_chunk_id(),
        agent_id: agent_id.to_string(),
        scope: scope.to_string(),
        content: content.to_string(),
        content_hash: None,
        embedding,
        metadata: None,
        kind: ChunkKind::Fact,
        running_intensity: intensity.clamp(0.0, 1.0),
        encounter_count: 1,
        access_count: 0,
        last_accessed_at: now.clone(),
        superseded_by: None,
        created_at: now,
    }
}
