//! Write path for raw memories — verbatim dedup by content hash.
//!
//! A repeated store of identical content strengthens the existing row
//! instead of creating a new one. The hash check races benignly with
//! concurrent writers: the partial unique index is the serialization
//! point, and a losing insert falls back to reinforcing the row the
//! winner created.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::db::queries;
use crate::error::{EngineError, Result};
use crate::ident;
use crate::memory::types::{Chunk, ChunkKind};
use crate::memory::MemoryEngine;
use crate::strength;

/// A verbatim re-store always reads as a middling encounter.
const STRENGTHEN_READING: f64 = 0.5;

/// Result of a store operation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StoreOutcome {
    /// A new memory chunk was created.
    Stored { id: String },
    /// Identical content already existed; it was reinforced.
    Strengthened { id: String, encounter_count: u32 },
}

impl MemoryEngine {
    /// Store raw content as a memory chunk, deduplicating verbatim
    /// repeats within the agent and scope.
    pub async fn store_memory(
        &self,
        agent_id: &str,
        content: &str,
        metadata: Option<&str>,
        scope: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<StoreOutcome> {
        if let Some(max) = self.config.max_content_length {
            let len = content.chars().count();
            if len > max {
                return Err(EngineError::InputTooLong { len, max });
            }
        }

        if let Some(meta) = metadata {
            serde_json::from_str::<serde_json::Value>(meta)
                .map_err(|e| EngineError::InvalidMetadata(e.to_string()))?;
        }

        let scope = queries::normalize_scope(scope);
        let hash = ident::content_hash(content);

        // Fast path: identical content already stored — no embedding.
        {
            let conn = self.lock_db();
            if let Some(existing) =
                queries::get_memory_by_hash(&conn, agent_id, &hash, Some(&scope))?
            {
                return strengthen(&conn, &existing);
            }
        }

        let embedding = self.embed(content, cancel).await?;

        let now = queries::now_iso();
        let chunk = Chunk {
            id: ident::new_chunk_id(),
            agent_id: agent_id.to_string(),
            scope: scope.clone(),
            content: content.to_string(),
            content_hash: Some(hash.clone()),
            embedding,
            metadata: metadata.map(str::to_string),
            kind: ChunkKind::Memory,
            running_intensity: 0.5,
            encounter_count: 1,
            access_count: 0,
            last_accessed_at: now.clone(),
            superseded_by: None,
            created_at: now,
        };

        let conn = self.lock_db();
        match queries::insert_chunk(&conn, &chunk) {
            Ok(()) => Ok(StoreOutcome::Stored { id: chunk.id }),
            Err(err) if is_unique_violation(&err) => {
                // Another writer inserted between the hash check and
                // the insert; reinforce their row instead.
                tracing::debug!(agent_id, "store_memory lost insert race, reinforcing");
                let existing = queries::get_memory_by_hash(&conn, agent_id, &hash, Some(&scope))?
                    .ok_or(err)?;
                strengthen(&conn, &existing)
            }
            Err(err) => Err(err),
        }
    }
}

fn strengthen(conn: &rusqlite::Connection, existing: &Chunk) -> Result<StoreOutcome> {
    let new_intensity = strength::updated_intensity(
        existing.running_intensity,
        existing.encounter_count,
        STRENGTHEN_READING,
    );
    queries::reinforce_chunk(conn, &existing.id, new_intensity, &queries::now_iso())?;
    Ok(StoreOutcome::Strengthened {
        id: existing.id.clone(),
        encounter_count: existing.encounter_count + 1,
    })
}

fn is_unique_violation(err: &EngineError) -> bool {
    matches!(
        err,
        EngineError::Storage(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
