//! Administrative chunk mutation — update and delete by id.
//!
//! These entry points back dashboard-style tooling rather than the
//! agent-facing tools. Updates re-embed and replace the row in one
//! transaction so a unique-constraint violation leaves no partial
//! state behind.

use tokio_util::sync::CancellationToken;

use crate::db::queries;
use crate::error::{EngineError, Result};
use crate::ident;
use crate::memory::types::{Chunk, ChunkKind};
use crate::memory::MemoryEngine;

impl MemoryEngine {
    /// Replace a chunk's content, re-embedding it and resetting its
    /// timestamps. Returns the updated row.
    pub async fn update_chunk(
        &self,
        id: &str,
        new_content: &str,
        cancel: &CancellationToken,
    ) -> Result<Chunk> {
        let existing = {
            let conn = self.lock_db();
            queries::get_chunk_by_id(&conn, id)?
                .ok_or_else(|| EngineError::ChunkNotFound(id.to_string()))?
        };

        let embedding = self.embed(new_content, cancel).await?;

        let content_hash = match existing.kind {
            ChunkKind::Memory => Some(ident::content_hash(new_content)),
            ChunkKind::Fact => None,
        };
        let now = queries::now_iso();

        let mut conn = self.lock_db();
        let tx = conn.transaction().map_err(EngineError::Storage)?;
        if !queries::replace_chunk_content(&tx, id, new_content, content_hash.as_deref(), &embedding, &now)? {
            return Err(EngineError::ChunkNotFound(id.to_string()));
        }

        let updated = queries::get_chunk_by_id(&tx, id)?
            .ok_or_else(|| EngineError::ChunkNotFound(id.to_string()))?;
        tx.commit().map_err(EngineError::Storage)?;

        Ok(updated)
    }

    /// Delete a chunk and clear any reference pointing at it. Returns
    /// whether a row was actually removed.
    pub fn delete_chunk(&self, id: &str) -> Result<bool> {
        let mut conn = self.lock_db();
        let tx = conn.transaction().map_err(EngineError::Storage)?;
        queries::clear_superseded_by_all(&tx, id)?;
        let deleted = queries::delete_chunk(&tx, id)?;
        tx.commit().map_err(EngineError::Storage)?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::testing::{MockEmbedder, MockLlm};
    use crate::db::open_memory_database;
    use crate::memory::EngineConfig;
    use std::sync::Arc;

    fn engine() -> MemoryEngine {
        let conn = open_memory_database().unwrap();
        MemoryEngine::new(
            conn,
            Arc::new(MockEmbedder::new(4).with_vector("updated text", vec![0.0, 1.0, 0.0, 0.0])),
            Arc::new(MockLlm::new()),
            EngineConfig::default(),
        )
        .unwrap()
    }

    fn seed(engine: &MemoryEngine, id: &str, kind: ChunkKind, content: &str) {
        let now = queries::now_iso();
        engine.with_connection(|conn| {
            queries::insert_chunk(
                conn,
                &Chunk {
                    id: id.to_string(),
                    agent_id: "a".into(),
                    scope: "".into(),
                    content: content.to_string(),
                    content_hash: match kind {
                        ChunkKind::Memory => Some(ident::content_hash(content)),
                        ChunkKind::Fact => None,
                    },
                    embedding: vec![1.0, 0.0, 0.0, 0.0],
                    metadata: None,
                    kind,
                    running_intensity: 0.5,
                    encounter_count: 1,
                    access_count: 0,
                    last_accessed_at: now.clone(),
                    superseded_by: None,
                    created_at: now.clone(),
                },
            )
            .unwrap();
        });
    }

    #[tokio::test]
    async fn update_replaces_content_hash_and_embedding() {
        let e = engine();
        seed(&e, "m1", ChunkKind::Memory, "original text");

        let updated = e
            .update_chunk("m1", "updated text", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(updated.content, "updated text");
        assert_eq!(
            updated.content_hash.as_deref(),
            Some(ident::content_hash("updated text").as_str())
        );
        assert_eq!(updated.embedding, vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(updated.created_at, updated.last_accessed_at);
    }

    #[tokio::test]
    async fn update_keeps_fact_hash_null() {
        let e = engine();
        seed(&e, "f1", ChunkKind::Fact, "original fact");

        let updated = e
            .update_chunk("f1", "updated text", &CancellationToken::new())
            .await
            .unwrap();
        assert!(updated.content_hash.is_none());
    }

    #[tokio::test]
    async fn update_missing_chunk_fails() {
        let e = engine();
        let err = e
            .update_chunk("ghost", "text", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ChunkNotFound(_)));
    }

    #[tokio::test]
    async fn update_to_colliding_hash_leaves_no_partial_state() {
        let e = engine();
        seed(&e, "m1", ChunkKind::Memory, "updated text");
        seed(&e, "m2", ChunkKind::Memory, "other text");

        // m2 -> "updated text" collides with m1's dedup hash.
        let err = e
            .update_chunk("m2", "updated text", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));

        e.with_connection(|conn| {
            let m2 = queries::get_chunk_by_id(conn, "m2").unwrap().unwrap();
            assert_eq!(m2.content, "other text");
            assert_eq!(
                m2.content_hash.as_deref(),
                Some(ident::content_hash("other text").as_str())
            );
        });
    }

    #[test]
    fn delete_clears_references() {
        let e = engine();
        seed(&e, "old", ChunkKind::Fact, "old fact");
        seed(&e, "new", ChunkKind::Fact, "new fact");
        e.with_connection(|conn| queries::supersede_chunk(conn, "new", "old").unwrap());

        assert!(e.delete_chunk("new").unwrap());

        e.with_connection(|conn| {
            assert!(queries::get_chunk_by_id(conn, "new").unwrap().is_none());
            let old = queries::get_chunk_by_id(conn, "old").unwrap().unwrap();
            assert!(old.superseded_by.is_none());
        });
    }

    #[test]
    fn delete_missing_returns_false() {
        let e = engine();
        assert!(!e.delete_chunk("ghost").unwrap());
    }
}
