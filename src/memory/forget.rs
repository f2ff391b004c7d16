//! Explicit forgetting — semantic match and transactional hard delete.
//!
//! Forgetting a chunk that superseded an older one resurrects the
//! predecessor: the back-pointer is cleared inside the same
//! transaction that deletes the match, bounded to the deleting agent
//! and the match's scope so stale cross-agent references stay inert.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::db::queries;
use crate::error::{EngineError, Result};
use crate::memory::MemoryEngine;
use crate::vector;

/// Result of a forget operation.
#[derive(Debug, Clone, Serialize)]
pub struct ForgetResult {
    /// Contents of the deleted chunks, in match order.
    pub deleted: Vec<String>,
}

impl MemoryEngine {
    /// Delete every active chunk whose similarity to `description`
    /// meets the threshold (default 0.7). Already-superseded chunks
    /// are invisible to the scan; they only become reachable again
    /// when their superseder is deleted here.
    pub async fn forget_memory(
        &self,
        agent_id: &str,
        description: &str,
        threshold: Option<f64>,
        scope: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<ForgetResult> {
        let threshold = threshold.unwrap_or(self.config.forget_threshold);

        let query_embedding = self.embed(description, cancel).await?;

        let scopes = scope.map(|s| vec![queries::normalize_scope(Some(s))]);
        let matches: Vec<(String, String, String)> = {
            let conn = self.lock_db();
            let candidates = queries::get_all_active_chunks(
                &conn,
                agent_id,
                self.config.max_search_chunks as i64,
                scopes.as_deref(),
            )?;

            let mut matches = Vec::new();
            for chunk in candidates {
                let similarity = vector::cosine_similarity(&query_embedding, &chunk.embedding)?;
                if similarity >= threshold {
                    matches.push((chunk.id, chunk.scope, chunk.content));
                }
            }
            matches
        };

        if matches.is_empty() {
            return Ok(ForgetResult { deleted: Vec::new() });
        }

        // One transaction for the whole deletion: resurrect each
        // match's direct predecessors, then delete the match.
        let deleted = {
            let mut conn = self.lock_db();
            let tx = conn.transaction().map_err(EngineError::Storage)?;
            let mut deleted = Vec::with_capacity(matches.len());
            for (id, chunk_scope, content) in matches {
                queries::clear_superseded_by_scoped(&tx, &id, agent_id, &chunk_scope)?;
                queries::delete_chunk(&tx, &id)?;
                deleted.push(content);
            }
            tx.commit().map_err(EngineError::Storage)?;
            deleted
        };

        tracing::info!(agent_id, count = deleted.len(), "chunks forgotten");
        Ok(ForgetResult { deleted })
    }
}
