//! Core memory engine — remembering, storing, recalling, forgetting.
//!
//! [`MemoryEngine`] owns the shared database connection and the two
//! injected capabilities. The write paths live in [`remember`] and
//! [`store`], the read path in [`recall`], deletion in [`forget`],
//! named buffers in [`blocks`], conversation search in
//! [`conversation`], and administrative mutation in [`chunks`]. Type
//! definitions live in [`types`].

pub mod blocks;
pub mod chunks;
pub mod conversation;
pub mod extract;
pub mod forget;
pub mod recall;
pub mod remember;
pub mod store;
pub mod types;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tokio_util::sync::CancellationToken;

use crate::capability::{EmbeddingProvider, LlmClient};
use crate::db::migrations;
use crate::error::{EngineError, Result};

/// Engine tunables. The defaults match production behavior; tests
/// shrink the limits to exercise the clamps.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum input length for `remember_facts`, in characters.
    pub max_text_length: usize,
    /// Optional maximum content length for `store_memory`.
    pub max_content_length: Option<usize>,
    /// Cap on the working set loaded for conflict resolution.
    pub max_search_facts: usize,
    /// Cap on the candidate set scanned by recall and forget.
    pub max_search_chunks: usize,
    /// Recall results below this similarity are dropped.
    pub min_similarity: f64,
    /// Default similarity threshold for `forget_memory`.
    pub forget_threshold: f64,
    /// Below this similarity a new fact is a plain insert.
    pub ambiguous_threshold: f64,
    /// Above this similarity a new fact is a duplicate, no LLM call.
    pub duplicate_threshold: f64,
    /// Candidates considered per extracted fact.
    pub top_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_text_length: 10_000,
            max_content_length: None,
            max_search_facts: 10_000,
            max_search_chunks: 10_000,
            min_similarity: 0.1,
            forget_threshold: 0.7,
            ambiguous_threshold: 0.78,
            duplicate_threshold: 0.93,
            top_k: 5,
        }
    }
}

/// The memory engine. Cheap to clone; all clones share one database
/// connection and one pair of capability objects.
#[derive(Clone)]
pub struct MemoryEngine {
    pub(crate) db: Arc<Mutex<Connection>>,
    pub(crate) embedder: Arc<dyn EmbeddingProvider>,
    pub(crate) llm: Arc<dyn LlmClient>,
    pub(crate) config: EngineConfig,
}

impl MemoryEngine {
    /// Wrap an opened database and capabilities into an engine.
    ///
    /// Verifies (or sets, on first use) the embedding-model pin; a pin
    /// mismatch fails the construction.
    pub fn new(
        conn: Connection,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        config: EngineConfig,
    ) -> Result<Self> {
        migrations::verify_embedding_model(&conn, embedder.model_id())?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            embedder,
            llm,
            config,
        })
    }

    /// Lock the shared connection. A poisoned lock is recovered: the
    /// connection itself stays valid after a panicking holder.
    pub(crate) fn lock_db(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a closure against the shared connection, for read-only
    /// inspection from the CLI and tests.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        f(&self.lock_db())
    }

    /// Embed text through the injected capability, honoring
    /// cancellation before the call is even issued.
    pub(crate) async fn embed(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<f32>> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        self.embedder.embed(text, cancel).await
    }
}

/// Hours elapsed between a stored RFC 3339 timestamp and `now`.
/// Unparseable timestamps count as zero elapsed time.
pub(crate) fn hours_since(timestamp: &str, now: &DateTime<Utc>) -> f64 {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(then) => {
            let secs = (*now - then.with_timezone(&Utc)).num_milliseconds() as f64 / 1000.0;
            (secs / 3600.0).max(0.0)
        }
        Err(_) => 0.0,
    }
}

/// Days elapsed between a stored RFC 3339 timestamp and `now`.
pub(crate) fn days_since(timestamp: &str, now: &DateTime<Utc>) -> f64 {
    hours_since(timestamp, now) / 24.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_since_computes_elapsed() {
        let now = DateTime::parse_from_rfc3339("2026-01-02T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let h = hours_since("2026-01-01T00:00:00Z", &now);
        assert!((h - 24.0).abs() < 1e-6);
        assert!((days_since("2026-01-01T00:00:00Z", &now) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn hours_since_is_never_negative() {
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(hours_since("2026-06-01T00:00:00Z", &now), 0.0);
    }

    #[test]
    fn unparseable_timestamp_counts_as_fresh() {
        let now = Utc::now();
        assert_eq!(hours_since("not-a-timestamp", &now), 0.0);
    }
}
