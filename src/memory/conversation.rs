//! Full-text search over an externally owned conversation table.
//!
//! The caller owns a `(id, role, content, created_at)` table plus an
//! FTS5 shadow table named `<table>_fts` indexing `content` with
//! `content_rowid = id`. This adapter only reads. The table name is
//! validated at construction; the FTS query itself degrades to
//! structured outcomes when the table or the FTS5 module is missing.

use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::Connection;
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::memory::MemoryEngine;

/// One matched conversation message.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationRow {
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// Outcome of a conversation search.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConversationSearchOutcome {
    Rows(Vec<ConversationRow>),
    /// The table or the FTS5 module is missing.
    FtsUnavailable { reason: String },
    /// The FTS query itself failed (e.g. MATCH syntax).
    QueryError { reason: String },
}

/// Read-only FTS adapter over a caller-owned messages table.
#[derive(Debug)]
pub struct ConversationSearch {
    db: Arc<Mutex<Connection>>,
    table: String,
}

impl ConversationSearch {
    /// Validate the table name and build the adapter. The name is
    /// interpolated into SQL, so only `[A-Za-z_][A-Za-z0-9_]*` passes.
    pub fn new(db: Arc<Mutex<Connection>>, table: &str) -> Result<Self> {
        if !is_safe_identifier(table) {
            return Err(EngineError::UnsafeIdentifier(table.to_string()));
        }
        Ok(Self {
            db,
            table: table.to_string(),
        })
    }

    /// Run a full-text query, best matches first.
    pub fn search(&self, query: &str, limit: usize) -> Result<ConversationSearchOutcome> {
        let conn = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        let sql = format!(
            "SELECT m.role, m.content, m.created_at \
             FROM {table} m JOIN {table}_fts f ON f.rowid = m.id \
             WHERE {table}_fts MATCH ?1 ORDER BY rank LIMIT ?2",
            table = self.table
        );

        let run = || -> rusqlite::Result<Vec<ConversationRow>> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![query, limit as i64], |row| {
                    Ok(ConversationRow {
                        role: row.get(0)?,
                        content: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        };

        match run() {
            Ok(rows) => Ok(ConversationSearchOutcome::Rows(rows)),
            Err(err) => classify_fts_error(err),
        }
    }
}

impl MemoryEngine {
    /// Build a conversation adapter sharing this engine's connection.
    pub fn conversation_search(&self, table: &str) -> Result<ConversationSearch> {
        ConversationSearch::new(Arc::clone(&self.db), table)
    }
}

fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Sort an FTS failure into a structured outcome, propagating errors
/// that have nothing to do with the FTS query (I/O, corruption, OOM).
fn classify_fts_error(err: rusqlite::Error) -> Result<ConversationSearchOutcome> {
    let message = err.to_string();
    if message.contains("no such table") || message.contains("no such module") {
        return Ok(ConversationSearchOutcome::FtsUnavailable { reason: message });
    }
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::Unknown
                || e.code == rusqlite::ErrorCode::ApiMisuse =>
        {
            Ok(ConversationSearchOutcome::QueryError { reason: message })
        }
        _ => Err(EngineError::Storage(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_messages() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE messages (
                 id INTEGER PRIMARY KEY,
                 role TEXT NOT NULL,
                 content TEXT NOT NULL,
                 created_at TEXT NOT NULL
             );
             CREATE VIRTUAL TABLE messages_fts USING fts5(content, content_rowid=id, content=messages);
             INSERT INTO messages (id, role, content, created_at) VALUES
                 (1, 'user', 'How do I reset the staging database?', '2026-01-01T00:00:00Z'),
                 (2, 'assistant', 'Run the reset script from the ops repo.', '2026-01-01T00:00:05Z'),
                 (3, 'user', 'What is for lunch?', '2026-01-01T00:01:00Z');
             INSERT INTO messages_fts (rowid, content) SELECT id, content FROM messages;",
        )
        .unwrap();
        Arc::new(Mutex::new(conn))
    }

    #[test]
    fn rejects_unsafe_table_names() {
        let db = db_with_messages();
        for bad in ["messages; DROP TABLE x", "1messages", "", "tab le", "m-essages"] {
            let err = ConversationSearch::new(Arc::clone(&db), bad).unwrap_err();
            assert!(matches!(err, EngineError::UnsafeIdentifier(_)), "{bad}");
        }
        assert!(ConversationSearch::new(db, "_messages2").is_ok());
    }

    #[test]
    fn matches_and_orders_by_rank() {
        let adapter = ConversationSearch::new(db_with_messages(), "messages").unwrap();
        let outcome = adapter.search("database", 10).unwrap();
        let ConversationSearchOutcome::Rows(rows) = outcome else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].role, "user");
        assert!(rows[0].content.contains("staging database"));
    }

    #[test]
    fn respects_limit() {
        let adapter = ConversationSearch::new(db_with_messages(), "messages").unwrap();
        let ConversationSearchOutcome::Rows(rows) = adapter.search("the", 1).unwrap() else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn missing_table_is_fts_unavailable() {
        let conn = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));
        let adapter = ConversationSearch::new(conn, "absent").unwrap();
        let outcome = adapter.search("anything", 10).unwrap();
        assert!(matches!(
            outcome,
            ConversationSearchOutcome::FtsUnavailable { .. }
        ));
    }

    #[test]
    fn bad_match_syntax_is_query_error() {
        let adapter = ConversationSearch::new(db_with_messages(), "messages").unwrap();
        let outcome = adapter.search("\"unbalanced", 10).unwrap();
        assert!(matches!(
            outcome,
            ConversationSearchOutcome::QueryError { .. }
        ));
    }
}
