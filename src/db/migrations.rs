//! Forward-only schema migration framework.
//!
//! Tracks the schema version in `engine_meta` and runs sequential
//! migrations to bring the database up to [`CURRENT_SCHEMA_VERSION`].
//! Also owns the embedding-model pin.

use rusqlite::Connection;

use crate::error::{EngineError, Result};

/// The schema version that the current binary expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Get the current schema version from the database.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM engine_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Update the stored schema version.
fn update_schema_version(conn: &Connection, version: u32) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE engine_meta SET value = ?1 WHERE key = 'schema_version'",
        [version.to_string()],
    )?;
    Ok(())
}

/// Get the stored embedding model identifier, if any.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    match conn.query_row(
        "SELECT value FROM engine_meta WHERE key = 'embedding_model'",
        [],
        |row| row.get::<_, String>(0),
    ) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Pin the embedding model on first use; fail on any later mismatch.
///
/// Once a database has been embedded with one model, vectors from a
/// different model are not comparable, so the mismatch is fatal at open.
pub fn verify_embedding_model(conn: &Connection, model: &str) -> Result<()> {
    match get_embedding_model(conn).map_err(EngineError::Storage)? {
        None => {
            conn.execute(
                "INSERT INTO engine_meta (key, value) VALUES ('embedding_model', ?1)",
                [model],
            )
            .map_err(EngineError::Storage)?;
            tracing::info!(model, "embedding model pinned");
            Ok(())
        }
        Some(stored) if stored == model => Ok(()),
        Some(stored) => Err(EngineError::ModelMismatch {
            stored,
            configured: model.to_string(),
        }),
    }
}

/// Whether a table already has the given column.
fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns.iter().any(|c| c == column))
}

/// Run any pending forward-only migrations. Each migration runs in a
/// transaction.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    let mut version = get_schema_version(conn)?;
    tracing::debug!(
        schema_version = version,
        target = CURRENT_SCHEMA_VERSION,
        "checking migrations"
    );

    while version < CURRENT_SCHEMA_VERSION {
        let next = version + 1;
        tracing::info!(from = version, to = next, "running migration");

        match next {
            2 => migrate_v1_to_v2(conn)?,
            _ => {
                tracing::error!(version = next, "unknown migration target");
                break;
            }
        }

        update_schema_version(conn, next)?;
        version = next;
    }

    Ok(())
}

/// Migration v1 → v2: introduce scoped partitioning.
///
/// Adds the `scope` column to `chunks`, rebuilds `memory_blocks` so the
/// primary key includes scope, and rebuilds the memory dedup index to
/// key on `(agent_id, scope, content_hash)`.
fn migrate_v1_to_v2(conn: &mut Connection) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;

    if !has_column(&tx, "chunks", "scope")? {
        tx.execute_batch(
            "ALTER TABLE chunks ADD COLUMN scope TEXT NOT NULL DEFAULT '';
             DROP INDEX IF EXISTS idx_chunks_memory_hash;
             CREATE UNIQUE INDEX idx_chunks_memory_hash
                 ON chunks(agent_id, scope, content_hash) WHERE kind = 'memory';
             CREATE INDEX IF NOT EXISTS idx_chunks_agent_scope ON chunks(agent_id, scope);",
        )?;
    }

    if !has_column(&tx, "memory_blocks", "scope")? {
        // SQLite cannot alter a primary key in place; rebuild the table.
        tx.execute_batch(
            "CREATE TABLE memory_blocks_v2 (
                 agent_id TEXT NOT NULL,
                 scope TEXT NOT NULL DEFAULT '',
                 key TEXT NOT NULL,
                 value TEXT NOT NULL,
                 updated_at TEXT NOT NULL,
                 PRIMARY KEY (agent_id, scope, key)
             );
             INSERT INTO memory_blocks_v2 (agent_id, scope, key, value, updated_at)
                 SELECT agent_id, '', key, value, updated_at FROM memory_blocks;
             DROP TABLE memory_blocks;
             ALTER TABLE memory_blocks_v2 RENAME TO memory_blocks;",
        )?;
    }

    tx.commit()
}
