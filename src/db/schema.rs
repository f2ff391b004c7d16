//! SQL DDL for all mnema tables.
//!
//! Defines the `chunks`, `memory_blocks`, and `engine_meta` tables and
//! their indices. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization.

use rusqlite::Connection;

/// All schema DDL statements.
const SCHEMA_SQL: &str = r#"
-- Facts and memories, one row per chunk
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL,
    scope TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL,
    content_hash TEXT,
    embedding BLOB NOT NULL,
    metadata TEXT,
    kind TEXT NOT NULL CHECK(kind IN ('fact','memory')),
    running_intensity REAL NOT NULL DEFAULT 0.5,
    encounter_count INTEGER NOT NULL DEFAULT 1,
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed_at TEXT NOT NULL,
    superseded_by TEXT,
    created_at TEXT NOT NULL
);

-- Verbatim dedup applies to memories only; facts carry a NULL hash
CREATE UNIQUE INDEX IF NOT EXISTS idx_chunks_memory_hash
    ON chunks(agent_id, scope, content_hash) WHERE kind = 'memory';

CREATE INDEX IF NOT EXISTS idx_chunks_agent_kind ON chunks(agent_id, kind);
CREATE INDEX IF NOT EXISTS idx_chunks_agent_accessed ON chunks(agent_id, last_accessed_at);
CREATE INDEX IF NOT EXISTS idx_chunks_superseded
    ON chunks(superseded_by) WHERE superseded_by IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_chunks_agent_created ON chunks(agent_id, created_at);
CREATE INDEX IF NOT EXISTS idx_chunks_agent_scope ON chunks(agent_id, scope);

-- Named mutable text buffers
CREATE TABLE IF NOT EXISTS memory_blocks (
    agent_id TEXT NOT NULL,
    scope TEXT NOT NULL DEFAULT '',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (agent_id, scope, key)
);

-- Engine metadata (schema version, embedding model pin)
CREATE TABLE IF NOT EXISTS engine_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO engine_meta (key, value) VALUES ('schema_version', '2')",
        [],
    )?;

    Ok(())
}
