use mnema::db;
use mnema::db::migrations::{
    get_embedding_model, get_schema_version, run_migrations, verify_embedding_model,
    CURRENT_SCHEMA_VERSION,
};
use tempfile::TempDir;

/// Write a v1-era database file: no scope columns, two-column block
/// key, agent-wide memory dedup index.
fn write_v1_db(path: &std::path::Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE chunks (
             id TEXT PRIMARY KEY,
             agent_id TEXT NOT NULL,
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
         CREATE UNIQUE INDEX idx_chunks_memory_hash
             ON chunks(agent_id, content_hash) WHERE kind = 'memory';
         CREATE TABLE memory_blocks (
             agent_id TEXT NOT NULL,
             key TEXT NOT NULL,
             value TEXT NOT NULL,
             updated_at TEXT NOT NULL,
             PRIMARY KEY (agent_id, key)
         );
         CREATE TABLE engine_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
         INSERT INTO engine_meta (key, value) VALUES ('schema_version', '1');
         INSERT INTO chunks (id, agent_id, content, embedding, kind, last_accessed_at, created_at)
             VALUES ('c1', 'a', 'old fact', x'0000803f', 'fact', 't', 't');
         INSERT INTO memory_blocks (agent_id, key, value, updated_at)
             VALUES ('a', 'persona', 'terse', 't');",
    )
    .unwrap();
}

#[test]
fn fresh_db_is_at_current_version() {
    let conn = db::open_memory_database().unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn opening_a_v1_file_upgrades_it_in_place() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("old.db");
    write_v1_db(&path);

    let conn = db::open_database(&path).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);

    // Pre-existing rows land in the global scope.
    let scope: String = conn
        .query_row("SELECT scope FROM chunks WHERE id = 'c1'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(scope, "");
    let scope: String = conn
        .query_row(
            "SELECT scope FROM memory_blocks WHERE agent_id = 'a' AND key = 'persona'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(scope, "");

    // The rebuilt dedup index keys on scope: same hash in another
    // scope is allowed, same scope still conflicts.
    let insert = "INSERT INTO chunks \
        (id, agent_id, scope, content, content_hash, embedding, kind, last_accessed_at, created_at) \
        VALUES (?1, 'a', ?2, 'c', 'h', x'0000803f', 'memory', 't', 't')";
    conn.execute(insert, rusqlite::params!["m1", ""]).unwrap();
    conn.execute(insert, rusqlite::params!["m2", "proj"]).unwrap();
    assert!(conn.execute(insert, rusqlite::params!["m3", ""]).is_err());
}

#[test]
fn migrations_are_idempotent_across_reopens() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("old.db");
    write_v1_db(&path);

    drop(db::open_database(&path).unwrap());
    let conn = db::open_database(&path).unwrap();
    assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_SCHEMA_VERSION);
}

#[test]
fn model_pin_survives_reopen_and_blocks_mismatch() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("pinned.db");

    {
        let conn = db::open_database(&path).unwrap();
        assert!(get_embedding_model(&conn).unwrap().is_none());
        verify_embedding_model(&conn, "text-embedding-3-small").unwrap();
    }

    let conn = db::open_database(&path).unwrap();
    assert_eq!(
        get_embedding_model(&conn).unwrap().as_deref(),
        Some("text-embedding-3-small")
    );
    verify_embedding_model(&conn, "text-embedding-3-small").unwrap();

    let err = verify_embedding_model(&conn, "other-model").unwrap_err();
    assert!(matches!(err, mnema::error::EngineError::ModelMismatch { .. }));
}
