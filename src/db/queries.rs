//! Query layer over the chunks, memory_blocks, and engine_meta tables.
//!
//! All statements go through rusqlite's prepared-statement cache
//! (`prepare_cached`); multi-value scope filters build their
//! placeholder list per arity. All chunk mutation in the engine goes
//! through this module.

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{EngineError, Result};
use crate::memory::types::{Chunk, ChunkKind, MemoryBlock};
use crate::vector;

/// Current time as a sortable RFC 3339 UTC string with millisecond
/// precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Normalize a single scope: trim whitespace, missing means global.
pub fn normalize_scope(scope: Option<&str>) -> String {
    scope.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Normalize a scope list: trim each entry and drop duplicates,
/// preserving first-seen order.
pub fn normalize_scopes(scopes: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    scopes
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

const CHUNK_COLUMNS: &str = "id, agent_id, scope, content, content_hash, embedding, metadata, \
     kind, running_intensity, encounter_count, access_count, last_accessed_at, \
     superseded_by, created_at";

fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<Chunk> {
    let kind_str: String = row.get(7)?;
    let kind = kind_str.parse::<ChunkKind>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("unknown chunk kind: {kind_str}").into(),
        )
    })?;
    let blob: Vec<u8> = row.get(5)?;
    let embedding = vector::from_blob(&blob).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Blob,
            e.to_string().into(),
        )
    })?;
    Ok(Chunk {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        scope: row.get(2)?,
        content: row.get(3)?,
        content_hash: row.get(4)?,
        embedding,
        metadata: row.get(6)?,
        kind,
        running_intensity: row.get(8)?,
        encounter_count: row.get(9)?,
        access_count: row.get(10)?,
        last_accessed_at: row.get(11)?,
        superseded_by: row.get(12)?,
        created_at: row.get(13)?,
    })
}

/// Active chunks of one kind for an agent, most recently accessed
/// first. A `limit` of `-1` means unlimited. An empty scope list
/// returns no rows.
pub fn get_active_chunks(
    conn: &Connection,
    agent_id: &str,
    kind: ChunkKind,
    limit: i64,
    scopes: Option<&[String]>,
) -> Result<Vec<Chunk>> {
    active_chunks_impl(conn, agent_id, Some(kind), limit, scopes)
}

/// Active chunks of both kinds for an agent.
pub fn get_all_active_chunks(
    conn: &Connection,
    agent_id: &str,
    limit: i64,
    scopes: Option<&[String]>,
) -> Result<Vec<Chunk>> {
    active_chunks_impl(conn, agent_id, None, limit, scopes)
}

fn active_chunks_impl(
    conn: &Connection,
    agent_id: &str,
    kind: Option<ChunkKind>,
    limit: i64,
    scopes: Option<&[String]>,
) -> Result<Vec<Chunk>> {
    let scopes = scopes.map(normalize_scopes);
    if let Some(ref s) = scopes {
        if s.is_empty() {
            return Ok(Vec::new());
        }
    }

    let chunks = match (kind, scopes.as_deref()) {
        (Some(kind), None) => {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {CHUNK_COLUMNS} FROM chunks \
                 WHERE agent_id = ?1 AND kind = ?2 AND superseded_by IS NULL \
                 ORDER BY last_accessed_at DESC LIMIT ?3"
            ))?;
            let rows = stmt
                .query_map(params![agent_id, kind.as_str(), limit], row_to_chunk)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        (Some(kind), Some([scope])) => {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {CHUNK_COLUMNS} FROM chunks \
                 WHERE agent_id = ?1 AND kind = ?2 AND scope = ?3 AND superseded_by IS NULL \
                 ORDER BY last_accessed_at DESC LIMIT ?4"
            ))?;
            let rows = stmt
                .query_map(params![agent_id, kind.as_str(), scope, limit], row_to_chunk)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        (None, None) => {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {CHUNK_COLUMNS} FROM chunks \
                 WHERE agent_id = ?1 AND superseded_by IS NULL \
                 ORDER BY last_accessed_at DESC LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![agent_id, limit], row_to_chunk)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        (None, Some([scope])) => {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {CHUNK_COLUMNS} FROM chunks \
                 WHERE agent_id = ?1 AND scope = ?2 AND superseded_by IS NULL \
                 ORDER BY last_accessed_at DESC LIMIT ?3"
            ))?;
            let rows = stmt
                .query_map(params![agent_id, scope, limit], row_to_chunk)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
        (kind, Some(scopes)) => {
            // Multi-scope: build the placeholder list for this arity.
            let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
            values.push(Box::new(agent_id.to_string()));
            if let Some(kind) = kind {
                values.push(Box::new(kind.as_str().to_string()));
            }
            for scope in scopes {
                values.push(Box::new(scope.clone()));
            }
            values.push(Box::new(limit));

            let n = values.len();
            let first_scope = if kind.is_some() { 3 } else { 2 };
            let placeholders: Vec<String> = (first_scope..n).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "SELECT {CHUNK_COLUMNS} FROM chunks \
                 WHERE agent_id = ?1 {}AND scope IN ({}) AND superseded_by IS NULL \
                 ORDER BY last_accessed_at DESC LIMIT ?{n}",
                if kind.is_some() { "AND kind = ?2 " } else { "" },
                placeholders.join(", ")
            );
            let mut stmt = conn.prepare_cached(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                values.iter().map(|v| v.as_ref()).collect();
            let rows = stmt
                .query_map(params.as_slice(), row_to_chunk)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        }
    };

    Ok(chunks)
}

/// Look up the single active memory with this content hash, if any.
pub fn get_memory_by_hash(
    conn: &Connection,
    agent_id: &str,
    hash: &str,
    scope: Option<&str>,
) -> Result<Option<Chunk>> {
    let scope = normalize_scope(scope);
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {CHUNK_COLUMNS} FROM chunks \
         WHERE agent_id = ?1 AND scope = ?2 AND content_hash = ?3 \
           AND kind = 'memory' AND superseded_by IS NULL"
    ))?;
    let chunk = stmt
        .query_row(params![agent_id, scope, hash], row_to_chunk)
        .optional()?;
    Ok(chunk)
}

/// Fetch a chunk by id regardless of supersession state.
pub fn get_chunk_by_id(conn: &Connection, id: &str) -> Result<Option<Chunk>> {
    let mut stmt =
        conn.prepare_cached(&format!("SELECT {CHUNK_COLUMNS} FROM chunks WHERE id = ?1"))?;
    let chunk = stmt.query_row(params![id], row_to_chunk).optional()?;
    Ok(chunk)
}

/// Insert a fully composed chunk row. Intensity is clamped to [0, 1].
pub fn insert_chunk(conn: &Connection, chunk: &Chunk) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO chunks (id, agent_id, scope, content, content_hash, embedding, metadata, \
         kind, running_intensity, encounter_count, access_count, last_accessed_at, \
         superseded_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )?;
    stmt.execute(params![
        chunk.id,
        chunk.agent_id,
        chunk.scope,
        chunk.content,
        chunk.content_hash,
        vector::to_blob(&chunk.embedding),
        chunk.metadata,
        chunk.kind.as_str(),
        chunk.running_intensity.clamp(0.0, 1.0),
        chunk.encounter_count,
        chunk.access_count,
        chunk.last_accessed_at,
        chunk.superseded_by,
        chunk.created_at,
    ])?;
    Ok(())
}

/// Reinforce a chunk: set its intensity, bump encounter and access
/// counts, refresh the access timestamp.
pub fn reinforce_chunk(
    conn: &Connection,
    id: &str,
    new_intensity: f64,
    now: &str,
) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "UPDATE chunks SET running_intensity = ?1, encounter_count = encounter_count + 1, \
         access_count = access_count + 1, last_accessed_at = ?2 WHERE id = ?3",
    )?;
    stmt.execute(params![new_intensity.clamp(0.0, 1.0), now, id])?;
    Ok(())
}

/// Retrieval boost: bump access count, refresh the access timestamp,
/// and set the boosted intensity. Does not touch encounter_count.
pub fn touch_chunk(conn: &Connection, id: &str, new_intensity: f64, now: &str) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "UPDATE chunks SET running_intensity = ?1, access_count = access_count + 1, \
         last_accessed_at = ?2 WHERE id = ?3",
    )?;
    stmt.execute(params![new_intensity.clamp(0.0, 1.0), now, id])?;
    Ok(())
}

/// Mark `old_id` as superseded by `new_id`.
pub fn supersede_chunk(conn: &Connection, new_id: &str, old_id: &str) -> Result<()> {
    let mut stmt = conn.prepare_cached("UPDATE chunks SET superseded_by = ?1 WHERE id = ?2")?;
    let rows = stmt.execute(params![new_id, old_id])?;
    if rows == 0 {
        return Err(EngineError::ChunkNotFound(old_id.to_string()));
    }
    Ok(())
}

/// Resurrect the chunks a deleted chunk directly superseded, bounded
/// to one agent and scope. Used only by the forget engine.
pub fn clear_superseded_by_scoped(
    conn: &Connection,
    target_id: &str,
    agent_id: &str,
    scope: &str,
) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "UPDATE chunks SET superseded_by = NULL \
         WHERE superseded_by = ?1 AND agent_id = ?2 AND scope = ?3",
    )?;
    Ok(stmt.execute(params![target_id, agent_id, scope])?)
}

/// Clear every reference to a chunk, across all agents and scopes.
/// Used by the administrative delete, where a dangling reference is
/// corruption no matter whose it is.
pub fn clear_superseded_by_all(conn: &Connection, target_id: &str) -> Result<usize> {
    let mut stmt =
        conn.prepare_cached("UPDATE chunks SET superseded_by = NULL WHERE superseded_by = ?1")?;
    Ok(stmt.execute(params![target_id])?)
}

/// Replace a chunk's content, hash, and embedding, resetting both
/// timestamps. Returns whether the row existed.
pub fn replace_chunk_content(
    conn: &Connection,
    id: &str,
    content: &str,
    content_hash: Option<&str>,
    embedding: &[f32],
    now: &str,
) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "UPDATE chunks SET content = ?1, content_hash = ?2, embedding = ?3, \
         created_at = ?4, last_accessed_at = ?4 WHERE id = ?5",
    )?;
    let rows = stmt.execute(params![content, content_hash, vector::to_blob(embedding), now, id])?;
    Ok(rows > 0)
}

/// Delete a chunk row. Returns whether a row was removed.
pub fn delete_chunk(conn: &Connection, id: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("DELETE FROM chunks WHERE id = ?1")?;
    Ok(stmt.execute(params![id])? > 0)
}

/// Fetch a memory block, if present.
pub fn get_block_by_key(
    conn: &Connection,
    agent_id: &str,
    key: &str,
    scope: Option<&str>,
) -> Result<Option<MemoryBlock>> {
    let scope = normalize_scope(scope);
    let mut stmt = conn.prepare_cached(
        "SELECT agent_id, scope, key, value, updated_at FROM memory_blocks \
         WHERE agent_id = ?1 AND scope = ?2 AND key = ?3",
    )?;
    let block = stmt
        .query_row(params![agent_id, scope, key], |row| {
            Ok(MemoryBlock {
                agent_id: row.get(0)?,
                scope: row.get(1)?,
                key: row.get(2)?,
                value: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })
        .optional()?;
    Ok(block)
}

/// Create or overwrite a memory block.
pub fn upsert_block(
    conn: &Connection,
    agent_id: &str,
    scope: Option<&str>,
    key: &str,
    value: &str,
    now: &str,
) -> Result<()> {
    let scope = normalize_scope(scope);
    let mut stmt = conn.prepare_cached(
        "INSERT INTO memory_blocks (agent_id, scope, key, value, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT(agent_id, scope, key) DO UPDATE SET value = ?4, updated_at = ?5",
    )?;
    stmt.execute(params![agent_id, scope, key, value, now])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::ident;

    fn chunk(id: &str, agent: &str, scope: &str, kind: ChunkKind, accessed: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            agent_id: agent.to_string(),
            scope: scope.to_string(),
            content: format!("content {id}"),
            content_hash: match kind {
                ChunkKind::Memory => Some(ident::content_hash(&format!("content {id}"))),
                ChunkKind::Fact => None,
            },
            embedding: vec![1.0, 0.0, 0.0],
            metadata: None,
            kind,
            running_intensity: 0.5,
            encounter_count: 1,
            access_count: 0,
            last_accessed_at: accessed.to_string(),
            superseded_by: None,
            created_at: accessed.to_string(),
        }
    }

    #[test]
    fn scope_normalization() {
        assert_eq!(normalize_scope(None), "");
        assert_eq!(normalize_scope(Some("  proj  ")), "proj");
        assert_eq!(normalize_scope(Some("   ")), "");

        let scopes = vec![" a ".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(normalize_scopes(&scopes), vec!["a", "b"]);
    }

    #[test]
    fn active_chunks_ordered_and_limited() {
        let conn = open_memory_database().unwrap();
        insert_chunk(&conn, &chunk("c1", "a", "", ChunkKind::Fact, "2026-01-01T00:00:00.000Z"))
            .unwrap();
        insert_chunk(&conn, &chunk("c2", "a", "", ChunkKind::Fact, "2026-01-03T00:00:00.000Z"))
            .unwrap();
        insert_chunk(&conn, &chunk("c3", "a", "", ChunkKind::Fact, "2026-01-02T00:00:00.000Z"))
            .unwrap();

        let all = get_active_chunks(&conn, "a", ChunkKind::Fact, -1, None).unwrap();
        assert_eq!(
            all.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["c2", "c3", "c1"]
        );

        let two = get_active_chunks(&conn, "a", ChunkKind::Fact, 2, None).unwrap();
        assert_eq!(two.len(), 2);
    }

    #[test]
    fn active_chunks_exclude_superseded_and_other_agents() {
        let conn = open_memory_database().unwrap();
        insert_chunk(&conn, &chunk("c1", "a", "", ChunkKind::Fact, "t")).unwrap();
        insert_chunk(&conn, &chunk("c2", "a", "", ChunkKind::Fact, "t")).unwrap();
        insert_chunk(&conn, &chunk("c3", "b", "", ChunkKind::Fact, "t")).unwrap();
        supersede_chunk(&conn, "c2", "c1").unwrap();

        let active = get_active_chunks(&conn, "a", ChunkKind::Fact, -1, None).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "c2");
    }

    #[test]
    fn empty_scope_list_returns_no_rows() {
        let conn = open_memory_database().unwrap();
        insert_chunk(&conn, &chunk("c1", "a", "", ChunkKind::Fact, "t")).unwrap();

        let none = get_active_chunks(&conn, "a", ChunkKind::Fact, -1, Some(&[])).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn scope_filters_single_and_multi() {
        let conn = open_memory_database().unwrap();
        insert_chunk(&conn, &chunk("c1", "a", "", ChunkKind::Fact, "t")).unwrap();
        insert_chunk(&conn, &chunk("c2", "a", "proj", ChunkKind::Fact, "t")).unwrap();
        insert_chunk(&conn, &chunk("c3", "a", "other", ChunkKind::Fact, "t")).unwrap();

        let global =
            get_active_chunks(&conn, "a", ChunkKind::Fact, -1, Some(&["".to_string()])).unwrap();
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].id, "c1");

        let two = get_active_chunks(
            &conn,
            "a",
            ChunkKind::Fact,
            -1,
            Some(&["".to_string(), "proj".to_string()]),
        )
        .unwrap();
        assert_eq!(two.len(), 2);

        let all = get_all_active_chunks(
            &conn,
            "a",
            -1,
            Some(&["".to_string(), "proj".to_string(), "other".to_string()]),
        )
        .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn memory_hash_lookup_respects_scope_and_kind() {
        let conn = open_memory_database().unwrap();
        let m = chunk("m1", "a", "", ChunkKind::Memory, "t");
        let hash = m.content_hash.clone().unwrap();
        insert_chunk(&conn, &m).unwrap();

        assert!(get_memory_by_hash(&conn, "a", &hash, None).unwrap().is_some());
        assert!(get_memory_by_hash(&conn, "a", &hash, Some("proj"))
            .unwrap()
            .is_none());
        assert!(get_memory_by_hash(&conn, "b", &hash, None).unwrap().is_none());
    }

    #[test]
    fn reinforce_updates_counts_and_intensity() {
        let conn = open_memory_database().unwrap();
        insert_chunk(&conn, &chunk("c1", "a", "", ChunkKind::Fact, "t0")).unwrap();

        reinforce_chunk(&conn, "c1", 0.8, "t1").unwrap();

        let c = get_chunk_by_id(&conn, "c1").unwrap().unwrap();
        assert!((c.running_intensity - 0.8).abs() < 1e-9);
        assert_eq!(c.encounter_count, 2);
        assert_eq!(c.access_count, 1);
        assert_eq!(c.last_accessed_at, "t1");
    }

    #[test]
    fn touch_does_not_bump_encounter() {
        let conn = open_memory_database().unwrap();
        insert_chunk(&conn, &chunk("c1", "a", "", ChunkKind::Fact, "t0")).unwrap();

        touch_chunk(&conn, "c1", 0.52, "t1").unwrap();

        let c = get_chunk_by_id(&conn, "c1").unwrap().unwrap();
        assert!((c.running_intensity - 0.52).abs() < 1e-9);
        assert_eq!(c.encounter_count, 1);
        assert_eq!(c.access_count, 1);
    }

    #[test]
    fn intensity_is_clamped_on_write() {
        let conn = open_memory_database().unwrap();
        insert_chunk(&conn, &chunk("c1", "a", "", ChunkKind::Fact, "t0")).unwrap();

        reinforce_chunk(&conn, "c1", 1.7, "t1").unwrap();
        let c = get_chunk_by_id(&conn, "c1").unwrap().unwrap();
        assert_eq!(c.running_intensity, 1.0);

        touch_chunk(&conn, "c1", -0.3, "t2").unwrap();
        let c = get_chunk_by_id(&conn, "c1").unwrap().unwrap();
        assert_eq!(c.running_intensity, 0.0);
    }

    #[test]
    fn supersede_missing_chunk_fails() {
        let conn = open_memory_database().unwrap();
        let err = supersede_chunk(&conn, "new", "missing").unwrap_err();
        assert!(matches!(err, EngineError::ChunkNotFound(_)));
    }

    #[test]
    fn clear_superseded_is_agent_and_scope_bounded() {
        let conn = open_memory_database().unwrap();
        let mut old_a = chunk("old-a", "a", "", ChunkKind::Fact, "t");
        old_a.superseded_by = Some("target".to_string());
        insert_chunk(&conn, &old_a).unwrap();

        // Stale cross-agent reference to the same target
        let mut old_b = chunk("old-b", "b", "", ChunkKind::Fact, "t");
        old_b.superseded_by = Some("target".to_string());
        insert_chunk(&conn, &old_b).unwrap();

        let cleared = clear_superseded_by_scoped(&conn, "target", "a", "").unwrap();
        assert_eq!(cleared, 1);

        assert!(get_chunk_by_id(&conn, "old-a").unwrap().unwrap().superseded_by.is_none());
        assert_eq!(
            get_chunk_by_id(&conn, "old-b").unwrap().unwrap().superseded_by.as_deref(),
            Some("target")
        );
    }

    #[test]
    fn block_upsert_and_lookup() {
        let conn = open_memory_database().unwrap();
        assert!(get_block_by_key(&conn, "a", "persona", None).unwrap().is_none());

        upsert_block(&conn, "a", None, "persona", "v1", "t1").unwrap();
        let b = get_block_by_key(&conn, "a", "persona", None).unwrap().unwrap();
        assert_eq!(b.value, "v1");
        assert_eq!(b.scope, "");

        upsert_block(&conn, "a", None, "persona", "v2", "t2").unwrap();
        let b = get_block_by_key(&conn, "a", "persona", None).unwrap().unwrap();
        assert_eq!(b.value, "v2");
        assert_eq!(b.updated_at, "t2");

        // Distinct per scope
        upsert_block(&conn, "a", Some("proj"), "persona", "scoped", "t3").unwrap();
        let b = get_block_by_key(&conn, "a", "persona", Some("proj")).unwrap().unwrap();
        assert_eq!(b.value, "scoped");
        let b = get_block_by_key(&conn, "a", "persona", None).unwrap().unwrap();
        assert_eq!(b.value, "v2");
    }
}
