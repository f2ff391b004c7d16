//! Export/import of one agent's chunks and blocks.
//!
//! Format version 1: a JSON object carrying every chunk column, with
//! the embedding blob Base64-encoded so a round trip restores vectors
//! byte for byte. Import is insert-or-ignore on primary keys; existing
//! rows are counted as skipped, never overwritten.

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// On-disk export format, version 1.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub version: u32,
    pub agent_id: String,
    pub exported_at: String,
    pub chunks: Vec<ExportChunk>,
    pub blocks: Vec<ExportBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportChunk {
    pub id: String,
    pub scope: String,
    pub content: String,
    pub content_hash: Option<String>,
    /// Base64 of the raw embedding blob.
    pub embedding: String,
    pub metadata: Option<String>,
    pub kind: String,
    pub running_intensity: f64,
    pub encounter_count: u32,
    pub access_count: u32,
    pub last_accessed_at: String,
    pub superseded_by: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBlock {
    pub scope: String,
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

/// Counters reported by an import.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub chunks_imported: usize,
    pub chunks_skipped: usize,
    pub blocks_imported: usize,
    pub blocks_skipped: usize,
}

/// Build the export payload for one agent.
pub fn collect(conn: &Connection, agent_id: &str) -> Result<ExportFile> {
    let mut stmt = conn.prepare(
        "SELECT id, scope, content, content_hash, embedding, metadata, kind, \
         running_intensity, encounter_count, access_count, last_accessed_at, \
         superseded_by, created_at \
         FROM chunks WHERE agent_id = ?1 ORDER BY created_at",
    )?;
    let chunks: Vec<ExportChunk> = stmt
        .query_map([agent_id], |row| {
            let blob: Vec<u8> = row.get(4)?;
            Ok(ExportChunk {
                id: row.get(0)?,
                scope: row.get(1)?,
                content: row.get(2)?,
                content_hash: row.get(3)?,
                embedding: BASE64.encode(blob),
                metadata: row.get(5)?,
                kind: row.get(6)?,
                running_intensity: row.get(7)?,
                encounter_count: row.get(8)?,
                access_count: row.get(9)?,
                last_accessed_at: row.get(10)?,
                superseded_by: row.get(11)?,
                created_at: row.get(12)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT scope, key, value, updated_at FROM memory_blocks \
         WHERE agent_id = ?1 ORDER BY scope, key",
    )?;
    let blocks: Vec<ExportBlock> = stmt
        .query_map([agent_id], |row| {
            Ok(ExportBlock {
                scope: row.get(0)?,
                key: row.get(1)?,
                value: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(ExportFile {
        version: 1,
        agent_id: agent_id.to_string(),
        exported_at: crate::db::queries::now_iso(),
        chunks,
        blocks,
    })
}

/// Apply an export payload in one transaction.
pub fn apply(conn: &mut Connection, data: &ExportFile) -> Result<ImportReport> {
    if data.version != 1 {
        bail!("unsupported export version: {}", data.version);
    }

    let mut report = ImportReport::default();
    let tx = conn.transaction()?;

    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO chunks (id, agent_id, scope, content, content_hash, \
             embedding, metadata, kind, running_intensity, encounter_count, access_count, \
             last_accessed_at, superseded_by, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )?;
        for chunk in &data.chunks {
            let blob = BASE64
                .decode(&chunk.embedding)
                .with_context(|| format!("chunk {} has invalid embedding encoding", chunk.id))?;
            let inserted = stmt.execute(params![
                chunk.id,
                data.agent_id,
                chunk.scope,
                chunk.content,
                chunk.content_hash,
                blob,
                chunk.metadata,
                chunk.kind,
                chunk.running_intensity,
                chunk.encounter_count,
                chunk.access_count,
                chunk.last_accessed_at,
                chunk.superseded_by,
                chunk.created_at,
            ])?;
            if inserted > 0 {
                report.chunks_imported += 1;
            } else {
                report.chunks_skipped += 1;
            }
        }
    }

    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO memory_blocks (agent_id, scope, key, value, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for block in &data.blocks {
            let inserted = stmt.execute(params![
                data.agent_id,
                block.scope,
                block.key,
                block.value,
                block.updated_at,
            ])?;
            if inserted > 0 {
                report.blocks_imported += 1;
            } else {
                report.blocks_skipped += 1;
            }
        }
    }

    tx.commit()?;
    Ok(report)
}
