use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Store-wide statistics.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub total_chunks: i64,
    pub active_chunks: i64,
    pub superseded_chunks: i64,
    pub by_kind: BTreeMap<String, i64>,
    pub agents: i64,
    pub blocks: i64,
    pub db_size_bytes: u64,
    pub oldest_chunk: Option<String>,
    pub newest_chunk: Option<String>,
}

pub fn collect(conn: &Connection, db_path: &Path) -> Result<StatsReport> {
    let total_chunks: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))?;
    let superseded_chunks: i64 = conn.query_row(
        "SELECT COUNT(*) FROM chunks WHERE superseded_by IS NOT NULL",
        [],
        |r| r.get(0),
    )?;

    let mut by_kind = BTreeMap::new();
    let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM chunks GROUP BY kind")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (kind, count) = row?;
        by_kind.insert(kind, count);
    }

    let agents: i64 =
        conn.query_row("SELECT COUNT(DISTINCT agent_id) FROM chunks", [], |r| r.get(0))?;
    let blocks: i64 = conn.query_row("SELECT COUNT(*) FROM memory_blocks", [], |r| r.get(0))?;

    let oldest_chunk: Option<String> = conn
        .query_row("SELECT MIN(created_at) FROM chunks", [], |r| r.get(0))
        .unwrap_or(None);
    let newest_chunk: Option<String> = conn
        .query_row("SELECT MAX(created_at) FROM chunks", [], |r| r.get(0))
        .unwrap_or(None);

    let db_size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    Ok(StatsReport {
        total_chunks,
        active_chunks: total_chunks - superseded_chunks,
        superseded_chunks,
        by_kind,
        agents,
        blocks,
        db_size_bytes,
        oldest_chunk,
        newest_chunk,
    })
}

/// Display store statistics.
pub fn stats(conn: &Connection, db_path: &Path, json: bool) -> Result<()> {
    let report = collect(conn, db_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Memory Store Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total chunks:     {}", report.total_chunks);
    println!("  Active:           {}", report.active_chunks);
    println!("  Superseded:       {}", report.superseded_chunks);
    println!();

    println!("By Kind:");
    for kind in ["fact", "memory"] {
        let count = report.by_kind.get(kind).copied().unwrap_or(0);
        println!("  {kind:<8} {count}");
    }
    println!();

    println!("Agents:             {}", report.agents);
    println!("Memory blocks:      {}", report.blocks);
    println!("Database size:      {} bytes", report.db_size_bytes);

    if let Some(ref oldest) = report.oldest_chunk {
        println!("Oldest chunk:       {oldest}");
    }
    if let Some(ref newest) = report.newest_chunk {
        println!("Newest chunk:       {newest}");
    }

    Ok(())
}
