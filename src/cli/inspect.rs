//! CLI inspection commands — `agents`, `chunks`, `blocks`, `block`.

use anyhow::{bail, Result};
use rusqlite::Connection;

use crate::db::queries;
use crate::memory::types::ChunkKind;

/// List every agent with chunk counts.
pub fn agents(conn: &Connection, json: bool) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT agent_id, COUNT(*), SUM(superseded_by IS NULL) \
         FROM chunks GROUP BY agent_id ORDER BY agent_id",
    )?;
    let rows: Vec<(String, i64, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if json {
        let agents: Vec<serde_json::Value> = rows
            .iter()
            .map(|(agent, total, active)| {
                serde_json::json!({ "agentId": agent, "chunks": total, "active": active })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&agents)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No agents.");
        return Ok(());
    }
    println!("{:<30} {:>8} {:>8}", "AGENT", "CHUNKS", "ACTIVE");
    for (agent, total, active) in rows {
        println!("{agent:<30} {total:>8} {active:>8}");
    }
    Ok(())
}

/// List an agent's chunks, newest first.
pub fn chunks(
    conn: &Connection,
    agent_id: &str,
    kind: Option<&str>,
    include_superseded: bool,
    limit: i64,
    json: bool,
) -> Result<()> {
    let kind = kind
        .map(|k| k.parse::<ChunkKind>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let sql = format!(
        "SELECT id, kind, scope, content, running_intensity, encounter_count, \
         access_count, superseded_by, created_at \
         FROM chunks WHERE agent_id = ?1 {} {} \
         ORDER BY created_at DESC LIMIT ?2",
        match kind {
            Some(ChunkKind::Fact) => "AND kind = 'fact'",
            Some(ChunkKind::Memory) => "AND kind = 'memory'",
            None => "",
        },
        if include_superseded { "" } else { "AND superseded_by IS NULL" },
    );

    #[derive(serde::Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Row {
        id: String,
        kind: String,
        scope: String,
        content: String,
        running_intensity: f64,
        encounter_count: u32,
        access_count: u32,
        superseded_by: Option<String>,
        created_at: String,
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<Row> = stmt
        .query_map(rusqlite::params![agent_id, limit], |row| {
            Ok(Row {
                id: row.get(0)?,
                kind: row.get(1)?,
                scope: row.get(2)?,
                content: row.get(3)?,
                running_intensity: row.get(4)?,
                encounter_count: row.get(5)?,
                access_count: row.get(6)?,
                superseded_by: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No chunks for agent '{agent_id}'.");
        return Ok(());
    }
    for row in rows {
        let marker = if row.superseded_by.is_some() { "×" } else { " " };
        let scope = if row.scope.is_empty() { "-" } else { &row.scope };
        println!(
            "{marker} {} [{}] scope={scope} i={:.2} enc={} acc={}  {}",
            row.id,
            row.kind,
            row.running_intensity,
            row.encounter_count,
            row.access_count,
            truncate(&row.content, 70),
        );
    }
    Ok(())
}

/// List an agent's memory blocks.
pub fn blocks(conn: &Connection, agent_id: &str, json: bool) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT scope, key, LENGTH(value), updated_at FROM memory_blocks \
         WHERE agent_id = ?1 ORDER BY scope, key",
    )?;
    let rows: Vec<(String, String, i64, String)> = stmt
        .query_map([agent_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if json {
        let blocks: Vec<serde_json::Value> = rows
            .iter()
            .map(|(scope, key, bytes, updated)| {
                serde_json::json!({
                    "scope": scope, "key": key, "bytes": bytes, "updatedAt": updated,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&blocks)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No blocks for agent '{agent_id}'.");
        return Ok(());
    }
    println!("{:<12} {:<24} {:>10} {}", "SCOPE", "KEY", "BYTES", "UPDATED");
    for (scope, key, bytes, updated) in rows {
        let scope = if scope.is_empty() { "-".to_string() } else { scope };
        println!("{scope:<12} {key:<24} {bytes:>10} {updated}");
    }
    Ok(())
}

/// Print a single block's value. Not-found is a command failure.
pub fn block(
    conn: &Connection,
    agent_id: &str,
    key: &str,
    scope: Option<&str>,
    json: bool,
) -> Result<()> {
    let Some(block) = queries::get_block_by_key(conn, agent_id, key, scope)? else {
        bail!("no block '{key}' for agent '{agent_id}'");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&block)?);
    } else {
        println!("{}", block.value);
    }
    Ok(())
}

fn truncate(content: &str, max_chars: usize) -> String {
    let flat = content.replace('\n', " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}
