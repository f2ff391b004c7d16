//! CLI `delete` and `purge` commands.

use anyhow::{bail, Result};
use rusqlite::Connection;

/// Delete specific chunks by id. Without `--force` this only reports
/// what would be deleted.
pub fn delete(conn: &mut Connection, ids: &[String], force: bool, json: bool) -> Result<()> {
    if ids.is_empty() {
        bail!("no chunk ids given");
    }

    let mut found = Vec::new();
    for id in ids {
        let content: Option<String> = conn
            .query_row(
                "SELECT content FROM chunks WHERE id = ?1",
                [id.as_str()],
                |row| row.get(0),
            )
            .ok();
        match content {
            Some(content) => found.push((id.clone(), content)),
            None => eprintln!("warning: no chunk {id}"),
        }
    }

    if !force {
        if json {
            let preview: Vec<&String> = found.iter().map(|(id, _)| id).collect();
            println!(
                "{}",
                serde_json::json!({ "wouldDelete": preview, "deleted": 0 })
            );
        } else {
            for (id, content) in &found {
                println!("would delete {id}: {}", truncated(content));
            }
            println!("{} chunk(s) — re-run with --force to delete.", found.len());
        }
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (id, _) in &found {
        // Resurrect anything this chunk superseded, then remove it.
        crate::db::queries::clear_superseded_by_all(&tx, id)?;
        crate::db::queries::delete_chunk(&tx, id)?;
    }
    tx.commit()?;

    if json {
        println!("{}", serde_json::json!({ "deleted": found.len() }));
    } else {
        println!("Deleted {} chunk(s).", found.len());
    }
    Ok(())
}

/// Bulk-delete chunks filtered by agent and/or creation cutoff.
pub fn purge(
    conn: &mut Connection,
    agent: Option<&str>,
    before: Option<&str>,
    force: bool,
    json: bool,
) -> Result<()> {
    let mut clauses = Vec::new();
    let mut params: Vec<String> = Vec::new();
    if let Some(agent) = agent {
        params.push(agent.to_string());
        clauses.push(format!("agent_id = ?{}", params.len()));
    }
    if let Some(before) = before {
        params.push(before.to_string());
        clauses.push(format!("created_at < ?{}", params.len()));
    }
    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let param_refs: Vec<&dyn rusqlite::types::ToSql> =
        params.iter().map(|p| p as &dyn rusqlite::types::ToSql).collect();

    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM chunks {where_clause}"),
        param_refs.as_slice(),
        |row| row.get(0),
    )?;

    if !force {
        if json {
            println!("{}", serde_json::json!({ "wouldDelete": count, "deleted": 0 }));
        } else {
            println!("{count} chunk(s) match — re-run with --force to purge.");
        }
        return Ok(());
    }

    let deleted = conn.execute(
        &format!("DELETE FROM chunks {where_clause}"),
        param_refs.as_slice(),
    )?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else {
        println!("Purged {deleted} chunk(s).");
    }
    Ok(())
}

fn truncated(content: &str) -> String {
    let flat = content.replace('\n', " ");
    if flat.chars().count() <= 60 {
        flat
    } else {
        let cut: String = flat.chars().take(60).collect();
        format!("{cut}...")
    }
}
