use anyhow::Result;
use rusqlite::Connection;

/// Export one agent's chunks and blocks as JSON to stdout.
pub fn export(conn: &Connection, agent_id: &str) -> Result<()> {
    let data = crate::backup::collect(conn, agent_id)?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    eprintln!(
        "Exported {} chunk(s) and {} block(s) for agent '{agent_id}'.",
        data.chunks.len(),
        data.blocks.len()
    );
    Ok(())
}
