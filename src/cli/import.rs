use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Import a previously exported agent. Rows that already exist are
/// counted as skipped, never overwritten.
pub fn import_file(conn: &mut Connection, path: &Path, json: bool) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let data: crate::backup::ExportFile =
        serde_json::from_str(&contents).context("failed to parse export file")?;

    let report = crate::backup::apply(conn, &data)?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!(
            "Imported {} chunk(s) ({} skipped) and {} block(s) ({} skipped) for agent '{}'.",
            report.chunks_imported,
            report.chunks_skipped,
            report.blocks_imported,
            report.blocks_skipped,
            data.agent_id
        );
    }
    Ok(())
}
