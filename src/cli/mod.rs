pub mod delete;
pub mod export;
pub mod import;
pub mod inspect;
pub mod search;
pub mod stats;

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::config::MnemaConfig;

/// Resolve the database path: `--db` flag wins, then config/env.
pub fn resolve_db_path(flag: Option<&str>, config: &MnemaConfig) -> PathBuf {
    match flag {
        Some(path) => crate::config::expand_tilde(path),
        None => config.resolved_db_path(),
    }
}

/// Open a database that must already exist. Inspection commands do not
/// create databases as a side effect.
pub fn open_existing(path: &Path) -> Result<Connection> {
    if !path.exists() {
        bail!(
            "no database at {}. Run `mnema init` (or `mnema serve`) first.",
            path.display()
        );
    }
    crate::db::open_database(path)
}

/// `mnema init` — create the database, run migrations, and pin the
/// configured embedding model.
pub fn init(path: &Path, config: &MnemaConfig, json: bool) -> Result<()> {
    let conn = crate::db::open_database(path)?;
    crate::db::migrations::verify_embedding_model(&conn, &config.embedding.model)
        .context("embedding model pin check failed")?;

    let report = crate::db::check_database_health(&conn)?;
    if json {
        println!(
            "{}",
            serde_json::json!({
                "db": path.display().to_string(),
                "schemaVersion": report.schema_version,
                "embeddingModel": report.embedding_model,
                "integrityOk": report.integrity_ok,
            })
        );
    } else {
        println!("Initialized database at {}", path.display());
        println!("  schema version:  {}", report.schema_version);
        println!(
            "  embedding model: {}",
            report.embedding_model.as_deref().unwrap_or("(unset)")
        );
    }
    Ok(())
}
