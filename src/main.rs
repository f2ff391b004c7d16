mod backup;
mod capability;
mod cli;
mod config;
mod db;
mod error;
mod ident;
mod memory;
mod server;
mod strength;
mod tools;
mod vector;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mnema", version, about = "Persistent memory MCP server for AI agents")]
struct Cli {
    /// Database path (defaults to MNEMA_DB, then ~/.mnema/memory.db)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (transport from config: stdio or sse)
    Serve,
    /// Create the database and pin the embedding model
    Init,
    /// Show store-wide statistics
    Stats,
    /// List agents with chunk counts
    Agents,
    /// List an agent's chunks
    Chunks {
        agent: String,
        /// Filter by kind: f(act) or m(emory)
        #[arg(long)]
        kind: Option<String>,
        /// Include superseded chunks
        #[arg(long)]
        superseded: bool,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// List an agent's memory blocks
    Blocks { agent: String },
    /// Print a single memory block's value
    Block {
        agent: String,
        key: String,
        #[arg(long)]
        scope: Option<String>,
    },
    /// Semantic search across stored chunks (read-only)
    Search {
        text: String,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Delete chunks by id
    Delete {
        ids: Vec<String>,
        #[arg(long)]
        force: bool,
    },
    /// Bulk-delete chunks by agent and/or age
    Purge {
        #[arg(long)]
        agent: Option<String>,
        /// Only chunks created before this RFC 3339 timestamp
        #[arg(long)]
        before: Option<String>,
        #[arg(long)]
        force: bool,
    },
    /// Export one agent's chunks and blocks as JSON to stdout
    Export { agent: String },
    /// Import a previously exported agent
    Import { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let config = config::MnemaConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let db_path = cli::resolve_db_path(args.db.as_deref(), &config);

    match args.command {
        Command::Serve => match config.server.transport.as_str() {
            "sse" => server::serve_sse(config).await?,
            _ => server::serve_stdio(config).await?,
        },
        Command::Init => cli::init(&db_path, &config, args.json)?,
        Command::Stats => {
            let conn = cli::open_existing(&db_path)?;
            cli::stats::stats(&conn, &db_path, args.json)?;
        }
        Command::Agents => {
            let conn = cli::open_existing(&db_path)?;
            cli::inspect::agents(&conn, args.json)?;
        }
        Command::Chunks {
            agent,
            kind,
            superseded,
            limit,
        } => {
            let conn = cli::open_existing(&db_path)?;
            cli::inspect::chunks(&conn, &agent, kind.as_deref(), superseded, limit, args.json)?;
        }
        Command::Blocks { agent } => {
            let conn = cli::open_existing(&db_path)?;
            cli::inspect::blocks(&conn, &agent, args.json)?;
        }
        Command::Block { agent, key, scope } => {
            let conn = cli::open_existing(&db_path)?;
            cli::inspect::block(&conn, &agent, &key, scope.as_deref(), args.json)?;
        }
        Command::Search {
            text,
            agent,
            kind,
            limit,
        } => {
            let conn = cli::open_existing(&db_path)?;
            cli::search::search(
                &conn,
                &config,
                &text,
                agent.as_deref(),
                kind.as_deref(),
                limit,
                args.json,
            )
            .await?;
        }
        Command::Delete { ids, force } => {
            let mut conn = cli::open_existing(&db_path)?;
            cli::delete::delete(&mut conn, &ids, force, args.json)?;
        }
        Command::Purge {
            agent,
            before,
            force,
        } => {
            let mut conn = cli::open_existing(&db_path)?;
            cli::delete::purge(&mut conn, agent.as_deref(), before.as_deref(), force, args.json)?;
        }
        Command::Export { agent } => {
            let conn = cli::open_existing(&db_path)?;
            cli::export::export(&conn, &agent)?;
        }
        Command::Import { file } => {
            let mut conn = db::open_database(&db_path)?;
            cli::import::import_file(&mut conn, &file, args.json)?;
        }
    }

    Ok(())
}
