//! MCP server initialization for stdio and SSE transports.
//!
//! Provides [`serve_stdio`] and [`serve_sse`] entry points that wire
//! the database, capability providers, and tool handler into a running
//! server. The SSE transport exposes `GET /sse`, `POST /messages`, and
//! `GET /health`.

use std::sync::Arc;

use anyhow::Result;
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use rmcp::ServiceExt;
use tokio_util::sync::CancellationToken;

use crate::capability;
use crate::config::MnemaConfig;
use crate::db;
use crate::memory::{EngineConfig, MemoryEngine};
use crate::tools::MnemaTools;

/// Shared setup: open DB, build capability providers, construct the
/// engine. The engine constructor enforces the embedding-model pin.
fn build_engine(config: &MnemaConfig) -> Result<MemoryEngine> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let embedder = capability::create_embedding_provider(&config.embedding);
    let llm = capability::create_llm_client(&config.llm);

    let engine =
        MemoryEngine::new(conn, Arc::from(embedder), Arc::from(llm), EngineConfig::default())?;
    tracing::info!(model = %config.embedding.model, "engine ready");
    Ok(engine)
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: MnemaConfig) -> Result<()> {
    tracing::info!("starting mnema MCP server on stdio");

    let engine = build_engine(&config)?;
    let cancel = CancellationToken::new();
    let tools = MnemaTools::new(engine, cancel.clone());
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;
    cancel.cancel();
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over the SSE/HTTP transport.
pub async fn serve_sse(config: MnemaConfig) -> Result<()> {
    let bind: std::net::SocketAddr =
        format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!(addr = %bind, "starting mnema MCP server on SSE");

    let engine = build_engine(&config)?;
    let cancel = CancellationToken::new();

    let ct = CancellationToken::new();
    let sse_config = SseServerConfig {
        bind,
        sse_path: "/sse".to_string(),
        post_path: "/messages".to_string(),
        ct: ct.clone(),
        sse_keep_alive: None,
    };
    let (sse_server, router) = SseServer::new(sse_config);
    let router = router.route("/health", axum::routing::get(health));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %bind, "MCP server listening at http://{bind}/sse");

    sse_server.with_service(move || MnemaTools::new(engine.clone(), cancel.clone()));

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down SSE server");
            ct.cancel();
        })
        .await?;

    Ok(())
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
