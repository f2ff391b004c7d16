use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::MnemaConfig;
use crate::memory::types::{Chunk, ChunkKind};
use crate::memory::{days_since, hours_since};
use crate::strength;
use crate::vector;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    id: String,
    agent_id: String,
    kind: String,
    scope: String,
    similarity: f64,
    score: f64,
    content: String,
}

/// Run a read-only search from the terminal. Unlike the engine's
/// recall, this never writes a retrieval boost.
pub async fn search(
    conn: &Connection,
    config: &MnemaConfig,
    query: &str,
    agent: Option<&str>,
    kind: Option<&str>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let kind = kind
        .map(|k| k.parse::<ChunkKind>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let embedder = crate::capability::create_embedding_provider(&config.embedding);
    let query_embedding = embedder.embed(query, &CancellationToken::new()).await?;

    let candidates = load_candidates(conn, agent, kind)?;

    let now = Utc::now();
    let mut hits: Vec<SearchHit> = Vec::new();
    for chunk in &candidates {
        let similarity = vector::cosine_similarity(&query_embedding, &chunk.embedding)?;
        if similarity < 0.1 {
            continue;
        }
        let strength_now = strength::effective_strength(
            chunk.running_intensity,
            chunk.access_count,
            hours_since(&chunk.last_accessed_at, &now),
        );
        let recency = strength::recency_score(days_since(&chunk.created_at, &now));
        hits.push(SearchHit {
            id: chunk.id.clone(),
            agent_id: chunk.agent_id.clone(),
            kind: chunk.kind.as_str().to_string(),
            scope: chunk.scope.clone(),
            similarity,
            score: strength::search_score(similarity, strength_now, recency),
            content: chunk.content.clone(),
        });
    }
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No matches.");
        return Ok(());
    }
    for hit in hits {
        println!(
            "[{:.3}] {} ({}, {}) {}",
            hit.score,
            hit.id,
            hit.agent_id,
            hit.kind,
            hit.content.replace('\n', " "),
        );
    }
    Ok(())
}

fn load_candidates(
    conn: &Connection,
    agent: Option<&str>,
    kind: Option<ChunkKind>,
) -> Result<Vec<Chunk>> {
    use crate::db::queries;

    if let Some(agent) = agent {
        let chunks = match kind {
            Some(kind) => queries::get_active_chunks(conn, agent, kind, -1, None)?,
            None => queries::get_all_active_chunks(conn, agent, -1, None)?,
        };
        return Ok(chunks);
    }

    // No agent filter: walk every agent through the same query layer.
    let mut stmt = conn.prepare("SELECT DISTINCT agent_id FROM chunks ORDER BY agent_id")?;
    let agents: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut chunks = Vec::new();
    for agent in agents {
        let mut batch = match kind {
            Some(kind) => queries::get_active_chunks(conn, &agent, kind, -1, None)?,
            None => queries::get_all_active_chunks(conn, &agent, -1, None)?,
        };
        chunks.append(&mut batch);
    }
    Ok(chunks)
}
