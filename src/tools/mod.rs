pub mod append_memory_block;
pub mod forget_memory;
pub mod recall_memories;
pub mod recall_memory_block;
pub mod remember_facts;
pub mod replace_memory_block;
pub mod store_memory;

use append_memory_block::AppendMemoryBlockParams;
use forget_memory::ForgetMemoryParams;
use recall_memories::RecallMemoriesParams;
use recall_memory_block::RecallMemoryBlockParams;
use remember_facts::RememberFactsParams;
use replace_memory_block::ReplaceMemoryBlockParams;
use rmcp::handler::server::tool::{Parameters, ToolRouter};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::future::Future;
use store_memory::StoreMemoryParams;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::memory::blocks::ReplaceBlockOutcome;
use crate::memory::remember::FactAction;
use crate::memory::types::ChunkKind;
use crate::memory::MemoryEngine;

/// The mnema MCP tool handler. Holds the engine and exposes all seven
/// tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct MnemaTools {
    tool_router: ToolRouter<Self>,
    engine: MemoryEngine,
    cancel: CancellationToken,
}

/// Human-readable text plus a machine-readable details payload.
fn respond(text: impl Into<String>, details: serde_json::Value) -> String {
    serde_json::json!({
        "text": text.into(),
        "details": details,
    })
    .to_string()
}

/// Render an engine error as a tool failure payload.
fn fail(err: EngineError) -> String {
    respond(err.to_string(), serde_json::json!({ "error": err.code() }))
}

#[tool_router]
impl MnemaTools {
    pub fn new(engine: MemoryEngine, cancel: CancellationToken) -> Self {
        Self {
            tool_router: Self::tool_router(),
            engine,
            cancel,
        }
    }

    /// Extract facts from text and fold them into the agent's memory.
    #[tool(description = "Extract factual claims from text and remember them, resolving conflicts with existing facts (reinforce duplicates, supersede contradictions).")]
    async fn remember_facts(
        &self,
        Parameters(params): Parameters<RememberFactsParams>,
    ) -> Result<String, String> {
        tracing::info!(
            agent_id = %params.agent_id,
            text_len = params.text.len(),
            "remember_facts called"
        );

        let actions = self
            .engine
            .remember_facts(
                &params.agent_id,
                &params.text,
                params.scope.as_deref(),
                &self.cancel.child_token(),
            )
            .await
            .map_err(fail)?;

        let (mut inserted, mut reinforced, mut superseded) = (0, 0, 0);
        for action in &actions {
            match action {
                FactAction::Inserted { .. } => inserted += 1,
                FactAction::Reinforced { .. } => reinforced += 1,
                FactAction::Superseded { .. } => superseded += 1,
            }
        }
        let text = if actions.is_empty() {
            "No facts extracted.".to_string()
        } else {
            format!(
                "Remembered {} fact(s): {inserted} inserted, {reinforced} reinforced, {superseded} superseded.",
                actions.len()
            )
        };
        Ok(respond(text, serde_json::json!({ "actions": actions })))
    }

    /// Store raw content verbatim.
    #[tool(description = "Store raw content as a memory. Identical content is deduplicated and strengthened instead of duplicated.")]
    async fn store_memory(
        &self,
        Parameters(params): Parameters<StoreMemoryParams>,
    ) -> Result<String, String> {
        tracing::info!(
            agent_id = %params.agent_id,
            content_len = params.content.len(),
            "store_memory called"
        );

        let outcome = self
            .engine
            .store_memory(
                &params.agent_id,
                &params.content,
                params.metadata.as_deref(),
                params.scope.as_deref(),
                &self.cancel.child_token(),
            )
            .await
            .map_err(fail)?;

        let text = match &outcome {
            crate::memory::store::StoreOutcome::Stored { .. } => "Stored new memory.".to_string(),
            crate::memory::store::StoreOutcome::Strengthened {
                encounter_count, ..
            } => format!("Strengthened existing memory (encounter {encounter_count})."),
        };
        Ok(respond(text, serde_json::to_value(&outcome).unwrap_or_default()))
    }

    /// Search memories by natural language query.
    #[tool(description = "Search the agent's memories by semantic similarity, ranked by a blend of similarity, strength, and recency.")]
    async fn recall_memories(
        &self,
        Parameters(params): Parameters<RecallMemoriesParams>,
    ) -> Result<String, String> {
        let kind = match &params.kind {
            Some(k) => Some(k.parse::<ChunkKind>().map_err(|e| {
                respond(e, serde_json::json!({ "error": "invalid_kind" }))
            })?),
            None => None,
        };

        tracing::info!(agent_id = %params.agent_id, query = %params.query, "recall_memories called");

        let results = self
            .engine
            .recall_memories(
                &params.agent_id,
                &params.query,
                params.limit,
                kind,
                params.scope.as_deref(),
                &self.cancel.child_token(),
            )
            .await
            .map_err(fail)?;

        let text = if results.is_empty() {
            "No matching memories.".to_string()
        } else {
            let listing: Vec<String> = results
                .iter()
                .map(|r| format!("- [{:.2}] {}", r.score, r.content))
                .collect();
            format!("Found {} result(s):\n{}", results.len(), listing.join("\n"))
        };
        Ok(respond(text, serde_json::json!({ "results": results })))
    }

    /// Forget memories matching a description.
    #[tool(description = "Permanently delete memories matching a description. Facts that were superseded by a deleted fact become active again.")]
    async fn forget_memory(
        &self,
        Parameters(params): Parameters<ForgetMemoryParams>,
    ) -> Result<String, String> {
        tracing::info!(agent_id = %params.agent_id, "forget_memory called");

        let result = self
            .engine
            .forget_memory(
                &params.agent_id,
                &params.description,
                params.threshold,
                params.scope.as_deref(),
                &self.cancel.child_token(),
            )
            .await
            .map_err(fail)?;

        let text = if result.deleted.is_empty() {
            "Nothing matched; nothing forgotten.".to_string()
        } else {
            format!("Forgot {} chunk(s).", result.deleted.len())
        };
        Ok(respond(text, serde_json::json!({ "deleted": result.deleted })))
    }

    /// Read a named memory block.
    #[tool(description = "Read a named memory block (a mutable text buffer like 'persona' or 'working_notes').")]
    async fn recall_memory_block(
        &self,
        Parameters(params): Parameters<RecallMemoryBlockParams>,
    ) -> Result<String, String> {
        let block = self
            .engine
            .recall_memory_block(&params.agent_id, &params.key, params.scope.as_deref())
            .map_err(fail)?;

        match block {
            Some(block) => Ok(respond(
                block.value.clone(),
                serde_json::json!({ "found": true, "block": block }),
            )),
            None => Ok(respond(
                format!("No memory block '{}'.", params.key),
                serde_json::json!({ "found": false }),
            )),
        }
    }

    /// Replace text inside a memory block.
    #[tool(description = "Replace every occurrence of old_text with new_text inside a memory block.")]
    async fn replace_memory_block(
        &self,
        Parameters(params): Parameters<ReplaceMemoryBlockParams>,
    ) -> Result<String, String> {
        let outcome = self
            .engine
            .replace_memory_block(
                &params.agent_id,
                &params.key,
                &params.old_text,
                &params.new_text,
                params.scope.as_deref(),
            )
            .map_err(fail)?;

        let text = match &outcome {
            ReplaceBlockOutcome::Replaced { replacements } => {
                format!("Replaced {replacements} occurrence(s).")
            }
            ReplaceBlockOutcome::BlockNotFound => {
                format!("No memory block '{}'.", params.key)
            }
            ReplaceBlockOutcome::EmptyOldText => "old_text must not be empty.".to_string(),
            ReplaceBlockOutcome::TextNotFound => {
                "old_text does not occur in the block.".to_string()
            }
        };
        let mut details = serde_json::to_value(&outcome).unwrap_or_default();
        if let (Some(code), Some(obj)) = (outcome.error_code(), details.as_object_mut()) {
            obj.insert("error".into(), serde_json::json!(code));
        }
        Ok(respond(text, details))
    }

    /// Append text to a memory block.
    #[tool(description = "Append text to a memory block, creating it if needed. Existing content is separated by a newline.")]
    async fn append_memory_block(
        &self,
        Parameters(params): Parameters<AppendMemoryBlockParams>,
    ) -> Result<String, String> {
        let result = self
            .engine
            .append_memory_block(&params.agent_id, &params.key, &params.text, params.scope.as_deref())
            .map_err(fail)?;

        let mut text = if result.created {
            format!("Created memory block '{}'.", params.key)
        } else {
            format!("Appended to memory block '{}'.", params.key)
        };
        if result.oversize {
            text.push_str(&format!(
                " Warning: block is {} bytes, past the 100 KiB guideline.",
                result.byte_len
            ));
        }
        Ok(respond(text, serde_json::to_value(&result).unwrap_or_default()))
    }
}

#[tool_handler]
impl ServerHandler for MnemaTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Mnema is a persistent memory server. Use remember_facts to save factual \
                 claims, store_memory for raw content, recall_memories to search, \
                 forget_memory to delete, and the memory block tools for named buffers. \
                 Every tool takes an agent_id."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
