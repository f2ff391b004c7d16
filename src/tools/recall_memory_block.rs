//! MCP `recall_memory_block` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `recall_memory_block` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecallMemoryBlockParams {
    /// Agent owning the block.
    #[schemars(description = "Agent owning the block")]
    pub agent_id: String,

    /// Block key, e.g. `"persona"` or `"working_notes"`.
    #[schemars(description = "Block key, e.g. 'persona' or 'working_notes'")]
    pub key: String,

    /// Optional scope partition; omitted means the global scope.
    #[schemars(description = "Optional scope partition within the agent")]
    pub scope: Option<String>,
}
