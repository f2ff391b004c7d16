//! MCP `replace_memory_block` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `replace_memory_block` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReplaceMemoryBlockParams {
    /// Agent owning the block.
    #[schemars(description = "Agent owning the block")]
    pub agent_id: String,

    /// Block key.
    #[schemars(description = "Block key")]
    pub key: String,

    /// Text to find; every non-overlapping occurrence is replaced.
    #[schemars(description = "Text to find; every non-overlapping occurrence is replaced")]
    pub old_text: String,

    /// Replacement text.
    #[schemars(description = "Replacement text")]
    pub new_text: String,

    /// Optional scope partition; omitted means the global scope.
    #[schemars(description = "Optional scope partition within the agent")]
    pub scope: Option<String>,
}
