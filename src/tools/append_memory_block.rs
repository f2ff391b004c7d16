//! MCP `append_memory_block` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `append_memory_block` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AppendMemoryBlockParams {
    /// Agent owning the block.
    #[schemars(description = "Agent owning the block")]
    pub agent_id: String,

    /// Block key; the block is created if it does not exist.
    #[schemars(description = "Block key; the block is created if it does not exist")]
    pub key: String,

    /// Text to append. Existing content is separated by a newline.
    #[schemars(description = "Text to append; existing content is separated by a newline")]
    pub text: String,

    /// Optional scope partition; omitted means the global scope.
    #[schemars(description = "Optional scope partition within the agent")]
    pub scope: Option<String>,
}
