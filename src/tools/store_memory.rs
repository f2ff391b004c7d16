//! MCP `store_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `store_memory` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StoreMemoryParams {
    /// Agent whose memory to write.
    #[schemars(description = "Agent whose memory to write")]
    pub agent_id: String,

    /// The content to store verbatim.
    #[schemars(description = "The content to store verbatim")]
    pub content: String,

    /// Optional metadata; must be a valid JSON document.
    #[schemars(description = "Optional metadata, as a JSON string")]
    pub metadata: Option<String>,

    /// Optional scope partition; omitted means the global scope.
    #[schemars(description = "Optional scope partition within the agent")]
    pub scope: Option<String>,
}
