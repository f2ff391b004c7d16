//! MCP `recall_memories` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `recall_memories` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecallMemoriesParams {
    /// Agent whose memory to search.
    #[schemars(description = "Agent whose memory to search")]
    pub agent_id: String,

    /// Natural language query.
    #[schemars(description = "Natural language query to search memories")]
    pub query: String,

    /// Maximum results to return (1-50, default 10).
    #[schemars(description = "Maximum results to return (1-50, default 10)")]
    pub limit: Option<usize>,

    /// Filter by chunk kind: `"fact"` or `"memory"`.
    #[schemars(description = "Filter by chunk kind: 'fact' or 'memory'")]
    pub kind: Option<String>,

    /// Optional scope partition; omitted means the global scope.
    #[schemars(description = "Optional scope partition within the agent")]
    pub scope: Option<String>,
}
