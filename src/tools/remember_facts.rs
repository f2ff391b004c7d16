//! MCP `remember_facts` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `remember_facts` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RememberFactsParams {
    /// Agent whose memory to write.
    #[schemars(description = "Agent whose memory to write")]
    pub agent_id: String,

    /// Free-form text to extract facts from.
    #[schemars(description = "Free-form text to extract facts from (max 10000 characters)")]
    pub text: String,

    /// Optional scope partition; omitted means the global scope.
    #[schemars(description = "Optional scope partition within the agent")]
    pub scope: Option<String>,
}
