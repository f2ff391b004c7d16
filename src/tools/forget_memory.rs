//! MCP `forget_memory` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `forget_memory` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ForgetMemoryParams {
    /// Agent whose memory to prune.
    #[schemars(description = "Agent whose memory to prune")]
    pub agent_id: String,

    /// Description of what to forget; matched semantically.
    #[schemars(description = "Description of what to forget, matched semantically")]
    pub description: String,

    /// Similarity threshold in [0, 1] (default 0.7).
    #[schemars(description = "Similarity threshold 0.0-1.0 (default 0.7)")]
    pub threshold: Option<f64>,

    /// Optional scope partition to limit the scan to.
    #[schemars(description = "Optional scope partition to limit the scan to")]
    pub scope: Option<String>,
}
