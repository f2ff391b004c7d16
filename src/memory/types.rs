//! Core type definitions.
//!
//! Defines [`ChunkKind`] (fact vs memory), [`Chunk`] (a full stored
//! row), and [`MemoryBlock`] (a named mutable text buffer).

use serde::{Deserialize, Serialize};

/// The two chunk kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Atomic truth-bearing claim, subject to conflict resolution.
    Fact,
    /// Raw stored content, deduplicated verbatim, never superseded.
    Memory,
}

impl ChunkKind {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Memory => "memory",
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChunkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fact" | "f" => Ok(Self::Fact),
            "memory" | "m" => Ok(Self::Memory),
            _ => Err(format!("unknown chunk kind: {s}")),
        }
    }
}

/// A chunk row, matching the `chunks` table schema.
///
/// The embedding is not serialized; surfaces that need it (export)
/// encode it explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// ULID primary key, lexicographically ordered by creation time.
    pub id: String,
    /// Namespace key; every query is agent-scoped.
    pub agent_id: String,
    /// Partition within the agent; empty string is the global scope.
    pub scope: String,
    /// Full text content.
    pub content: String,
    /// Hex SHA-256 of content for memories; `None` for facts.
    pub content_hash: Option<String>,
    /// Embedding vector, decoded from the stored blob.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// Caller-defined metadata, typically JSON.
    pub metadata: Option<String>,
    pub kind: ChunkKind,
    /// Moving-average strength in [0, 1].
    pub running_intensity: f64,
    /// Times this content has been (re-)stored. At least 1.
    pub encounter_count: u32,
    /// Times this chunk has been returned by recall.
    pub access_count: u32,
    /// RFC 3339 UTC timestamp of the last access.
    pub last_accessed_at: String,
    /// When set, the chunk is inactive and invisible to recall.
    pub superseded_by: Option<String>,
    /// RFC 3339 UTC creation timestamp.
    pub created_at: String,
}

/// A named mutable text buffer keyed by `(agent_id, scope, key)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBlock {
    pub agent_id: String,
    pub scope: String,
    pub key: String,
    pub value: String,
    pub updated_at: String,
}
