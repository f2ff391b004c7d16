//! Named memory blocks — mutable text buffers per (agent, scope, key).
//!
//! Blocks are created on first append or replace and never implicitly
//! deleted. Precondition failures are structured outcomes, not errors:
//! tool callers need the discriminator, not a stack trace.

use serde::Serialize;

use crate::db::queries;
use crate::error::Result;
use crate::memory::types::MemoryBlock;
use crate::memory::MemoryEngine;

/// Appended blocks larger than this get a warning in the tool text.
pub const BLOCK_SIZE_WARN_BYTES: usize = 100 * 1024;

/// Outcome of a replace operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplaceBlockOutcome {
    /// All occurrences replaced and the block upserted.
    Replaced { replacements: usize },
    /// No block under this key.
    BlockNotFound,
    /// `old_text` was empty.
    EmptyOldText,
    /// `old_text` does not occur in the block.
    TextNotFound,
}

impl ReplaceBlockOutcome {
    /// Machine-readable discriminator for failed outcomes.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Replaced { .. } => None,
            Self::BlockNotFound => Some("block_not_found"),
            Self::EmptyOldText => Some("empty_old_text"),
            Self::TextNotFound => Some("text_not_found"),
        }
    }
}

/// Outcome of an append operation.
#[derive(Debug, Clone, Serialize)]
pub struct AppendBlockResult {
    /// Whether this append created the block.
    pub created: bool,
    /// UTF-8 byte length of the block after the append.
    pub byte_len: usize,
    /// Whether the block now exceeds [`BLOCK_SIZE_WARN_BYTES`].
    pub oversize: bool,
}

impl MemoryEngine {
    /// Fetch a block. A missing block is `None`, not an error.
    pub fn recall_memory_block(
        &self,
        agent_id: &str,
        key: &str,
        scope: Option<&str>,
    ) -> Result<Option<MemoryBlock>> {
        let conn = self.lock_db();
        queries::get_block_by_key(&conn, agent_id, key, scope)
    }

    /// Replace all non-overlapping occurrences of `old_text` with
    /// `new_text`, left to right.
    pub fn replace_memory_block(
        &self,
        agent_id: &str,
        key: &str,
        old_text: &str,
        new_text: &str,
        scope: Option<&str>,
    ) -> Result<ReplaceBlockOutcome> {
        let conn = self.lock_db();
        let Some(block) = queries::get_block_by_key(&conn, agent_id, key, scope)? else {
            return Ok(ReplaceBlockOutcome::BlockNotFound);
        };

        if old_text.is_empty() {
            return Ok(ReplaceBlockOutcome::EmptyOldText);
        }

        let replacements = block.value.matches(old_text).count();
        if replacements == 0 {
            return Ok(ReplaceBlockOutcome::TextNotFound);
        }

        let updated = block.value.replace(old_text, new_text);
        queries::upsert_block(&conn, agent_id, scope, key, &updated, &queries::now_iso())?;

        Ok(ReplaceBlockOutcome::Replaced { replacements })
    }

    /// Append text to a block, creating it if needed. Existing content
    /// is separated from the appended text by a newline.
    pub fn append_memory_block(
        &self,
        agent_id: &str,
        key: &str,
        text: &str,
        scope: Option<&str>,
    ) -> Result<AppendBlockResult> {
        let conn = self.lock_db();
        let existing = queries::get_block_by_key(&conn, agent_id, key, scope)?;

        let (created, value) = match existing {
            Some(block) => (false, format!("{}\n{}", block.value, text)),
            None => (true, text.to_string()),
        };

        queries::upsert_block(&conn, agent_id, scope, key, &value, &queries::now_iso())?;

        let byte_len = value.len();
        if byte_len > BLOCK_SIZE_WARN_BYTES {
            tracing::warn!(agent_id, key, byte_len, "memory block is oversized");
        }
        Ok(AppendBlockResult {
            created,
            byte_len,
            oversize: byte_len > BLOCK_SIZE_WARN_BYTES,
        })
    }
}
