//! Memory capability: the keyed store memory tools call into.
//!
//! Persistence format and ranking are owned by whoever implements the trait;
//! the engine only sees the tools built on top of it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// A single remembered fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Caller-chosen key
    pub key: String,

    /// The content of the memory
    pub content: String,

    /// Tags for categorization
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// When this memory was stored
    pub created_at: DateTime<Utc>,

    /// Relevance score (set by recall)
    #[serde(default)]
    pub score: f32,
}

/// A keyed memory store.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Store (or overwrite) a memory under `key`.
    async fn store(&self, record: MemoryRecord) -> std::result::Result<(), MemoryError>;

    /// Ranked recall by free text, best first.
    async fn recall(
        &self,
        query: &str,
        limit: usize,
    ) -> std::result::Result<Vec<MemoryRecord>, MemoryError>;

    /// Remove a memory. Returns whether it existed.
    async fn forget(&self, key: &str) -> std::result::Result<bool, MemoryError>;

    /// All memories, ordered by key.
    async fn list(&self) -> std::result::Result<Vec<MemoryRecord>, MemoryError>;
}
