//! MemoryStore trait — recall and record across turns.
//!
//! A `MemoryStore` can be queried for context relevant to the current user
//! input, and records completed exchanges for future recall. The store is
//! strictly best-effort: callers treat any error as "no memory available"
//! and continue the turn.

use crate::error::MemoryError;
use async_trait::async_trait;

/// Cross-turn memory backend.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// A human-readable name for this store (e.g., "in_memory", "none").
    fn name(&self) -> &str;

    /// Look up context relevant to `query`. Returns `None` when nothing
    /// relevant is stored.
    async fn recall(&self, query: &str) -> std::result::Result<Option<String>, MemoryError>;

    /// Record a completed exchange for future recall.
    async fn record(
        &self,
        user_text: &str,
        model_text: &str,
    ) -> std::result::Result<(), MemoryError>;
}
