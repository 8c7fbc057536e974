//! Memory store implementations for Chatloom.
//!
//! Two backends: a no-op store for sessions without memory, and a
//! session-scoped in-memory store with keyword recall.

pub mod in_memory;
pub mod noop;

pub use in_memory::InMemoryStore;
pub use noop::NoopStore;

use chatloom_config::MemoryConfig;
use chatloom_core::MemoryStore;
use std::sync::Arc;

/// Build a memory store from configuration. Unknown backends fall back
/// to the no-op store with a warning.
pub fn store_from_config(config: &MemoryConfig) -> Arc<dyn MemoryStore> {
    match config.backend.as_str() {
        "in_memory" => Arc::new(InMemoryStore::new()),
        "none" => Arc::new(NoopStore),
        other => {
            tracing::warn!(backend = %other, "Unknown memory backend, memory disabled");
            Arc::new(NoopStore)
        }
    }
}
