//! No-op memory store. Recall finds nothing, record does nothing.

use async_trait::async_trait;
use chatloom_core::{MemoryError, MemoryStore};

pub struct NoopStore;

#[async_trait]
impl MemoryStore for NoopStore {
    fn name(&self) -> &str {
        "none"
    }

    async fn recall(&self, _query: &str) -> Result<Option<String>, MemoryError> {
        Ok(None)
    }

    async fn record(&self, _user_text: &str, _model_text: &str) -> Result<(), MemoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_recalls_nothing() {
        let store = NoopStore;
        store.record("question", "answer").await.unwrap();
        assert!(store.recall("question").await.unwrap().is_none());
    }
}
