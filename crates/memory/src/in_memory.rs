//! Session-scoped in-memory store with keyword recall.
//!
//! Exchanges are kept as (user, assistant) pairs for the lifetime of the
//! process. Recall is a case-insensitive keyword match: any stored
//! exchange whose user text shares a word of 4+ characters with the query
//! is considered relevant.

use async_trait::async_trait;
use chatloom_core::{MemoryError, MemoryStore};
use tokio::sync::RwLock;

const MIN_KEYWORD_LEN: usize = 4;
const MAX_RECALLED: usize = 5;

pub struct InMemoryStore {
    exchanges: RwLock<Vec<(String, String)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            exchanges: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn keywords(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= MIN_KEYWORD_LEN)
        .map(|w| w.to_lowercase())
        .collect()
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn recall(&self, query: &str) -> Result<Option<String>, MemoryError> {
        let query_words = keywords(query);
        if query_words.is_empty() {
            return Ok(None);
        }

        let exchanges = self.exchanges.read().await;
        let matches: Vec<String> = exchanges
            .iter()
            .filter(|(user, _)| {
                let stored = user.to_lowercase();
                query_words.iter().any(|w| stored.contains(w))
            })
            .map(|(user, assistant)| format!("Q: {user}\nA: {assistant}"))
            .take(MAX_RECALLED)
            .collect();

        if matches.is_empty() {
            Ok(None)
        } else {
            Ok(Some(matches.join("\n\n")))
        }
    }

    async fn record(&self, user_text: &str, model_text: &str) -> Result<(), MemoryError> {
        let mut exchanges = self.exchanges.write().await;
        exchanges.push((user_text.to_string(), model_text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recall_finds_keyword_match() {
        let store = InMemoryStore::new();
        store
            .record("What is the capital of France?", "Paris.")
            .await
            .unwrap();

        let recalled = store.recall("tell me about France").await.unwrap();
        let text = recalled.unwrap();
        assert!(text.contains("capital of France"));
        assert!(text.contains("Paris."));
    }

    #[tokio::test]
    async fn recall_is_case_insensitive() {
        let store = InMemoryStore::new();
        store.record("Rust ownership rules", "They are...").await.unwrap();
        assert!(store.recall("OWNERSHIP").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn recall_ignores_short_words() {
        let store = InMemoryStore::new();
        store.record("a cat sat on it", "ok").await.unwrap();
        // "cat", "sat", "on", "it" are all below the keyword length
        assert!(store.recall("cat sat").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recall_empty_store_finds_nothing() {
        let store = InMemoryStore::new();
        assert!(store.recall("anything relevant").await.unwrap().is_none());
    }
}
