//! Memory stage: recall before the model, record after it.
//!
//! Recall is bounded by a short timeout so a stuck store cannot stall the
//! turn. Recalled context is injected as a system message ahead of the
//! conversation. Recording happens on a detached task after the final
//! text is known; failures are logged and dropped.

use crate::{MiddlewareStage, RequestAction, ResponseAction};
use async_trait::async_trait;
use chatloom_core::message::Role;
use chatloom_core::model::{ModelRequest, ModelResponse};
use chatloom_core::{Error, MemoryError, MemoryStore, Message};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct RecallStage {
    store: Arc<dyn MemoryStore>,
    auto_save: bool,
    recall_timeout: Duration,
}

impl RecallStage {
    pub fn new(store: Arc<dyn MemoryStore>, auto_save: bool, recall_timeout_secs: u64) -> Self {
        Self {
            store,
            auto_save,
            recall_timeout: Duration::from_secs(recall_timeout_secs),
        }
    }
}

fn last_user_text(request: &ModelRequest) -> Option<&str> {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
}

#[async_trait]
impl MiddlewareStage for RecallStage {
    fn name(&self) -> &str {
        "recall"
    }

    async fn on_request(&self, mut request: ModelRequest) -> Result<RequestAction, Error> {
        let Some(query) = last_user_text(&request).map(String::from) else {
            return Ok(RequestAction::Proceed(request));
        };

        let recalled = tokio::time::timeout(self.recall_timeout, self.store.recall(&query))
            .await
            .map_err(|_| {
                Error::Memory(MemoryError::Unavailable("recall timed out".into()))
            })??;

        if let Some(context) = recalled {
            debug!(store = self.store.name(), "Injecting recalled context");
            request
                .messages
                .insert(0, Message::system(format!("Relevant memories:\n{context}")));
        }

        Ok(RequestAction::Proceed(request))
    }

    async fn on_response(
        &self,
        request: &ModelRequest,
        response: &ModelResponse,
    ) -> Result<ResponseAction, Error> {
        if !self.auto_save || response.message.wants_tools() {
            return Ok(ResponseAction::Pass);
        }

        let Some(user_text) = last_user_text(request).map(String::from) else {
            return Ok(ResponseAction::Pass);
        };
        let model_text = response.message.content.clone();

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.record(&user_text, &model_text).await {
                warn!(error = %e, "Failed to record exchange");
            }
        });

        Ok(ResponseAction::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatloom_memory::InMemoryStore;

    fn request(text: &str) -> ModelRequest {
        ModelRequest::new("test-model", vec![Message::user(text)])
    }

    #[tokio::test]
    async fn recall_injects_system_message() {
        let store = Arc::new(InMemoryStore::new());
        store
            .record("What is the capital of France?", "Paris.")
            .await
            .unwrap();

        let stage = RecallStage::new(store, true, 2);
        let action = stage
            .on_request(request("more about France please"))
            .await
            .unwrap();

        let RequestAction::Proceed(req) = action else {
            panic!("expected proceed");
        };
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert!(req.messages[0].content.starts_with("Relevant memories:"));
        assert!(req.messages[0].content.contains("Paris."));
    }

    #[tokio::test]
    async fn no_match_leaves_request_untouched() {
        let store = Arc::new(InMemoryStore::new());
        let stage = RecallStage::new(store, true, 2);
        let action = stage.on_request(request("anything else")).await.unwrap();

        let RequestAction::Proceed(req) = action else {
            panic!("expected proceed");
        };
        assert_eq!(req.messages.len(), 1);
    }

    #[tokio::test]
    async fn record_runs_after_text_response() {
        let store = Arc::new(InMemoryStore::new());
        let stage = RecallStage::new(Arc::clone(&store) as Arc<dyn MemoryStore>, true, 2);

        let req = request("What is the borrow checker doing?");
        let resp = ModelResponse {
            message: Message::assistant("It enforces ownership rules."),
            model: "test-model".into(),
            usage: None,
        };
        stage.on_response(&req, &resp).await.unwrap();

        // Recording is detached; give the task a moment to land.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let recalled = store.recall("borrow checker").await.unwrap();
        assert!(recalled.unwrap().contains("ownership rules"));
    }

    #[tokio::test]
    async fn auto_save_disabled_skips_record() {
        let store = Arc::new(InMemoryStore::new());
        let stage = RecallStage::new(Arc::clone(&store) as Arc<dyn MemoryStore>, false, 2);

        let req = request("remember this phrase");
        let resp = ModelResponse {
            message: Message::assistant("Understood, noted."),
            model: "test-model".into(),
            usage: None,
        };
        stage.on_response(&req, &resp).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.recall("phrase").await.unwrap().is_none());
    }
}
