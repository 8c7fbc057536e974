//! Monitoring stage: logs token usage and exports interaction records.
//!
//! Export happens on a detached task so a slow or dead sink never blocks
//! the turn. Responses that request tool calls are intermediate and not
//! exported; only the text the operator will see becomes a record.

use crate::{MiddlewareStage, ResponseAction};
use async_trait::async_trait;
use chatloom_core::message::Role;
use chatloom_core::model::{ModelRequest, ModelResponse};
use chatloom_core::{Error, InteractionRecord, TelemetrySink};
use std::sync::Arc;
use tracing::{info, warn};

pub struct MonitoringStage {
    sink: Arc<dyn TelemetrySink>,
    usecase: String,
    session_id: String,
}

impl MonitoringStage {
    pub fn new(sink: Arc<dyn TelemetrySink>, usecase: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            sink,
            usecase: usecase.into(),
            session_id: session_id.into(),
        }
    }
}

#[async_trait]
impl MiddlewareStage for MonitoringStage {
    fn name(&self) -> &str {
        "monitoring"
    }

    async fn on_response(
        &self,
        request: &ModelRequest,
        response: &ModelResponse,
    ) -> Result<ResponseAction, Error> {
        if let Some(usage) = &response.usage {
            info!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model call completed"
            );
        }

        if response.message.wants_tools() {
            return Ok(ResponseAction::Pass);
        }

        let input = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let record = InteractionRecord::new(
            self.usecase.clone(),
            self.session_id.clone(),
            input,
            response.message.content.clone(),
            response.model.clone(),
        );

        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.record(record).await {
                warn!(sink = sink.name(), error = %e, "Telemetry export failed");
            }
        });

        Ok(ResponseAction::Pass)
    }
}
