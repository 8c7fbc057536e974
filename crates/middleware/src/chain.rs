//! The chain driver: runs request stages, calls the model once, then
//! runs response stages.

use crate::{MiddlewareStage, RequestAction, ResponseAction};
use chatloom_core::model::{Model, ModelRequest, Usage};
use chatloom_core::{Error, Message};
use std::sync::Arc;
use tracing::{debug, warn};

/// The outcome of one pass through the chain.
pub struct ChainOutput {
    /// The message to fold into the conversation (assistant text, a
    /// tool-call request, or substituted safe text).
    pub message: Message,

    /// Which model produced the output (the configured name when the
    /// chain short-circuited before reaching the backend).
    pub model: String,

    /// Token usage, when the backend reported it.
    pub usage: Option<Usage>,

    /// True when a request stage replied without calling the model.
    pub short_circuited: bool,

    /// Human-readable warnings accumulated by stages.
    pub warnings: Vec<String>,
}

/// An ordered middleware chain wrapping a model backend.
pub struct Chain {
    model: Arc<dyn Model>,
    stages: Vec<Arc<dyn MiddlewareStage>>,
}

impl Chain {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            stages: Vec::new(),
        }
    }

    pub fn with_stage(mut self, stage: Arc<dyn MiddlewareStage>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Run one request through the chain.
    ///
    /// Exactly one model call happens per invocation, or zero when a
    /// request stage short-circuits. Stage errors are logged and skipped;
    /// only model backend errors propagate.
    pub async fn invoke(&self, mut request: ModelRequest) -> Result<ChainOutput, Error> {
        let mut warnings = Vec::new();

        for stage in &self.stages {
            match stage.on_request(request.clone()).await {
                Ok(RequestAction::Proceed(next)) => request = next,
                Ok(RequestAction::ShortCircuit { reply, warning }) => {
                    debug!(stage = stage.name(), "Chain short-circuited");
                    warnings.push(warning);
                    return Ok(ChainOutput {
                        message: Message::assistant(reply),
                        model: self.model.name().to_string(),
                        usage: None,
                        short_circuited: true,
                        warnings,
                    });
                }
                Err(e) => {
                    warn!(stage = stage.name(), error = %e, "Request stage failed, continuing");
                }
            }
        }

        let mut response = self.model.complete(request.clone()).await.map_err(Error::Model)?;

        for stage in &self.stages {
            match stage.on_response(&request, &response).await {
                Ok(ResponseAction::Pass) => {}
                Ok(ResponseAction::Replace { message, warning }) => {
                    debug!(stage = stage.name(), "Response replaced");
                    warnings.push(warning);
                    response.message = message;
                }
                Err(e) => {
                    warn!(stage = stage.name(), error = %e, "Response stage failed, continuing");
                }
            }
        }

        Ok(ChainOutput {
            message: response.message,
            model: response.model,
            usage: response.usage,
            short_circuited: false,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{ValidationProfile, ValidationStage};
    use crate::{MiddlewareStage, RequestAction, SAFE_REFUSAL};
    use async_trait::async_trait;
    use chatloom_config::ValidationConfig;
    use chatloom_core::model::{ModelResponse, ModelRequest};
    use chatloom_core::{Error, ModelError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedModel {
        reply: String,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Model for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: ModelRequest) -> Result<ModelResponse, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ModelResponse {
                message: Message::assistant(self.reply.clone()),
                model: "scripted-model".into(),
                usage: None,
            })
        }
    }

    struct BrokenStage;

    #[async_trait]
    impl MiddlewareStage for BrokenStage {
        fn name(&self) -> &str {
            "broken"
        }

        async fn on_request(&self, _request: ModelRequest) -> Result<RequestAction, Error> {
            Err(Error::Internal("stage blew up".into()))
        }
    }

    fn request(text: &str) -> ModelRequest {
        ModelRequest::new("scripted-model", vec![Message::user(text)])
    }

    #[tokio::test]
    async fn plain_request_calls_model_once() {
        let model = Arc::new(ScriptedModel::new("Hello! I can help with that."));
        let chain = Chain::new(Arc::clone(&model) as Arc<dyn Model>);

        let output = chain.invoke(request("Hello")).await.unwrap();
        assert!(!output.short_circuited);
        assert_eq!(output.message.content, "Hello! I can help with that.");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn short_circuit_skips_model() {
        let model = Arc::new(ScriptedModel::new("should never appear"));
        let chain = Chain::new(Arc::clone(&model) as Arc<dyn Model>).with_stage(Arc::new(
            ValidationStage::new(ValidationConfig::default(), ValidationProfile::General),
        ));

        let output = chain.invoke(request("")).await.unwrap();
        assert!(output.short_circuited);
        assert_eq!(output.message.content, SAFE_REFUSAL);
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_stage_does_not_break_the_turn() {
        let model = Arc::new(ScriptedModel::new("Still working fine, thanks."));
        let chain = Chain::new(Arc::clone(&model) as Arc<dyn Model>).with_stage(Arc::new(BrokenStage));

        let output = chain.invoke(request("Hello")).await.unwrap();
        assert!(!output.short_circuited);
        assert_eq!(output.message.content, "Still working fine, thanks.");
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn output_replacement_surfaces_warning() {
        let model = Arc::new(ScriptedModel::new("no"));
        let chain = Chain::new(Arc::clone(&model) as Arc<dyn Model>).with_stage(Arc::new(
            ValidationStage::new(ValidationConfig::default(), ValidationProfile::General),
        ));

        let output = chain.invoke(request("Is water wet?")).await.unwrap();
        assert!(!output.short_circuited);
        assert_eq!(output.message.content, crate::SAFE_FALLBACK);
        assert!(output.warnings[0].contains("Output validation failed"));
    }
}
