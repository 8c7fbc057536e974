//! Request/response middleware chain.
//!
//! Every model invocation passes through an ordered chain of stages.
//! Stages see the request before the model and the response after it,
//! and can rewrite either, substitute a fixed reply without calling the
//! model at all, or do side work (memory recall, telemetry export).
//!
//! The chain fails open: a stage that returns an error is logged and
//! skipped, and the turn continues as if the stage had passed the data
//! through untouched. The only errors that escape the chain are model
//! backend errors.

pub mod chain;
pub mod monitoring;
pub mod recall;
pub mod validation;

pub use chain::{Chain, ChainOutput};
pub use monitoring::MonitoringStage;
pub use recall::RecallStage;
pub use validation::{ValidationProfile, ValidationStage};

use async_trait::async_trait;
use chatloom_core::model::{ModelRequest, ModelResponse};
use chatloom_core::{Error, Message};

/// Fixed reply substituted when input validation rejects the user text.
pub const SAFE_REFUSAL: &str =
    "I cannot process this request due to safety guidelines. Please rephrase your question.";

/// Fixed reply substituted when output validation rejects the model text.
pub const SAFE_FALLBACK: &str = "I apologize, but I cannot provide a response that meets \
     safety guidelines. Please try rephrasing your question.";

/// What a stage decided about an outbound request.
pub enum RequestAction {
    /// Continue with this (possibly rewritten) request.
    Proceed(ModelRequest),

    /// Stop the chain: reply with fixed text and never call the model.
    ShortCircuit { reply: String, warning: String },
}

/// What a stage decided about an inbound response.
pub enum ResponseAction {
    /// Continue with the response untouched.
    Pass,

    /// Continue, but with the response message substituted.
    Replace { message: Message, warning: String },
}

/// One stage in the chain.
///
/// Both hooks default to pass-through so a stage only implements the
/// side it cares about. A returned `Err` is caught by the chain and
/// treated as pass-through.
#[async_trait]
pub trait MiddlewareStage: Send + Sync {
    fn name(&self) -> &str;

    async fn on_request(&self, request: ModelRequest) -> Result<RequestAction, Error> {
        Ok(RequestAction::Proceed(request))
    }

    async fn on_response(
        &self,
        request: &ModelRequest,
        response: &ModelResponse,
    ) -> Result<ResponseAction, Error> {
        let _ = (request, response);
        Ok(ResponseAction::Pass)
    }
}
