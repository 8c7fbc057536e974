//! Validation stage: input guardrails before the model, output quality
//! checks after it.
//!
//! A failing input never reaches the model; the chain short-circuits with
//! a fixed refusal. A failing output is substituted with a fixed fallback.
//! Responses that request tool calls carry no user-facing text and skip
//! the output checks.

use crate::{MiddlewareStage, RequestAction, ResponseAction, SAFE_FALLBACK, SAFE_REFUSAL};
use async_trait::async_trait;
use chatloom_config::ValidationConfig;
use chatloom_core::message::Role;
use chatloom_core::model::{ModelRequest, ModelResponse};
use chatloom_core::{Error, Message};
use tracing::warn;

/// How strict the checks are for this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationProfile {
    /// Length and language checks only.
    General,

    /// Additionally blocks sensitive topics. Applied to tool-backed
    /// sessions, where outputs can carry external content.
    Moderated,
}

pub struct ValidationStage {
    config: ValidationConfig,
    profile: ValidationProfile,
}

impl ValidationStage {
    pub fn new(config: ValidationConfig, profile: ValidationProfile) -> Self {
        Self { config, profile }
    }

    fn contains_term(text: &str, terms: &[String]) -> Option<String> {
        let lowered = text.to_lowercase();
        terms
            .iter()
            .find(|t| !t.is_empty() && lowered.contains(&t.to_lowercase()))
            .cloned()
    }

    /// First reason the input text is unacceptable, if any.
    fn check_input(&self, text: &str) -> Option<String> {
        let len = text.chars().count();
        if len < self.config.input_min_chars {
            return Some("input is empty".into());
        }
        if len > self.config.input_max_chars {
            return Some(format!(
                "input exceeds {} characters",
                self.config.input_max_chars
            ));
        }
        if Self::contains_term(text, &self.config.toxic_terms).is_some() {
            return Some("toxic language detected".into());
        }
        if Self::contains_term(text, &self.config.profanity_terms).is_some() {
            return Some("profanity detected".into());
        }
        if self.profile == ValidationProfile::Moderated {
            if let Some(topic) = Self::contains_term(text, &self.config.sensitive_topics) {
                return Some(format!("sensitive topic: {topic}"));
            }
        }
        None
    }

    /// First reason the output text is unacceptable, if any.
    fn check_output(&self, text: &str) -> Option<String> {
        let len = text.chars().count();
        if len < self.config.output_min_chars {
            return Some(format!(
                "output shorter than {} characters",
                self.config.output_min_chars
            ));
        }
        if len > self.config.output_max_chars {
            return Some(format!(
                "output exceeds {} characters",
                self.config.output_max_chars
            ));
        }
        if self.profile == ValidationProfile::Moderated {
            if Self::contains_term(text, &self.config.toxic_terms).is_some() {
                return Some("toxic language in output".into());
            }
            if let Some(topic) = Self::contains_term(text, &self.config.sensitive_topics) {
                return Some(format!("sensitive topic in output: {topic}"));
            }
        }
        None
    }
}

#[async_trait]
impl MiddlewareStage for ValidationStage {
    fn name(&self) -> &str {
        "validation"
    }

    async fn on_request(&self, request: ModelRequest) -> Result<RequestAction, Error> {
        if !self.config.enabled {
            return Ok(RequestAction::Proceed(request));
        }

        let Some(input) = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
        else {
            return Ok(RequestAction::Proceed(request));
        };

        if let Some(reason) = self.check_input(input) {
            warn!(reason = %reason, "Input validation failed");
            return Ok(RequestAction::ShortCircuit {
                reply: SAFE_REFUSAL.into(),
                warning: format!("Input validation failed: {reason}"),
            });
        }

        Ok(RequestAction::Proceed(request))
    }

    async fn on_response(
        &self,
        _request: &ModelRequest,
        response: &ModelResponse,
    ) -> Result<ResponseAction, Error> {
        if !self.config.enabled || response.message.wants_tools() {
            return Ok(ResponseAction::Pass);
        }

        if let Some(reason) = self.check_output(&response.message.content) {
            warn!(reason = %reason, "Output validation failed");
            return Ok(ResponseAction::Replace {
                message: Message::assistant(SAFE_FALLBACK),
                warning: format!("Output validation failed: {reason}"),
            });
        }

        Ok(ResponseAction::Pass)
    }
}
