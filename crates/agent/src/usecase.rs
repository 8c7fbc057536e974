//! Use-case selection: maps a named conversation profile to a fully
//! wired state machine.
//!
//! Setup errors here are the hard kind: an unknown use case, a
//! tool-backed profile with no usable tools, or a missing server catalog
//! must reach the operator instead of degrading into a broken session.

use chatloom_config::{McpConfig, MemoryConfig, ValidationConfig};
use chatloom_core::model::Model;
use chatloom_core::{ConfigError, Error, MemoryStore, TelemetrySink, ToolDescriptor};
use chatloom_gateway::ToolGateway;
use chatloom_middleware::{
    Chain, MonitoringStage, RecallStage, ValidationProfile, ValidationStage,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::state_machine::{StateMachine, Topology};

/// The supported conversation profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseCase {
    /// Plain single-step chat, no tools.
    BasicChat,

    /// Chat augmented with explicitly supplied tools.
    ToolChat,

    /// News digest chat backed by a search tool.
    NewsChat,

    /// Chat backed by configured external tool servers.
    McpChat,
}

impl UseCase {
    pub fn as_str(&self) -> &'static str {
        match self {
            UseCase::BasicChat => "basic",
            UseCase::ToolChat => "tool",
            UseCase::NewsChat => "news",
            UseCase::McpChat => "mcp",
        }
    }

    pub fn all() -> &'static [UseCase] {
        &[
            UseCase::BasicChat,
            UseCase::ToolChat,
            UseCase::NewsChat,
            UseCase::McpChat,
        ]
    }
}

impl std::fmt::Display for UseCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UseCase {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" | "basic-chat" => Ok(UseCase::BasicChat),
            "tool" | "tool-chat" => Ok(UseCase::ToolChat),
            "news" | "news-chat" => Ok(UseCase::NewsChat),
            "mcp" | "mcp-chat" => Ok(UseCase::McpChat),
            other => Err(ConfigError::UnknownUseCase(other.to_string())),
        }
    }
}

/// Per-session inputs to the selector.
pub struct SessionOptions {
    /// Explicit tool descriptors (tool and news profiles).
    pub descriptors: Vec<ToolDescriptor>,

    /// Parsed server catalog (mcp profile).
    pub mcp: Option<McpConfig>,

    /// Maximum tool execution cycles per turn.
    pub max_cycles: u32,

    /// Per-invocation tool timeout.
    pub tool_timeout_secs: u64,

    /// Session identifier for telemetry.
    pub session_id: String,
}

impl SessionOptions {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            descriptors: Vec::new(),
            mcp: None,
            max_cycles: 10,
            tool_timeout_secs: 30,
            session_id: session_id.into(),
        }
    }

    pub fn with_descriptors(mut self, descriptors: Vec<ToolDescriptor>) -> Self {
        self.descriptors = descriptors;
        self
    }

    pub fn with_mcp(mut self, mcp: McpConfig) -> Self {
        self.mcp = Some(mcp);
        self
    }
}

/// Assembles state machines for the supported use cases.
pub struct UseCaseSelector {
    model: Arc<dyn Model>,
    model_name: String,
    memory: Arc<dyn MemoryStore>,
    sink: Arc<dyn TelemetrySink>,
    validation: ValidationConfig,
    memory_config: MemoryConfig,
}

impl UseCaseSelector {
    pub fn new(
        model: Arc<dyn Model>,
        model_name: impl Into<String>,
        memory: Arc<dyn MemoryStore>,
        sink: Arc<dyn TelemetrySink>,
        validation: ValidationConfig,
        memory_config: MemoryConfig,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            memory,
            sink,
            validation,
            memory_config,
        }
    }

    fn profile_for(usecase: UseCase) -> ValidationProfile {
        match usecase {
            UseCase::ToolChat | UseCase::McpChat => ValidationProfile::Moderated,
            UseCase::BasicChat | UseCase::NewsChat => ValidationProfile::General,
        }
    }

    fn gateway_for(usecase: UseCase, options: &SessionOptions) -> Result<ToolGateway, Error> {
        let mut gateway = ToolGateway::new(options.tool_timeout_secs);

        match usecase {
            UseCase::BasicChat => {}
            UseCase::ToolChat | UseCase::NewsChat => {
                for descriptor in options.descriptors.iter().cloned() {
                    gateway.register(descriptor)?;
                }
                if gateway.is_empty() {
                    return Err(Error::Config(ConfigError::NoToolsAvailable {
                        usecase: usecase.as_str().into(),
                        reason: "no tool descriptors supplied".into(),
                    }));
                }
            }
            UseCase::McpChat => {
                let Some(mcp) = &options.mcp else {
                    return Err(Error::Config(ConfigError::NoToolsAvailable {
                        usecase: usecase.as_str().into(),
                        reason: "no server catalog loaded".into(),
                    }));
                };
                if gateway.register_config(mcp) == 0 {
                    return Err(Error::Config(ConfigError::NoToolsAvailable {
                        usecase: usecase.as_str().into(),
                        reason: "catalog contains no usable servers".into(),
                    }));
                }
            }
        }

        Ok(gateway)
    }

    /// Build a state machine for the given use case.
    pub fn build(&self, usecase: UseCase, options: SessionOptions) -> Result<StateMachine, Error> {
        let gateway = Self::gateway_for(usecase, &options)?;
        let topology = match usecase {
            UseCase::BasicChat => Topology::SingleStep,
            _ => Topology::ToolAugmented,
        };

        let chain = Chain::new(Arc::clone(&self.model))
            .with_stage(Arc::new(ValidationStage::new(
                self.validation.clone(),
                Self::profile_for(usecase),
            )))
            .with_stage(Arc::new(RecallStage::new(
                Arc::clone(&self.memory),
                self.memory_config.auto_save,
                self.memory_config.recall_timeout_secs,
            )))
            .with_stage(Arc::new(MonitoringStage::new(
                Arc::clone(&self.sink),
                usecase.as_str(),
                options.session_id.clone(),
            )));

        info!(
            usecase = usecase.as_str(),
            tools = gateway.len(),
            "Session assembled"
        );

        Ok(StateMachine::new(
            chain,
            self.model_name.clone(),
            Arc::new(gateway),
            topology,
            options.max_cycles,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatloom_core::model::{ModelRequest, ModelResponse};
    use chatloom_core::{Message, ModelError};
    use chatloom_memory::NoopStore;
    use chatloom_telemetry::NoopSink;

    struct FixedModel;

    #[async_trait]
    impl Model for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: ModelRequest) -> Result<ModelResponse, ModelError> {
            Ok(ModelResponse {
                message: Message::assistant("A fixed reply for testing."),
                model: "fixed-model".into(),
                usage: None,
            })
        }
    }

    fn selector() -> UseCaseSelector {
        UseCaseSelector::new(
            Arc::new(FixedModel),
            "fixed-model",
            Arc::new(NoopStore),
            Arc::new(NoopSink),
            ValidationConfig::default(),
            MemoryConfig::default(),
        )
    }

    #[test]
    fn usecase_parsing() {
        assert_eq!(UseCase::from_str("basic").unwrap(), UseCase::BasicChat);
        assert_eq!(UseCase::from_str("MCP").unwrap(), UseCase::McpChat);
        assert_eq!(UseCase::from_str("news-chat").unwrap(), UseCase::NewsChat);
        assert!(matches!(
            UseCase::from_str("sdlc"),
            Err(ConfigError::UnknownUseCase(_))
        ));
    }

    #[test]
    fn basic_chat_is_single_step() {
        let sm = selector()
            .build(UseCase::BasicChat, SessionOptions::new("s1"))
            .unwrap();
        assert_eq!(sm.topology(), Topology::SingleStep);
    }

    #[test]
    fn tool_chat_requires_descriptors() {
        let result = selector().build(UseCase::ToolChat, SessionOptions::new("s1"));
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::NoToolsAvailable { .. }))
        ));
    }

    #[test]
    fn tool_chat_builds_with_descriptors() {
        let options = SessionOptions::new("s1")
            .with_descriptors(vec![ToolDescriptor::new("search", "uvx")]);
        let sm = selector().build(UseCase::ToolChat, options).unwrap();
        assert_eq!(sm.topology(), Topology::ToolAugmented);
    }

    #[test]
    fn mcp_chat_requires_catalog() {
        let result = selector().build(UseCase::McpChat, SessionOptions::new("s1"));
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::NoToolsAvailable { .. }))
        ));
    }

    #[test]
    fn mcp_chat_rejects_catalog_with_no_usable_servers() {
        let json = r#"{ "mcpServers": { "dead": { "command": "uvx", "disabled": true } } }"#;
        let catalog = McpConfig::parse_str(json, "test").unwrap();
        let options = SessionOptions::new("s1").with_mcp(catalog);
        let result = selector().build(UseCase::McpChat, options);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::NoToolsAvailable { .. }))
        ));
    }

    #[test]
    fn mcp_chat_builds_from_catalog() {
        let json = r#"{ "mcpServers": { "search": { "command": "uvx" } } }"#;
        let catalog = McpConfig::parse_str(json, "test").unwrap();
        let options = SessionOptions::new("s1").with_mcp(catalog);
        let sm = selector().build(UseCase::McpChat, options).unwrap();
        assert_eq!(sm.topology(), Topology::ToolAugmented);
    }
}
