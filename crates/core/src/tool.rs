//! Tool domain types — descriptors and call envelopes.
//!
//! A `ToolDescriptor` declares how to run an external tool process; it is
//! constructed once from configuration at session setup and immutable
//! thereafter. A `ToolCallRequest` carries a tool name plus a single
//! free-text query; a `ToolCallResult` carries either textual output or an
//! error. Results are folded into the conversation as tool messages and
//! then discarded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declares an external tool: how to spawn it and whether it is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique name within a tool set
    pub name: String,

    /// The command to spawn
    pub command: String,

    /// Arguments passed to the command
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment overrides, merged over the ambient environment
    /// (descriptor values win on key collision)
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Whether this tool is disabled entirely
    #[serde(default)]
    pub disabled: bool,

    /// For multi-tool sources: tool names to exclude from the set
    #[serde(default)]
    pub disabled_tools: Vec<String>,
}

impl ToolDescriptor {
    /// Create a descriptor with just a name and command.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            disabled: false,
            disabled_tools: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

/// A request to invoke a tool, as emitted by the reasoning step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique call ID (matches the model's tool_call id)
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Single free-text query payload
    pub query: String,
}

/// The outcome of a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Whether the tool exited successfully
    pub ok: bool,

    /// Tool output (stdout) on success
    #[serde(default)]
    pub text: String,

    /// Error description on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            text: text.into(),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: String::new(),
            error: Some(error.into()),
        }
    }

    /// Render this result as tool-message content.
    pub fn into_content(self) -> String {
        if self.ok {
            self.text
        } else {
            format!("Error: {}", self.error.unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_builder() {
        let desc = ToolDescriptor::new("filesystem", "uvx")
            .with_args(vec!["mcp-server-filesystem".into(), "/tmp".into()]);
        assert_eq!(desc.name, "filesystem");
        assert_eq!(desc.command, "uvx");
        assert_eq!(desc.args.len(), 2);
        assert!(!desc.disabled);
    }

    #[test]
    fn result_content_rendering() {
        assert_eq!(ToolCallResult::ok("42").into_content(), "42");
        assert_eq!(
            ToolCallResult::err("timeout").into_content(),
            "Error: timeout"
        );
    }

    #[test]
    fn descriptor_equality_for_idempotent_registration() {
        let a = ToolDescriptor::new("search", "uvx").with_args(vec!["mcp-server-search".into()]);
        let b = ToolDescriptor::new("search", "uvx").with_args(vec!["mcp-server-search".into()]);
        assert_eq!(a, b);
    }
}
