//! Subprocess tool gateway.
//!
//! The gateway holds the registered tool set for a session and executes
//! invocations as short-lived subprocesses. Each invocation spawns the
//! tool command, writes one JSON request envelope to its stdin, and reads
//! stdout/stderr until the process exits or the timeout elapses.
//!
//! Invocation never returns `Err`: every failure mode (unknown tool, spawn
//! failure, non-zero exit, timeout) is rendered into a `ToolCallResult`
//! so the conversation can continue with the error folded in as a tool
//! message.

use chatloom_config::McpConfig;
use chatloom_core::model::ToolDefinition;
use chatloom_core::{ConfigError, ToolCallResult, ToolDescriptor};
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Executes registered tools as subprocesses.
pub struct ToolGateway {
    tools: HashMap<String, ToolDescriptor>,
    default_timeout: Duration,
}

impl ToolGateway {
    /// Create an empty gateway with the given per-invocation timeout.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            tools: HashMap::new(),
            default_timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Register a single tool descriptor. Registering the same name twice
    /// replaces the earlier entry.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), ConfigError> {
        if descriptor.command.trim().is_empty() {
            return Err(ConfigError::InvalidDescriptor {
                name: descriptor.name.clone(),
                reason: "command must not be empty".into(),
            });
        }

        debug!(tool = %descriptor.name, command = %descriptor.command, "Registered tool");
        self.tools.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Register every usable server from a parsed catalog, best-effort.
    /// Disabled servers are skipped silently; malformed entries are
    /// skipped with a warning. Returns how many tools were registered.
    pub fn register_config(&mut self, config: &McpConfig) -> usize {
        let mut registered = 0;

        for descriptor in config.to_descriptors() {
            // One generated tool per server; honor its own exclusion list
            // whether it names the prefixed or bare form.
            let bare = descriptor.name.strip_prefix("mcp_").unwrap_or(&descriptor.name);
            if descriptor
                .disabled_tools
                .iter()
                .any(|t| t == &descriptor.name || t == bare)
            {
                debug!(tool = %descriptor.name, "Tool excluded by disabledTools");
                continue;
            }

            match self.register(descriptor) {
                Ok(()) => registered += 1,
                Err(e) => warn!(error = %e, "Skipping malformed server entry"),
            }
        }

        registered
    }

    /// Invoke a registered tool with a free-text query.
    ///
    /// Always returns a result; failures are rendered as error results.
    pub async fn invoke(&self, name: &str, query: &str) -> ToolCallResult {
        let Some(descriptor) = self.tools.get(name) else {
            return ToolCallResult::err(format!("Tool not found: {name}"));
        };

        let envelope = serde_json::json!({
            "method": "tools/call",
            "params": {
                "name": name,
                "arguments": { "query": query }
            }
        });

        debug!(tool = %name, "Invoking tool");

        let mut child = match Command::new(&descriptor.command)
            .args(&descriptor.args)
            .envs(&descriptor.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(tool = %name, error = %e, "Failed to spawn tool process");
                return ToolCallResult::err(format!("Failed to start tool process: {e}"));
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            let mut request = envelope.to_string();
            request.push('\n');
            if let Err(e) = stdin.write_all(request.as_bytes()).await {
                warn!(tool = %name, error = %e, "Failed to write tool request");
                return ToolCallResult::err(format!("Failed to send request to tool: {e}"));
            }
            // Dropping stdin closes the pipe so the tool sees EOF.
        }

        let output = match tokio::time::timeout(self.default_timeout, child.wait_with_output())
            .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool process failed");
                return ToolCallResult::err(format!("Tool process failed: {e}"));
            }
            Err(_) => {
                warn!(tool = %name, timeout_secs = self.default_timeout.as_secs(), "Tool timed out");
                return ToolCallResult::err(format!(
                    "Tool timed out after {}s",
                    self.default_timeout.as_secs()
                ));
            }
        };

        if output.status.success() {
            ToolCallResult::ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                format!("exit status {}", output.status)
            } else {
                stderr
            };
            ToolCallResult::err(detail)
        }
    }

    /// Probe whether a tool's command runs at all: spawn it with `--help`
    /// and report success only on a zero exit within the probe timeout.
    pub async fn is_available(descriptor: &ToolDescriptor) -> bool {
        let probe = Command::new(&descriptor.command)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        match probe {
            Ok(child) => {
                matches!(
                    tokio::time::timeout(PROBE_TIMEOUT, child.wait_with_output()).await,
                    Ok(Ok(output)) if output.status.success()
                )
            }
            Err(_) => false,
        }
    }

    /// Tool definitions to advertise to the model. Every tool takes a
    /// single free-text query.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|d| ToolDefinition {
                name: d.name.clone(),
                description: format!("Send a free-text query to the {} tool", d.name),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The query to send to the tool"
                        }
                    },
                    "required": ["query"]
                }),
            })
            .collect();

        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh_tool(name: &str, script: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, "sh").with_args(vec!["-c".into(), script.into()])
    }

    #[test]
    fn register_rejects_empty_command() {
        let mut gateway = ToolGateway::new(30);
        let result = gateway.register(ToolDescriptor::new("broken", "  "));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidDescriptor { .. })
        ));
        assert!(gateway.is_empty());
    }

    #[test]
    fn reregistering_identical_descriptor_is_idempotent() {
        let mut gateway = ToolGateway::new(30);
        let descriptor = sh_tool("mcp_echo", "cat");
        gateway.register(descriptor.clone()).unwrap();
        gateway.register(descriptor).unwrap();
        assert_eq!(gateway.len(), 1);
    }

    #[test]
    fn register_config_skips_disabled_and_excluded() {
        let json = r#"{
            "mcpServers": {
                "search": { "command": "uvx", "args": ["mcp-server-search"] },
                "legacy": { "command": "uvx", "disabled": true },
                "muted": { "command": "uvx", "disabledTools": ["muted"] }
            }
        }"#;
        let config = McpConfig::parse_str(json, "test").unwrap();
        let mut gateway = ToolGateway::new(30);
        let registered = gateway.register_config(&config);
        assert_eq!(registered, 1);
        assert_eq!(gateway.names(), vec!["mcp_search".to_string()]);
    }

    #[test]
    fn register_config_honors_prefixed_exclusion() {
        let json = r#"{
            "mcpServers": {
                "news": { "command": "uvx", "disabledTools": ["mcp_news"] }
            }
        }"#;
        let config = McpConfig::parse_str(json, "test").unwrap();
        let mut gateway = ToolGateway::new(30);
        assert_eq!(gateway.register_config(&config), 0);
    }

    #[test]
    fn definitions_use_query_schema() {
        let mut gateway = ToolGateway::new(30);
        gateway.register(sh_tool("mcp_echo", "cat")).unwrap();
        let defs = gateway.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "mcp_echo");
        assert_eq!(defs[0].parameters["required"][0], "query");
    }

    #[tokio::test]
    async fn invoke_unknown_tool_is_error_result() {
        let gateway = ToolGateway::new(30);
        let result = gateway.invoke("nope", "hello").await;
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("Tool not found"));
    }

    #[tokio::test]
    async fn invoke_passes_envelope_on_stdin() {
        let mut gateway = ToolGateway::new(30);
        gateway.register(sh_tool("mcp_echo", "cat")).unwrap();

        let result = gateway.invoke("mcp_echo", "what is the weather").await;
        assert!(result.ok);

        let envelope: serde_json::Value = serde_json::from_str(&result.text).unwrap();
        assert_eq!(envelope["method"], "tools/call");
        assert_eq!(envelope["params"]["name"], "mcp_echo");
        assert_eq!(envelope["params"]["arguments"]["query"], "what is the weather");
    }

    #[tokio::test]
    async fn invoke_nonzero_exit_returns_stderr() {
        let mut gateway = ToolGateway::new(30);
        gateway
            .register(sh_tool("mcp_fail", "echo 'server exploded' >&2; exit 3"))
            .unwrap();

        let result = gateway.invoke("mcp_fail", "anything").await;
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("server exploded"));
    }

    #[tokio::test]
    async fn invoke_spawn_failure_is_error_result() {
        let mut gateway = ToolGateway::new(30);
        gateway
            .register(ToolDescriptor::new("mcp_ghost", "/nonexistent/binary"))
            .unwrap();

        let result = gateway.invoke("mcp_ghost", "anything").await;
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("Failed to start tool process"));
    }

    #[tokio::test]
    async fn invoke_times_out() {
        let mut gateway = ToolGateway::new(1);
        gateway.register(sh_tool("mcp_slow", "sleep 10")).unwrap();

        let result = gateway.invoke("mcp_slow", "anything").await;
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("timed out after 1s"));
    }

    #[tokio::test]
    async fn is_available_requires_zero_exit() {
        assert!(ToolGateway::is_available(&ToolDescriptor::new("mcp_ok", "true")).await);
        // `false --help` exits nonzero; an exit within the timeout is not
        // enough on its own.
        assert!(!ToolGateway::is_available(&ToolDescriptor::new("mcp_bad", "false")).await);
        assert!(
            !ToolGateway::is_available(&ToolDescriptor::new("mcp_ghost", "/nonexistent/binary"))
                .await
        );
    }

    #[tokio::test]
    async fn invoke_applies_env_overrides() {
        let mut gateway = ToolGateway::new(30);
        let mut env = HashMap::new();
        env.insert("TOOL_GREETING".to_string(), "bonjour".to_string());
        gateway
            .register(
                ToolDescriptor::new("mcp_env", "sh")
                    .with_args(vec!["-c".into(), "printf '%s' \"$TOOL_GREETING\"".into()])
                    .with_env(env),
            )
            .unwrap();

        let result = gateway.invoke("mcp_env", "anything").await;
        assert!(result.ok);
        assert_eq!(result.text, "bonjour");
    }
}
