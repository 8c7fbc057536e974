//! External tool server catalogs.
//!
//! Server catalogs are JSON files with a required top-level `mcpServers`
//! object. Two locations are merged: the user-level catalog at
//! `~/.chatloom/mcp.json` and the workspace catalog at
//! `.chatloom/mcp.json`. On a server name collision the workspace
//! entry wins.
//!
//! A catalog with no `mcpServers` key is malformed and rejected outright,
//! never treated as empty.

use chatloom_core::{ConfigError, ToolDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A parsed server catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Configured servers, keyed by server name. Required: a catalog
    /// without this key fails to parse.
    #[serde(rename = "mcpServers")]
    pub servers: HashMap<String, McpServerConfig>,
}

/// One server entry in a catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// The command to spawn
    pub command: String,

    /// Arguments passed to the command
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment overrides for the spawned process
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Whether this server is disabled entirely
    #[serde(default)]
    pub disabled: bool,

    /// Tool names pre-approved for invocation without prompting
    #[serde(default, rename = "autoApprove")]
    pub auto_approve: Vec<String>,

    /// Tool names excluded from the server's tool set
    #[serde(default, rename = "disabledTools")]
    pub disabled_tools: Vec<String>,
}

impl McpConfig {
    /// An empty catalog (no servers configured).
    pub fn empty() -> Self {
        Self {
            servers: HashMap::new(),
        }
    }

    /// Parse a catalog from JSON text.
    pub fn parse_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
            path: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load a catalog from a JSON file. A missing file yields an empty
    /// catalog; a present but malformed file is an error.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::empty());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::parse_str(&content, &path.display().to_string())
    }

    /// Load and merge the user and workspace catalogs. On a server name
    /// collision the workspace entry wins.
    pub fn load_merged(user_path: &Path, workspace_path: &Path) -> Result<Self, ConfigError> {
        let mut merged = Self::load_file(user_path)?;
        let workspace = Self::load_file(workspace_path)?;

        for (name, server) in workspace.servers {
            merged.servers.insert(name, server);
        }

        Ok(merged)
    }

    /// The default user-level catalog path (~/.chatloom/mcp.json).
    pub fn user_path() -> PathBuf {
        dirs_home().join(".chatloom").join("mcp.json")
    }

    /// The workspace catalog path relative to the current directory.
    pub fn workspace_path() -> PathBuf {
        PathBuf::from(".chatloom").join("mcp.json")
    }

    /// Server entries that are not disabled.
    pub fn enabled_servers(&self) -> impl Iterator<Item = (&String, &McpServerConfig)> {
        self.servers.iter().filter(|(_, s)| !s.disabled)
    }

    /// Convert enabled server entries into tool descriptors, one per
    /// server, named `mcp_{server}`.
    pub fn to_descriptors(&self) -> Vec<ToolDescriptor> {
        self.enabled_servers()
            .map(|(name, server)| ToolDescriptor {
                name: format!("mcp_{name}"),
                command: server.command.clone(),
                args: server.args.clone(),
                env: server.env.clone(),
                disabled: false,
                disabled_tools: server.disabled_tools.clone(),
            })
            .collect()
    }
}

fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}
