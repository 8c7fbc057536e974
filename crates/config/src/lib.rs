//! Configuration loading, validation, and management for Chatloom.
//!
//! Loads configuration from `~/.chatloom/config.toml` with environment
//! variable overrides. Validates all settings at startup. External tool
//! server catalogs live in their own JSON format, handled by [`mcp`].

pub mod mcp;

pub use mcp::{McpConfig, McpServerConfig};

use chatloom_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.chatloom/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Maximum reasoning/tool-execution cycles per turn
    #[serde(default = "default_max_tool_cycles")]
    pub max_tool_cycles: u32,

    /// Per-invocation tool timeout in seconds
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Tools supplied to the tool-chat and news use cases
    #[serde(default)]
    pub tools: Vec<ToolEntry>,

    /// Validation (guardrail) configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Memory configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_max_tool_cycles() -> u32 {
    10
}
fn default_tool_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("max_tool_cycles", &self.max_tool_cycles)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("tools", &self.tools)
            .field("validation", &self.validation)
            .field("memory", &self.memory)
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

/// A tool supplied directly through the application config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Tool name as advertised to the model
    pub name: String,

    /// The command to spawn
    pub command: String,

    /// Arguments passed to the command
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment overrides for the spawned process
    #[serde(default)]
    pub env: std::collections::HashMap<String, String>,
}

impl ToolEntry {
    pub fn to_descriptor(&self) -> chatloom_core::ToolDescriptor {
        chatloom_core::ToolDescriptor::new(&self.name, &self.command)
            .with_args(self.args.clone())
            .with_env(self.env.clone())
    }
}

/// Input/output guardrail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Whether validation stages run at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum accepted input length in characters
    #[serde(default = "default_input_min")]
    pub input_min_chars: usize,

    /// Maximum accepted input length in characters
    #[serde(default = "default_input_max")]
    pub input_max_chars: usize,

    /// Minimum accepted output length in characters
    #[serde(default = "default_output_min")]
    pub output_min_chars: usize,

    /// Maximum accepted output length in characters
    #[serde(default = "default_output_max")]
    pub output_max_chars: usize,

    /// Terms rejected as profanity (substring match, case-insensitive)
    #[serde(default)]
    pub profanity_terms: Vec<String>,

    /// Terms rejected as toxic language (substring match, case-insensitive)
    #[serde(default)]
    pub toxic_terms: Vec<String>,

    /// Topics blocked by content moderation for tool-backed use cases
    #[serde(default = "default_sensitive_topics")]
    pub sensitive_topics: Vec<String>,
}

fn default_input_min() -> usize {
    1
}
fn default_input_max() -> usize {
    2000
}
fn default_output_min() -> usize {
    10
}
fn default_output_max() -> usize {
    5000
}
fn default_sensitive_topics() -> Vec<String> {
    vec![
        "violence".into(),
        "hate speech".into(),
        "harassment".into(),
        "illegal activities".into(),
        "self harm".into(),
    ]
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            input_min_chars: default_input_min(),
            input_max_chars: default_input_max(),
            output_min_chars: default_output_min(),
            output_max_chars: default_output_max(),
            profanity_terms: vec![],
            toxic_terms: vec![],
            sensitive_topics: default_sensitive_topics(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Memory backend: "in_memory" or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Whether completed exchanges are recorded automatically
    #[serde(default = "default_true")]
    pub auto_save: bool,

    /// Recall lookup timeout in seconds
    #[serde(default = "default_recall_timeout_secs")]
    pub recall_timeout_secs: u64,
}

fn default_memory_backend() -> String {
    "in_memory".into()
}
fn default_recall_timeout_secs() -> u64 {
    2
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            auto_save: true,
            recall_timeout_secs: default_recall_timeout_secs(),
        }
    }
}

/// Telemetry export configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Whether telemetry export is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Telemetry endpoint base URL
    #[serde(default = "default_telemetry_host")]
    pub host: String,

    /// Public key (basic auth username)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// Secret key (basic auth password)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

fn default_telemetry_host() -> String {
    "http://localhost:3000".into()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_telemetry_host(),
            public_key: None,
            secret_key: None,
        }
    }
}

impl std::fmt::Debug for TelemetryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryConfig")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("public_key", &self.public_key)
            .field("secret_key", &redact(&self.secret_key))
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.chatloom/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `CHATLOOM_API_KEY` (highest priority)
    /// - `GROQ_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("CHATLOOM_API_KEY")
                .ok()
                .or_else(|| std::env::var("GROQ_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("CHATLOOM_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("CHATLOOM_MODEL") {
            config.default_model = model;
        }

        // Telemetry credentials may live in the environment only
        if config.telemetry.public_key.is_none() {
            config.telemetry.public_key = std::env::var("CHATLOOM_TELEMETRY_PUBLIC_KEY").ok();
        }
        if config.telemetry.secret_key.is_none() {
            config.telemetry.secret_key = std::env::var("CHATLOOM_TELEMETRY_SECRET_KEY").ok();
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatloom")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.max_tool_cycles == 0 {
            return Err(ConfigError::ValidationError(
                "max_tool_cycles must be at least 1".into(),
            ));
        }

        if self.validation.input_min_chars > self.validation.input_max_chars {
            return Err(ConfigError::ValidationError(
                "input_min_chars must not exceed input_max_chars".into(),
            ));
        }

        if self.validation.output_min_chars > self.validation.output_max_chars {
            return Err(ConfigError::ValidationError(
                "output_min_chars must not exceed output_max_chars".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            max_tool_cycles: default_max_tool_cycles(),
            tool_timeout_secs: default_tool_timeout_secs(),
            tools: Vec::new(),
            validation: ValidationConfig::default(),
            memory: MemoryConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Get the user's home directory.
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
