//! Error types for the Chatloom domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context
//! has its own error enum, aggregated into a top-level `Error`.
//!
//! Propagation policy: only `ConfigError` is a hard failure that reaches
//! the operator. Tool failures are folded into the conversation as tool
//! messages with error text, validation failures are replaced with fixed
//! safe messages, and memory/telemetry unavailability is silent.

use thiserror::Error;

/// The top-level error type for all Chatloom operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Configuration errors (fatal to session setup) ---
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // --- Model backend errors ---
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Telemetry errors ---
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Invalid or missing setup input. The one category that must be surfaced
/// to the operator, never silently defaulted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: String, reason: String },

    #[error("Failed to parse config at {path}: {reason}")]
    ParseError { path: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Unknown use case: {0}")]
    UnknownUseCase(String),

    #[error("No tools available for use case '{usecase}': {reason}")]
    NoToolsAvailable { usecase: String, reason: String },

    #[error("Invalid tool descriptor '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// A tool subprocess failed, errored, or timed out. Non-fatal: folded into
/// the conversation as a tool message, never thrown past the gateway.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool spawn failed: {tool_name} — {reason}")]
    SpawnFailed { tool_name: String, reason: String },

    #[error("Tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Record failed: {0}")]
    RecordFailed(String),
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Sink unreachable: {0}")]
    Unreachable(String),

    #[error("Export failed: {0}")]
    ExportFailed(String),
}
