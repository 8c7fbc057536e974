//! # Chatloom Core
//!
//! Domain types, traits, and error definitions for the Chatloom agent runtime.
//! This crate has **zero framework dependencies** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (LLM backend, memory store, telemetry sink)
//! is defined as a trait here. Implementations live in their respective
//! crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod memory;
pub mod message;
pub mod model;
pub mod telemetry;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ConfigError, Error, MemoryError, ModelError, Result, TelemetryError, ToolError};
pub use memory::MemoryStore;
pub use message::{Conversation, ConversationId, Message, Role};
pub use model::{Model, ModelRequest, ModelResponse, ToolDefinition, Usage};
pub use telemetry::{InteractionRecord, TelemetrySink};
pub use tool::{ToolCallRequest, ToolCallResult, ToolDescriptor};
