//! TelemetrySink trait — observability export for completed turns.
//!
//! A sink receives one `InteractionRecord` per completed turn. Export is
//! fire-and-forget: a sink that is down or misconfigured never affects the
//! conversation.

use crate::error::TelemetryError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed turn, as exported to a telemetry sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// The use case that handled the turn
    pub usecase: String,

    /// The session this turn belongs to
    pub session_id: String,

    /// The operator's input text
    pub input: String,

    /// The final assistant text
    pub output: String,

    /// Which model produced the output
    pub model: String,

    /// When the turn completed
    pub timestamp: DateTime<Utc>,
}

impl InteractionRecord {
    pub fn new(
        usecase: impl Into<String>,
        session_id: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            usecase: usecase.into(),
            session_id: session_id.into(),
            input: input.into(),
            output: output.into(),
            model: model.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Destination for interaction records.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// A human-readable name for this sink (e.g., "http", "none").
    fn name(&self) -> &str;

    /// Export one record. Callers ignore the error beyond logging it.
    async fn record(&self, record: InteractionRecord) -> std::result::Result<(), TelemetryError>;
}
