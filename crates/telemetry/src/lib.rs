//! Telemetry sinks for Chatloom.
//!
//! Sinks receive one interaction record per completed turn. Export is
//! strictly best-effort: a sink that is disabled, misconfigured, or
//! unreachable never affects the conversation.

pub mod http;

pub use http::HttpSink;

use async_trait::async_trait;
use chatloom_config::TelemetryConfig;
use chatloom_core::{InteractionRecord, TelemetryError, TelemetrySink};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Discards all records.
pub struct NoopSink;

#[async_trait]
impl TelemetrySink for NoopSink {
    fn name(&self) -> &str {
        "none"
    }

    async fn record(&self, _record: InteractionRecord) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Keeps records in memory. Used in tests to assert on exported turns.
pub struct MemorySink {
    records: RwLock<Vec<InteractionRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub async fn records(&self) -> Vec<InteractionRecord> {
        self.records.read().await.clone()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn record(&self, record: InteractionRecord) -> Result<(), TelemetryError> {
        self.records.write().await.push(record);
        Ok(())
    }
}

/// Build a sink from configuration. Never fails: a disabled or
/// incompletely-configured sink degrades to the no-op sink.
pub fn sink_from_config(config: &TelemetryConfig) -> Arc<dyn TelemetrySink> {
    if !config.enabled {
        return Arc::new(NoopSink);
    }

    match (&config.public_key, &config.secret_key) {
        (Some(public_key), Some(secret_key)) => Arc::new(HttpSink::new(
            &config.host,
            public_key.clone(),
            secret_key.clone(),
        )),
        _ => {
            tracing::debug!("Telemetry enabled but keys missing, export disabled");
            Arc::new(NoopSink)
        }
    }
}
