//! HTTP telemetry sink.
//!
//! Posts each interaction record as JSON to `{host}/api/public/ingestion`
//! with basic auth. Uses a short client timeout so a slow endpoint cannot
//! hold up anything waiting on the export task.

use async_trait::async_trait;
use chatloom_core::{InteractionRecord, TelemetryError, TelemetrySink};
use tracing::debug;

const EXPORT_TIMEOUT_SECS: u64 = 5;

pub struct HttpSink {
    endpoint: String,
    public_key: String,
    secret_key: String,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(host: &str, public_key: String, secret_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(EXPORT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: format!("{}/api/public/ingestion", host.trim_end_matches('/')),
            public_key,
            secret_key,
            client,
        }
    }
}

#[async_trait]
impl TelemetrySink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn record(&self, record: InteractionRecord) -> Result<(), TelemetryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(&record)
            .send()
            .await
            .map_err(|e| TelemetryError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TelemetryError::ExportFailed(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        debug!(usecase = %record.usecase, "Exported interaction record");
        Ok(())
    }
}
