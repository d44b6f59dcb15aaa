//! Publish sink for the finished report blob. Success or failure is
//! binary; there are no partial-upload semantics.

use async_trait::async_trait;
use tracing::info;

use crate::error::{ReportError, Result};

/// Destination that durably stores a named blob.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn publish(&self, name: &str, data: &[u8]) -> Result<()>;
}

/// Publishes the report with an HTTP PUT against a blob endpoint.
pub struct HttpBlobSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBlobSink {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ReportSink for HttpBlobSink {
    async fn publish(&self, name: &str, data: &[u8]) -> Result<()> {
        let url = format!("{}/{}", self.endpoint, name);
        let response = self
            .client
            .put(&url)
            .header(
                "Content-Type",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            )
            .body(data.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ReportError::Publish(format!(
                "blob endpoint returned {} for '{}'",
                response.status(),
                name
            )));
        }

        info!("Report uploaded to {}", url);
        Ok(())
    }
}
