//! Enrichment lookup: reception aggregates keyed by week, year, and
//! orchard code. The adapter surfaces per-record failures to the caller
//! and never retries; retry policy, if any, belongs to the pipeline.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::EnrichmentConfig;
use crate::error::{ReportError, Result};

/// Aggregate reception quantities for one orchard week.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ReceptionTotals {
    pub reception_total: f64,
    pub reception_accepted: f64,
}

impl ReceptionTotals {
    /// The valid "no matching aggregate" response.
    pub fn zero() -> Self {
        Self {
            reception_total: 0.0,
            reception_accepted: 0.0,
        }
    }
}

/// Lookup service for reception aggregates.
#[async_trait]
pub trait ReceptionLookup: Send + Sync {
    /// Verify the service can be reached at all; called once per run
    /// before any per-record lookups.
    async fn ensure_reachable(&self) -> Result<()> {
        Ok(())
    }

    /// Fetch the aggregates for one `(week, year, orchard)` key. A key
    /// with no matching aggregate is a zeros response, not an error.
    async fn reception_for(&self, week: i32, year: i32, orchard_code: i64)
        -> Result<ReceptionTotals>;
}

/// HTTP adapter for the reception aggregation service.
pub struct HttpReceptionClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReceptionClient {
    pub fn new(config: &EnrichmentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReceptionLookup for HttpReceptionClient {
    async fn ensure_reachable(&self) -> Result<()> {
        // Any response at all means the service is up; status handling
        // belongs to the per-record lookups.
        self.client.head(&self.base_url).send().await?;
        Ok(())
    }

    async fn reception_for(
        &self,
        week: i32,
        year: i32,
        orchard_code: i64,
    ) -> Result<ReceptionTotals> {
        let url = format!("{}/receptions/aggregate", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("week", week.to_string()),
                ("year", year.to_string()),
                ("orchard", orchard_code.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Enrichment {
                message: format!("lookup returned {status}: {body}"),
            });
        }

        Ok(response.json().await?)
    }
}

/// In-memory lookup for development and testing.
#[derive(Debug, Default)]
pub struct InMemoryLookup {
    entries: HashMap<(i32, i32, i64), ReceptionTotals>,
    failures: HashMap<(i32, i32, i64), String>,
    unavailable: Option<String>,
}

impl InMemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, week: i32, year: i32, orchard_code: i64, totals: ReceptionTotals) -> Self {
        self.entries.insert((week, year, orchard_code), totals);
        self
    }

    pub fn with_failure(
        mut self,
        week: i32,
        year: i32,
        orchard_code: i64,
        message: impl Into<String>,
    ) -> Self {
        self.failures.insert((week, year, orchard_code), message.into());
        self
    }

    /// Makes the whole service unreachable, turning the run's setup step
    /// into a general failure.
    pub fn unreachable(mut self, message: impl Into<String>) -> Self {
        self.unavailable = Some(message.into());
        self
    }
}

#[async_trait]
impl ReceptionLookup for InMemoryLookup {
    async fn ensure_reachable(&self) -> Result<()> {
        match &self.unavailable {
            Some(message) => Err(ReportError::Enrichment {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn reception_for(
        &self,
        week: i32,
        year: i32,
        orchard_code: i64,
    ) -> Result<ReceptionTotals> {
        let key = (week, year, orchard_code);
        if let Some(message) = self.failures.get(&key) {
            return Err(ReportError::Enrichment {
                message: message.clone(),
            });
        }

        Ok(self.entries.get(&key).copied().unwrap_or_else(ReceptionTotals::zero))
    }
}
