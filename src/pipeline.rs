use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Config;
use crate::constants::{DUPLICATE_DATE_RECORD, GENERAL_ERROR_PREFIX};
use crate::enrich::ReceptionLookup;
use crate::error::Result;
use crate::ingest;
use crate::record::NormalizedRecord;
use crate::report::{self, ReportDocument};
use crate::schema;
use crate::sink::ReportSink;

/// Category of one accumulated failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// A per-record enrichment lookup failed.
    Enrichment,
    /// The enrichment source reported an already-existing date record.
    DuplicateRecord,
    /// The single run-aborting failure.
    General,
}

/// One non-fatal failure tied to a source entry (1-based), or the single
/// run-aborting failure. Entries are append-only for the whole run.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub index: Option<usize>,
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorEntry {
    /// Classifies an enrichment failure, special-casing the known
    /// duplicate-date message into its own category.
    pub fn for_enrichment_failure(index: usize, message: String) -> Self {
        let kind = if message.contains(DUPLICATE_DATE_RECORD) {
            ErrorKind::DuplicateRecord
        } else {
            ErrorKind::Enrichment
        };

        Self {
            index: Some(index),
            kind,
            message,
        }
    }

    pub fn general(message: String) -> Self {
        Self {
            index: None,
            kind: ErrorKind::General,
            message,
        }
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.index) {
            (ErrorKind::DuplicateRecord, Some(index)) => {
                write!(f, "Entry {}: {}", index, self.message)
            }
            (_, Some(index)) => write!(f, "Error processing entry {}: {}", index, self.message),
            (_, None) => write!(f, "{}: {}", GENERAL_ERROR_PREFIX, self.message),
        }
    }
}

/// Result of a complete pipeline run.
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub total_rows: usize,
    pub normalized_records: usize,
    pub dropped_rows: usize,
    pub enriched_records: usize,
    pub errors: Vec<ErrorEntry>,
    pub report_file: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineResult {
    fn empty() -> Self {
        Self {
            total_rows: 0,
            normalized_records: 0,
            dropped_rows: 0,
            enriched_records: 0,
            errors: Vec::new(),
            report_file: None,
            finished_at: Utc::now(),
        }
    }
}

/// Drives the full run: read, validate, enrich, group, emit, publish.
/// Rows are owned exclusively by the pipeline for the run's duration;
/// enrichment lookups run sequentially, strictly in row order.
pub struct Pipeline {
    config: Config,
    lookup: Box<dyn ReceptionLookup>,
    sink: Option<Arc<dyn ReportSink>>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        lookup: Box<dyn ReceptionLookup>,
        sink: Option<Arc<dyn ReportSink>>,
    ) -> Self {
        Self {
            config,
            lookup,
            sink,
        }
    }

    /// Runs the pipeline. Row-scoped failures accumulate in the result;
    /// a setup or report failure collapses into a single general error
    /// entry. This never returns an error itself.
    #[instrument(skip(self))]
    pub async fn run(&self) -> PipelineResult {
        counter!("projection_pipeline_runs_total").increment(1);
        let started = std::time::Instant::now();

        let mut result = PipelineResult::empty();
        if let Err(e) = self.run_inner(&mut result).await {
            error!("Pipeline run aborted: {}", e);
            result.errors.push(ErrorEntry::general(e.to_string()));
        }
        result.finished_at = Utc::now();

        histogram!("projection_pipeline_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        counter!("projection_pipeline_errors_total").increment(result.errors.len() as u64);

        if let Err(e) = self.persist_summary(&result) {
            warn!("Failed to persist run summary: {}", e);
        }

        result
    }

    async fn run_inner(&self, result: &mut PipelineResult) -> Result<()> {
        // Step 1: read and validate the source export
        info!("Reading source export from {}", self.config.source.path);
        let ingested =
            ingest::read_source(Path::new(&self.config.source.path), schema::projection_schema())?;
        result.total_rows = ingested.total_rows;
        result.normalized_records = ingested.records.len();
        result.dropped_rows = ingested.dropped_rows;
        info!(
            "Normalized {} of {} rows ({} dropped)",
            ingested.records.len(),
            ingested.total_rows,
            ingested.dropped_rows
        );
        counter!("projection_rows_total").increment(ingested.total_rows as u64);
        counter!("projection_rows_dropped_total").increment(ingested.dropped_rows as u64);

        // Step 2: connect to the enrichment source
        self.lookup.ensure_reachable().await?;

        // Step 3: enrich sequentially, one lookup in flight, in row order
        let total = ingested.records.len();
        let mut enriched: Vec<NormalizedRecord> = Vec::with_capacity(total);
        for (i, mut record) in ingested.records.into_iter().enumerate() {
            let index = i + 1;
            debug!("Processing entry {} of {}", index, total);

            match self.enrich_record(&mut record).await {
                Ok(()) => enriched.push(record),
                Err(e) => {
                    let entry = ErrorEntry::for_enrichment_failure(index, e.to_string());
                    warn!("{}", entry);
                    counter!("projection_enrichment_errors_total").increment(1);
                    result.errors.push(entry);
                }
            }
        }
        result.enriched_records = enriched.len();
        info!(
            "Enriched {} of {} records ({} errors)",
            enriched.len(),
            total,
            result.errors.len()
        );

        // Step 4: group and emit the report
        let document = ReportDocument::from_records(&enriched);
        std::fs::create_dir_all(&self.config.report.output_dir)?;
        let report_path =
            Path::new(&self.config.report.output_dir).join(&self.config.report.filename);
        report::write_workbook(&document, &report_path)?;
        info!(
            "Report written to {} ({} sheets)",
            report_path.display(),
            document.sections.len()
        );
        result.report_file = Some(report_path.to_string_lossy().to_string());

        // Step 5: hand the blob to the publish sink
        if let Some(sink) = &self.sink {
            let data = std::fs::read(&report_path)?;
            sink.publish(&self.config.report.filename, &data).await?;
        }

        Ok(())
    }

    async fn enrich_record(&self, record: &mut NormalizedRecord) -> Result<()> {
        let key = record.enrichment_key()?;
        let totals = self
            .lookup
            .reception_for(key.week, key.year, key.orchard_code)
            .await?;
        record.set_receptions(totals.reception_total, totals.reception_accepted);
        Ok(())
    }

    /// Persists the run summary (counts plus the full error list) next to
    /// the report, for external reporting to pick up. Best-effort.
    fn persist_summary(&self, result: &PipelineResult) -> Result<()> {
        std::fs::create_dir_all(&self.config.report.output_dir)?;
        let filename = format!(
            "run_summary_{}.json",
            result.finished_at.format("%Y%m%d_%H%M%S")
        );
        let path = Path::new(&self.config.report.output_dir).join(filename);
        let json_content = serde_json::to_string_pretty(result)?;
        std::fs::write(&path, json_content)?;
        debug!("Run summary written to {}", path.display());
        Ok(())
    }
}
