use clap::{Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use projection_report::config::Config;
use projection_report::enrich::HttpReceptionClient;
use projection_report::ingest;
use projection_report::logging;
use projection_report::pipeline::{Pipeline, PipelineResult};
use projection_report::schema;
use projection_report::sink::{HttpBlobSink, ReportSink};

#[derive(Parser)]
#[command(name = "projection_report")]
#[command(about = "Harvest projection vs. reception comparison report generator")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: ingest, enrich, report, publish
    Run,
    /// Validate and normalize the source export without enriching or publishing
    Normalize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)?;

    match cli.command {
        Commands::Run => {
            println!("🚀 Running projection report pipeline...");

            let lookup = HttpReceptionClient::new(&config.enrichment)?;
            let sink = config
                .publish
                .as_ref()
                .map(|publish| Arc::new(HttpBlobSink::new(&publish.endpoint)) as Arc<dyn ReportSink>);

            let pipeline = Pipeline::new(config, Box::new(lookup), sink);
            let result = pipeline.run().await;
            print_summary(&result);
        }
        Commands::Normalize => {
            println!("🔍 Validating source export...");

            let ingested = ingest::read_source(
                Path::new(&config.source.path),
                schema::projection_schema(),
            )?;
            println!("\n📊 Validation results:");
            println!("   Source rows: {}", ingested.total_rows);
            println!("   Normalized: {}", ingested.records.len());
            println!("   Dropped: {}", ingested.dropped_rows);
        }
    }

    Ok(())
}

fn print_summary(result: &PipelineResult) {
    println!("\n📊 Pipeline results:");
    println!("   Source rows: {}", result.total_rows);
    println!(
        "   Normalized: {} ({} dropped)",
        result.normalized_records, result.dropped_rows
    );
    println!("   Enriched: {}", result.enriched_records);
    println!("   Errors: {}", result.errors.len());
    if let Some(report_file) = &result.report_file {
        println!("   Report file: {}", report_file);
    }

    if !result.errors.is_empty() {
        warn!("{} errors encountered during pipeline run", result.errors.len());
        println!("\n⚠️  Errors encountered:");
        for error in &result.errors {
            println!("   - {}", error);
        }
    }
}
