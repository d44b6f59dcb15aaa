use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Enrichment lookup failed: {message}")]
    Enrichment { message: String },

    #[error("Report generation failed: {0}")]
    Report(String),

    #[error("Publish failed: {0}")]
    Publish(String),
}

pub type Result<T> = std::result::Result<T, ReportError>;
