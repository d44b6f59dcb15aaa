use serde::Deserialize;
use std::fs;

use crate::error::{ReportError, Result};

/// Immutable run configuration, loaded once and handed to the pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub enrichment: EnrichmentConfig,
    pub report: ReportConfig,
    /// Optional blob endpoint; without it the report stays local.
    #[serde(default)]
    pub publish: Option<PublishConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Path to the delimited projection export.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub output_dir: String,
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    pub endpoint: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            ReportError::Config(format!("Failed to read config file '{}': {}", path, e))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_config() {
        let config: Config = toml::from_str(
            r#"
            [source]
            path = "proyeccion.csv"

            [enrichment]
            base_url = "http://localhost:8080"
            timeout_seconds = 30

            [report]
            output_dir = "output"
            filename = "comparacion_proyeccion_vs_real.xlsx"

            [publish]
            endpoint = "http://localhost:9000/proyecciones"
            "#,
        )
        .unwrap();

        assert_eq!(config.source.path, "proyeccion.csv");
        assert!(config.publish.is_some());
    }

    #[test]
    fn publish_section_is_optional() {
        let config: Config = toml::from_str(
            r#"
            [source]
            path = "proyeccion.csv"

            [enrichment]
            base_url = "http://localhost:8080"
            timeout_seconds = 30

            [report]
            output_dir = "output"
            filename = "report.xlsx"
            "#,
        )
        .unwrap();

        assert!(config.publish.is_none());
    }
}
