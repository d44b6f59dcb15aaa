use indexmap::IndexMap;
use serde::Serialize;

use crate::constants::fields;
use crate::error::{ReportError, Result};

/// Typed value of one normalized field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    /// Explicit "no value" marker produced by the decimal transform.
    Empty,
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(number) => Some(*number),
            _ => None,
        }
    }
}

/// Composite identifier a record is enriched by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentKey {
    pub week: i32,
    pub year: i32,
    pub orchard_code: i64,
}

/// One validated input row: field name to typed value, in schema order.
/// Enrichment appends its two reception fields after the schema fields.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct NormalizedRecord {
    values: IndexMap<String, CellValue>,
}

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: CellValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.values.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn cell_values(&self) -> impl Iterator<Item = &CellValue> {
        self.values.values()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The grouping key used to partition report sheets.
    pub fn producer_name(&self) -> Option<&str> {
        self.get(fields::PRODUCER_NAME).and_then(CellValue::as_text)
    }

    /// Extracts the `(week, year, orchard)` lookup key from the record's
    /// own fields. Failures here surface as enrichment errors for the
    /// row, not as drops.
    pub fn enrichment_key(&self) -> Result<EnrichmentKey> {
        Ok(EnrichmentKey {
            week: self.integer_field(fields::WEEK)? as i32,
            year: self.integer_field(fields::YEAR)? as i32,
            orchard_code: self.integer_field(fields::ORCHARD_CODE)?,
        })
    }

    /// Attaches the reception aggregates fetched for this record.
    pub fn set_receptions(&mut self, total: f64, accepted: f64) {
        self.insert(fields::RECEPTION_TOTAL, CellValue::Number(total));
        self.insert(fields::RECEPTION_ACCEPTED, CellValue::Number(accepted));
    }

    fn integer_field(&self, name: &str) -> Result<i64> {
        match self.get(name) {
            Some(CellValue::Number(number)) => Ok(*number as i64),
            Some(CellValue::Text(text)) => {
                text.trim().parse().map_err(|_| ReportError::Enrichment {
                    message: format!("field '{name}' is not numeric: '{text}'"),
                })
            }
            _ => Err(ReportError::Enrichment {
                message: format!("field '{name}' is missing for the enrichment lookup"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_key() -> NormalizedRecord {
        let mut record = NormalizedRecord::new();
        record.insert(fields::WEEK, CellValue::Text("23".into()));
        record.insert(fields::YEAR, CellValue::Number(2023.0));
        record.insert(fields::ORCHARD_CODE, CellValue::Number(4512.0));
        record
    }

    #[test]
    fn enrichment_key_reads_week_year_and_orchard() {
        let key = record_with_key().enrichment_key().unwrap();
        assert_eq!(key.week, 23);
        assert_eq!(key.year, 2023);
        assert_eq!(key.orchard_code, 4512);
    }

    #[test]
    fn enrichment_key_fails_on_non_numeric_week() {
        let mut record = record_with_key();
        record.insert(fields::WEEK, CellValue::Text("twenty".into()));
        assert!(matches!(
            record.enrichment_key(),
            Err(ReportError::Enrichment { .. })
        ));
    }

    #[test]
    fn enrichment_key_fails_on_missing_year() {
        let mut record = NormalizedRecord::new();
        record.insert(fields::WEEK, CellValue::Text("23".into()));
        record.insert(fields::ORCHARD_CODE, CellValue::Number(4512.0));
        assert!(record.enrichment_key().is_err());
    }

    #[test]
    fn receptions_append_after_existing_fields() {
        let mut record = record_with_key();
        record.set_receptions(120.0, 95.0);

        let names: Vec<&str> = record.field_names().collect();
        assert_eq!(
            &names[names.len() - 2..],
            &[fields::RECEPTION_TOTAL, fields::RECEPTION_ACCEPTED]
        );
        assert_eq!(
            record.get(fields::RECEPTION_ACCEPTED).and_then(CellValue::as_number),
            Some(95.0)
        );
    }
}
