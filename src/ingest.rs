//! Source export reading and per-row validation. Rows that are missing a
//! required field, or whose required field fails its transform, are
//! dropped without an error entry; only the drop count survives.

use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::constants::fields;
use crate::error::Result;
use crate::record::{CellValue, NormalizedRecord};
use crate::schema::{FieldKind, FieldRule};
use crate::transform;

/// Outcome of reading and validating the whole source export.
#[derive(Debug, Default)]
pub struct IngestResult {
    pub records: Vec<NormalizedRecord>,
    pub total_rows: usize,
    pub dropped_rows: usize,
}

/// Reads the delimited export at `path` and builds one normalized record
/// per valid row, in file order.
pub fn read_source(path: &Path, schema: &[FieldRule]) -> Result<IngestResult> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut result = IngestResult::default();
    for row in reader.records() {
        let row = row?;
        result.total_rows += 1;

        let raw: HashMap<&str, &str> = headers.iter().zip(row.iter()).collect();
        match build_record(&raw, schema) {
            Some(record) => result.records.push(record),
            None => {
                result.dropped_rows += 1;
                debug!("Dropped row {} of the source export", result.total_rows);
            }
        }
    }

    Ok(result)
}

/// Applies the schema to one raw row. Returns `None` when a required
/// field is absent, empty, or fails its transform.
pub fn build_record(raw: &HashMap<&str, &str>, schema: &[FieldRule]) -> Option<NormalizedRecord> {
    let mut record = NormalizedRecord::new();

    for rule in schema {
        let raw_value = raw.get(rule.name).copied().filter(|v| !v.is_empty());

        match raw_value {
            Some(value) => {
                if let Err(e) = apply_rule(rule, value, &mut record) {
                    debug!("Field '{}' failed its transform: {}", rule.name, e);
                    return None;
                }
            }
            None if rule.required => return None,
            None => {}
        }
    }

    Some(record)
}

fn apply_rule(rule: &FieldRule, raw: &str, record: &mut NormalizedRecord) -> Result<()> {
    match rule.kind {
        FieldKind::Passthrough => {
            record.insert(rule.name, CellValue::Text(raw.to_string()));
        }
        FieldKind::TextNormalize {
            replace_spaces,
            replace_dots,
        } => {
            record.insert(
                rule.name,
                CellValue::Text(transform::normalize_text(raw, replace_spaces, replace_dots)),
            );
        }
        FieldKind::Decimal => {
            let value = match transform::parse_decimal(raw) {
                Some(number) => CellValue::Number(number),
                None => CellValue::Empty,
            };
            record.insert(rule.name, value);
        }
        FieldKind::Date => {
            record.insert(rule.name, CellValue::Text(transform::reformat_date(raw)?));
        }
        FieldKind::MonthYearToken => {
            let month_year = transform::split_month_year(raw)?;
            record.insert(rule.name, CellValue::Number(month_year.month as f64));
            record.insert(fields::YEAR, CellValue::Number(month_year.year as f64));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::projection_schema;
    use std::io::Write;

    fn full_row<'a>() -> HashMap<&'a str, &'a str> {
        HashMap::from([
            ("Temporada", "2023"),
            ("Fruta", "Aguacate"),
            ("Centro_acopio", "Uruapan"),
            ("Estado", "Michoacán"),
            ("PR_Productor", "PR-104"),
            ("Nombre_Productor", "Rancho El Sol."),
            ("Nombre_Huerto", "La Loma"),
            ("Codigo_Huerto", "4512"),
            ("Hectareas", "12,5"),
            ("Mes", "jun-23"),
            ("Semana", "23"),
            ("Cajas_proyectadas", "1500,5"),
            ("Variedad", "Hass"),
            ("Fecha_Update", "5/6/2023"),
        ])
    }

    #[test]
    fn builds_a_fully_typed_record() {
        let record = build_record(&full_row(), projection_schema()).unwrap();

        assert_eq!(record.producer_name(), Some("RANCHO_EL_SOL"));
        assert_eq!(
            record.get("Fecha_Update").and_then(CellValue::as_text),
            Some("2023-06-05")
        );
        assert_eq!(record.get("Mes").and_then(CellValue::as_number), Some(6.0));
        assert_eq!(
            record.get("Anio").and_then(CellValue::as_number),
            Some(2023.0)
        );
        assert_eq!(
            record.get("Hectareas").and_then(CellValue::as_number),
            Some(12.5)
        );
    }

    #[test]
    fn missing_required_field_drops_the_row() {
        let mut row = full_row();
        row.remove("Nombre_Productor");
        assert!(build_record(&row, projection_schema()).is_none());
    }

    #[test]
    fn empty_required_field_drops_the_row() {
        let mut row = full_row();
        row.insert("Semana", "");
        assert!(build_record(&row, projection_schema()).is_none());
    }

    #[test]
    fn failed_transform_drops_the_row() {
        let mut row = full_row();
        row.insert("Mes", "junio 2023");
        assert!(build_record(&row, projection_schema()).is_none());
    }

    #[test]
    fn unparsable_decimal_keeps_the_row_with_an_empty_cell() {
        let mut row = full_row();
        row.insert("Hectareas", "n/a");
        let record = build_record(&row, projection_schema()).unwrap();
        assert_eq!(record.get("Hectareas"), Some(&CellValue::Empty));
    }

    #[test]
    fn read_source_drops_invalid_rows_without_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "Temporada,Fruta,Centro_acopio,Estado,PR_Productor,Nombre_Productor,Nombre_Huerto,Codigo_Huerto,Hectareas,Mes,Semana,Cajas_proyectadas,Variedad,Fecha_Update"
        )
        .unwrap();
        writeln!(
            file,
            "2023,Aguacate,Uruapan,Michoacán,PR-104,Rancho El Sol,La Loma,4512,12.5,jun-23,23,1500,Hass,5/6/2023"
        )
        .unwrap();
        // Missing producer name
        writeln!(
            file,
            "2023,Aguacate,Uruapan,Michoacán,PR-104,,La Loma,4512,12.5,jun-23,23,1500,Hass,5/6/2023"
        )
        .unwrap();
        writeln!(
            file,
            "2023,Aguacate,Uruapan,Michoacán,PR-105,Los Pinos,El Cerro,4513,8,jun-23,24,900,Hass,6/6/2023"
        )
        .unwrap();

        let result = read_source(file.path(), projection_schema()).unwrap();
        assert_eq!(result.total_rows, 3);
        assert_eq!(result.dropped_rows, 1);
        assert_eq!(result.records.len(), 2);
    }
}
