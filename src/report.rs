//! Report grouping and emission: partitions the enriched record set by
//! producer name and writes one sheet per partition, header row first.

use indexmap::IndexMap;
use rust_xlsxwriter::Workbook;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::constants::SHEET_NAME_LIMIT;
use crate::error::Result;
use crate::record::{CellValue, NormalizedRecord};

/// One sheet's worth of rows, in first-seen record order.
#[derive(Debug, Clone)]
pub struct ReportSection {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// The assembled multi-section document, ready for the workbook writer.
#[derive(Debug, Clone, Default)]
pub struct ReportDocument {
    pub sections: Vec<ReportSection>,
}

impl ReportDocument {
    /// Partitions records by producer name. Both the partitions and the
    /// records within each partition keep their first-seen order. Sheet
    /// names are truncated to the workbook limit; truncation collisions
    /// get a numeric `~N` suffix within the same budget.
    pub fn from_records(records: &[NormalizedRecord]) -> Self {
        let mut groups: IndexMap<&str, Vec<&NormalizedRecord>> = IndexMap::new();
        for record in records {
            let producer = record.producer_name().unwrap_or_default();
            groups.entry(producer).or_default().push(record);
        }

        let mut used_names = HashSet::new();
        let sections = groups
            .into_iter()
            .map(|(producer, members)| {
                let name = unique_sheet_name(producer, &used_names);
                used_names.insert(name.clone());

                // Headers come from the first record of the partition
                let headers: Vec<String> = members[0]
                    .field_names()
                    .map(str::to_string)
                    .collect();
                let rows = members
                    .iter()
                    .map(|record| record.cell_values().cloned().collect())
                    .collect();

                ReportSection { name, headers, rows }
            })
            .collect();

        Self { sections }
    }
}

/// Writes the document as a multi-sheet workbook at `path`.
pub fn write_workbook(document: &ReportDocument, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();

    // The format requires at least one sheet, even for an empty run
    if document.sections.is_empty() {
        workbook.add_worksheet();
    }

    for section in &document.sections {
        let sheet = workbook.add_worksheet();
        sheet.set_name(&section.name)?;

        for (col, header) in section.headers.iter().enumerate() {
            sheet.write_string(0, col as u16, header)?;
        }

        for (row_index, row) in section.rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                let row_number = row_index as u32 + 1;
                match value {
                    CellValue::Text(text) => {
                        sheet.write_string(row_number, col as u16, text)?;
                    }
                    CellValue::Number(number) => {
                        sheet.write_number(row_number, col as u16, *number)?;
                    }
                    CellValue::Empty => {}
                }
            }
        }

        debug!(
            "Wrote sheet '{}' with {} data rows",
            section.name,
            section.rows.len()
        );
    }

    workbook.save(path)?;
    Ok(())
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

fn unique_sheet_name(producer: &str, used: &HashSet<String>) -> String {
    let base = truncate_chars(producer, SHEET_NAME_LIMIT);
    if !used.contains(&base) {
        return base;
    }

    let mut n = 2;
    loop {
        let suffix = format!("~{n}");
        let budget = SHEET_NAME_LIMIT - suffix.chars().count();
        let candidate = format!("{}{}", truncate_chars(producer, budget), suffix);
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::fields;

    fn record_for(producer: &str, week: &str) -> NormalizedRecord {
        let mut record = NormalizedRecord::new();
        record.insert(fields::PRODUCER_NAME, CellValue::Text(producer.into()));
        record.insert(fields::WEEK, CellValue::Text(week.into()));
        record.set_receptions(10.0, 8.0);
        record
    }

    #[test]
    fn partitions_preserve_first_seen_order() {
        let records = vec![
            record_for("B", "1"),
            record_for("A", "2"),
            record_for("B", "3"),
            record_for("A", "4"),
        ];

        let document = ReportDocument::from_records(&records);
        let names: Vec<&str> = document.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);

        let weeks: Vec<&CellValue> = document.sections[0]
            .rows
            .iter()
            .map(|row| &row[1])
            .collect();
        assert_eq!(
            weeks,
            vec![&CellValue::Text("1".into()), &CellValue::Text("3".into())]
        );
    }

    #[test]
    fn headers_follow_the_first_record_of_the_partition() {
        let document = ReportDocument::from_records(&[record_for("A", "1")]);
        assert_eq!(
            document.sections[0].headers,
            vec![
                fields::PRODUCER_NAME,
                fields::WEEK,
                fields::RECEPTION_TOTAL,
                fields::RECEPTION_ACCEPTED,
            ]
        );
    }

    #[test]
    fn long_sheet_names_are_truncated() {
        let long = "PRODUCTORA_AGRICOLA_DE_MICHOACAN_SA_DE_CV";
        let document = ReportDocument::from_records(&[record_for(long, "1")]);
        assert_eq!(document.sections[0].name.chars().count(), SHEET_NAME_LIMIT);
        assert!(long.starts_with(&document.sections[0].name));
    }

    #[test]
    fn truncation_collisions_get_numeric_suffixes() {
        let a = "PRODUCTORA_AGRICOLA_DE_MICHOACAN_NORTE";
        let b = "PRODUCTORA_AGRICOLA_DE_MICHOACAN_SUR";
        let document = ReportDocument::from_records(&[record_for(a, "1"), record_for(b, "2")]);

        let names: Vec<&str> = document.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names[0], "PRODUCTORA_AGRICOLA_DE_MICHOACA");
        assert_eq!(names[1], "PRODUCTORA_AGRICOLA_DE_MICHOA~2");
        assert!(names[1].chars().count() <= SHEET_NAME_LIMIT);
    }

    #[test]
    fn workbook_is_written_with_one_sheet_per_partition() {
        let records = vec![record_for("A", "1"), record_for("B", "2")];
        let document = ReportDocument::from_records(&records);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        write_workbook(&document, &path).unwrap();

        assert!(path.exists());
        assert!(path.metadata().unwrap().len() > 0);
    }

    #[test]
    fn empty_document_still_produces_a_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        write_workbook(&ReportDocument::default(), &path).unwrap();
        assert!(path.exists());
    }
}
