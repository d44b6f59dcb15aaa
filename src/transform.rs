//! Pure per-field transformers. Each takes one raw cell string and either
//! produces a typed value or fails with a format error; nothing in here
//! touches the record or the schema.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

use crate::error::{ReportError, Result};

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// Longest numeric prefix, including an optional exponent. Mirrors the
// lenient float parsing of the upstream export tooling: "1.234.56"
// yields 1.234, not a parse failure.
static NUMERIC_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").unwrap());

static SPANISH_MONTHS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("ene", 1),
        ("feb", 2),
        ("mar", 3),
        ("abr", 4),
        ("may", 5),
        ("jun", 6),
        ("jul", 7),
        ("ago", 8),
        ("sep", 9),
        ("oct", 10),
        ("nov", 11),
        ("dic", 12),
    ])
});

/// Month and year split out of a combined `mon-yy` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthYear {
    pub month: u32,
    pub year: i32,
}

/// Normalizes free text for report output: decompose, optionally strip
/// dots/commas, uppercase, optionally collapse whitespace runs into a
/// single underscore, then drop combining marks and stray newlines.
///
/// The stage order is load-bearing: whitespace collapsing must run after
/// uppercasing, and mark stripping runs last over the decomposed form.
pub fn normalize_text(text: &str, replace_spaces: bool, replace_dots: bool) -> String {
    let mut result: String = text.nfd().collect();

    if replace_dots {
        result.retain(|c| c != '.' && c != ',');
    }

    result = result.to_uppercase();

    if replace_spaces {
        result = WHITESPACE_RUN.replace_all(&result, "_").into_owned();
    }

    result
        .chars()
        .filter(|c| !matches!(c, '\u{0300}'..='\u{036f}' | '\n' | '\r'))
        .collect()
}

/// Reformats `dd/mm/yyyy` into `yyyy-mm-dd`, zero-padding day and month.
/// Input already in `yyyy-mm-dd` form passes through unchanged.
pub fn reformat_date(input: &str) -> Result<String> {
    if ISO_DATE.is_match(input) {
        return Ok(input.to_string());
    }

    let parts: Vec<&str> = input.split('/').collect();
    if parts.len() != 3 {
        return Err(ReportError::InvalidDateFormat(format!(
            "expected dd/mm/yyyy, got '{input}'"
        )));
    }

    let (day, month, year) = (parts[0], parts[1], parts[2]);
    Ok(format!("{year}-{month:0>2}-{day:0>2}"))
}

/// Parses a comma-decimal value as a float. Returns `None` for anything
/// without a usable numeric prefix; callers map that to an empty cell
/// rather than a failure.
pub fn parse_decimal(value: &str) -> Option<f64> {
    let sanitized = value.replacen(',', ".", 1);
    let parsed: f64 = NUMERIC_PREFIX
        .find(sanitized.trim_start())?
        .as_str()
        .parse()
        .ok()?;

    parsed.is_finite().then_some(parsed)
}

/// Splits a combined `mon-yy` token (e.g. `jun-23`) into its month number
/// and four-digit year. The month must be one of the twelve Spanish
/// three-letter abbreviations and the year exactly two digits.
pub fn split_month_year(input: &str) -> Result<MonthYear> {
    let lowered = input.to_lowercase();
    let mut tokens = lowered.split('-');
    let month_token = tokens.next().unwrap_or_default();
    let year_token = tokens.next().unwrap_or_default();

    let month = SPANISH_MONTHS
        .get(month_token)
        .copied()
        .ok_or_else(|| {
            ReportError::InvalidDateFormat(format!("unknown month token '{month_token}'"))
        })?;

    if year_token.len() != 2 || !year_token.chars().all(|c| c.is_ascii_digit()) {
        return Err(ReportError::InvalidDateFormat(format!(
            "expected a two-digit year, got '{year_token}'"
        )));
    }

    let year: i32 = year_token.parse().map_err(|_| {
        ReportError::InvalidDateFormat(format!("expected a two-digit year, got '{year_token}'"))
    })?;

    Ok(MonthYear {
        month,
        year: 2000 + year,
    })
}
