//! Record normalization — multi-format date parsing, tolerant amount
//! parsing, and category/student canonicalization.
//!
//! Every component that needs a date goes through [`parse_date`]; there is
//! exactly one format list and one "unparseable" representation (absence).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use pulse_core::types::{fields, RawRecord, SourceKind, UNKNOWN};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Formats carrying a time-of-day component, tried first.
const DATETIME_FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S"];

/// Date-only formats, in the order the upstream sheets use them.
const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%d-%b-%y", "%Y-%m-%d"];

/// A raw record with its fields of interest parsed into canonical typed
/// values. Normalization is total: worst case a field is absent or zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub source: SourceKind,
    pub category: String,
    pub student: String,
    pub amount_paid: f64,
    pub amount_remaining: f64,
    /// Date used for range filters and time buckets. Absent when no listed
    /// alias parses — never defaulted to "now" or an epoch.
    pub primary_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub raw: RawRecord,
}

/// Parse a date string against the ordered format list. The first pattern
/// that matches and yields a calendar-valid date wins; the literal `NA`
/// marker the sheets use for open-ended rows is unparseable.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    // Generic fallback for anything already machine-formatted.
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Tolerant monetary parsing: strips thousands separators and whitespace,
/// then parses as a decimal number. Unparseable or missing input folds to
/// zero so downstream sums never propagate absence.
pub fn parse_amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let cleaned: String = s
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

/// Normalize a single raw record. The primary date is source-dependent:
/// enrollments are bucketed by when they were recorded, renewals by their
/// start date.
pub fn normalize(raw: &RawRecord, source: SourceKind) -> NormalizedRecord {
    let start_date = date_field(raw, fields::START_DATE);
    let primary_date = match source {
        SourceKind::Enrollment => date_field(raw, fields::ENROLLED_AT),
        SourceKind::Renewal => start_date,
    };

    NormalizedRecord {
        source,
        category: raw
            .text(fields::ACTIVITY)
            .unwrap_or_else(|| UNKNOWN.to_string()),
        student: raw
            .text(fields::STUDENT_NAME)
            .unwrap_or_else(|| UNKNOWN.to_string()),
        amount_paid: parse_amount(raw.first(fields::AMOUNT_PAID)),
        amount_remaining: parse_amount(raw.first(fields::AMOUNT_REMAINING)),
        primary_date,
        start_date,
        end_date: date_field(raw, fields::END_DATE),
        raw: raw.clone(),
    }
}

pub fn normalize_all(raws: &[RawRecord], source: SourceKind) -> Vec<NormalizedRecord> {
    raws.iter().map(|raw| normalize(raw, source)).collect()
}

fn date_field(raw: &RawRecord, aliases: &[&str]) -> Option<NaiveDate> {
    raw.text(aliases).and_then(|s| parse_date(&s))
}
