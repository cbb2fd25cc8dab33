//! Per-customer lifetime value accumulated across both record sources.
//!
//! There is no real customer id upstream; the student display name is the
//! identity key. Both sources run through the same per-item fold, so the
//! result is independent of source interleaving order.

use chrono::NaiveDate;
use pulse_core::types::SourceKind;
use pulse_pipeline::{DateRange, NormalizedRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifetime value of one customer across enrollments and renewals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerValue {
    pub student: String,
    pub total_paid: f64,
    /// Distinct courses the customer has paid into, sorted.
    pub courses: Vec<String>,
    pub by_course: BTreeMap<String, f64>,
    /// Earliest parseable engagement date across both sources; absent when
    /// no record for this customer carries one.
    pub first_engaged: Option<NaiveDate>,
    /// Which source contributed that earliest date.
    pub first_engaged_source: Option<SourceKind>,
}

#[derive(Default)]
struct CustomerFold {
    total: f64,
    by_course: BTreeMap<String, f64>,
    engagement_dates: Vec<(NaiveDate, SourceKind)>,
}

/// Fold both sources into per-customer totals. Rows come back sorted by
/// student name so repeated derivations render identically.
pub fn accumulate(
    enrollments: &[NormalizedRecord],
    renewals: &[NormalizedRecord],
) -> Vec<CustomerValue> {
    let mut folds: BTreeMap<String, CustomerFold> = BTreeMap::new();

    for record in enrollments.iter().chain(renewals.iter()) {
        let fold = folds.entry(record.student.clone()).or_default();
        fold.total += record.amount_paid;
        *fold.by_course.entry(record.category.clone()).or_insert(0.0) += record.amount_paid;
        if let Some(date) = record.start_date {
            fold.engagement_dates.push((date, record.source));
        }
    }

    folds
        .into_iter()
        .map(|(student, fold)| {
            let earliest = fold
                .engagement_dates
                .iter()
                .min_by_key(|(date, _)| *date)
                .copied();
            CustomerValue {
                student,
                total_paid: fold.total,
                courses: fold.by_course.keys().cloned().collect(),
                by_course: fold.by_course,
                first_engaged: earliest.map(|(date, _)| date),
                first_engaged_source: earliest.map(|(_, source)| source),
            }
        })
        .collect()
}

/// Narrow LTV rows by course membership and engagement-date range.
///
/// Course membership is set membership: a row matches a course filter if
/// that course appears anywhere in its per-course totals, regardless of
/// amount. The date range applies to the earliest engagement date with the
/// filter engine's policy — customers without one pass only `All`.
pub fn filter_customers(
    rows: &[CustomerValue],
    course: Option<&str>,
    range: &DateRange,
    today: NaiveDate,
) -> Vec<CustomerValue> {
    rows.iter()
        .filter(|row| {
            course.map_or(true, |course| row.by_course.contains_key(course))
                && range.contains(row.first_engaged, today)
        })
        .cloned()
        .collect()
}
