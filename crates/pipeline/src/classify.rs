//! Lifecycle classification for renewal records.

use chrono::NaiveDate;
use pulse_core::types::RenewalStatus;
use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedRecord;

/// A normalized record plus its derived lifecycle status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub record: NormalizedRecord,
    pub status: RenewalStatus,
}

/// Status is a pure function of (remaining balance, end date, `today`).
///
/// A settled balance is Done no matter what the dates say. An open balance
/// is Overdue only once the end date is strictly in the past — an end date
/// equal to `today` is still Pending, as is a missing or unparseable one.
pub fn classify(record: &NormalizedRecord, today: NaiveDate) -> RenewalStatus {
    if record.amount_remaining <= 0.0 {
        return RenewalStatus::Done;
    }
    match record.end_date {
        Some(end) if end < today => RenewalStatus::Overdue,
        _ => RenewalStatus::Pending,
    }
}

pub fn classify_all(records: Vec<NormalizedRecord>, today: NaiveDate) -> Vec<ClassifiedRecord> {
    records
        .into_iter()
        .map(|record| {
            let status = classify(&record, today);
            ClassifiedRecord { record, status }
        })
        .collect()
}
