//! Pure aggregation folds over classified records — category histograms
//! and time-series bucketing.

use chrono::{Datelike, NaiveDate, Weekday};
use pulse_core::types::{RenewalStatus, TrendGranularity};
use pulse_pipeline::ClassifiedRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Count of records per category, the `Unknown` sentinel included.
pub fn category_histogram(records: &[ClassifiedRecord]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for item in records {
        *counts.entry(item.record.category.clone()).or_insert(0) += 1;
    }
    counts
}

/// Canonical bucket key for a date: `YYYY-MM-DD` for daily and weekly
/// (a week is keyed by its ISO-week Monday), `YYYY-MM` for monthly.
/// Lexicographic order of keys is chronological order.
pub fn bucket_key(date: NaiveDate, granularity: TrendGranularity) -> String {
    match granularity {
        TrendGranularity::Daily => date.format("%Y-%m-%d").to_string(),
        TrendGranularity::Weekly => {
            let iso = date.iso_week();
            NaiveDate::from_isoywd_opt(iso.year(), iso.week(), Weekday::Mon)
                .unwrap_or(date)
                .format("%Y-%m-%d")
                .to_string()
        }
        TrendGranularity::Monthly => date.format("%Y-%m").to_string(),
    }
}

/// One chart series per status over a shared, sorted label axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTrend {
    pub labels: Vec<String>,
    pub series: Vec<TrendLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendLine {
    pub status: RenewalStatus,
    pub points: Vec<u64>,
}

/// Bucket records by (period, status). Every status series is padded with
/// zeros over the union of observed keys, so all series are equal length
/// and aligned. Records without a parseable primary date are skipped.
pub fn status_trend(records: &[ClassifiedRecord], granularity: TrendGranularity) -> StatusTrend {
    let mut buckets: BTreeMap<String, HashMap<RenewalStatus, u64>> = BTreeMap::new();
    for item in records {
        if let Some(date) = item.record.primary_date {
            let entry = buckets.entry(bucket_key(date, granularity)).or_default();
            *entry.entry(item.status).or_insert(0) += 1;
        }
    }

    let labels: Vec<String> = buckets.keys().cloned().collect();
    let series = RenewalStatus::ALL
        .iter()
        .map(|status| TrendLine {
            status: *status,
            points: buckets
                .values()
                .map(|counts| counts.get(status).copied().unwrap_or(0))
                .collect(),
        })
        .collect();

    StatusTrend { labels, series }
}

/// Churn vs. retention over time: per bucket, Done counts as retention and
/// everything else as churn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnTrend {
    pub labels: Vec<String>,
    pub churn: Vec<u64>,
    pub retention: Vec<u64>,
}

pub fn churn_retention_trend(
    records: &[ClassifiedRecord],
    granularity: TrendGranularity,
) -> ChurnTrend {
    let mut buckets: BTreeMap<String, (u64, u64)> = BTreeMap::new();
    for item in records {
        if let Some(date) = item.record.primary_date {
            let entry = buckets.entry(bucket_key(date, granularity)).or_default();
            match item.status {
                RenewalStatus::Done => entry.1 += 1,
                _ => entry.0 += 1,
            }
        }
    }

    ChurnTrend {
        labels: buckets.keys().cloned().collect(),
        churn: buckets.values().map(|(churn, _)| *churn).collect(),
        retention: buckets.values().map(|(_, retention)| *retention).collect(),
    }
}

/// Record count per period bucket, ascending by period.
pub fn bucket_counts(
    records: &[ClassifiedRecord],
    granularity: TrendGranularity,
) -> Vec<(String, u64)> {
    let mut buckets: BTreeMap<String, u64> = BTreeMap::new();
    for item in records {
        if let Some(date) = item.record.primary_date {
            *buckets.entry(bucket_key(date, granularity)).or_insert(0) += 1;
        }
    }
    buckets.into_iter().collect()
}

/// Summed paid amounts per period bucket, ascending by period.
pub fn bucket_amounts(
    records: &[ClassifiedRecord],
    granularity: TrendGranularity,
) -> Vec<(String, f64)> {
    let mut buckets: BTreeMap<String, f64> = BTreeMap::new();
    for item in records {
        if let Some(date) = item.record.primary_date {
            *buckets.entry(bucket_key(date, granularity)).or_insert(0.0) +=
                item.record.amount_paid;
        }
    }
    buckets.into_iter().collect()
}
