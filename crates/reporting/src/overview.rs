//! Ready-to-render dashboard views built from an already-filtered record
//! set. Pure functions; the caller applies the filter engine first.

use pulse_core::types::{RenewalStatus, TrendGranularity};
use pulse_pipeline::ClassifiedRecord;
use serde::{Deserialize, Serialize};

use crate::aggregate::{
    bucket_counts, category_histogram, churn_retention_trend, status_trend, ChurnTrend,
    StatusTrend,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySlice {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: String,
    pub count: u64,
}

/// Headline metrics and chart inputs for the enrollment dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentOverview {
    pub total_enrollments: u64,
    pub total_revenue: f64,
    pub active_categories: u64,
    pub by_category: Vec<CategorySlice>,
    pub monthly_trend: Vec<TrendPoint>,
}

pub fn enrollment_overview(records: &[ClassifiedRecord]) -> EnrollmentOverview {
    let histogram = category_histogram(records);
    let total_revenue = records.iter().map(|item| item.record.amount_paid).sum();

    EnrollmentOverview {
        total_enrollments: records.len() as u64,
        total_revenue,
        active_categories: histogram.len() as u64,
        by_category: histogram
            .into_iter()
            .map(|(category, count)| CategorySlice { category, count })
            .collect(),
        monthly_trend: bucket_counts(records, TrendGranularity::Monthly)
            .into_iter()
            .map(|(period, count)| TrendPoint { period, count })
            .collect(),
    }
}

/// One row of the renewal table, dates canonicalized to `YYYY-MM-DD`
/// (empty when unparseable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalRow {
    pub student: String,
    pub course: String,
    pub start_date: String,
    pub end_date: String,
    pub amount_paid: f64,
    pub status: RenewalStatus,
}

/// Headline metrics, both trend charts, and table rows for the renewal
/// dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalOverview {
    pub done: u64,
    pub pending: u64,
    pub overdue: u64,
    pub trend: StatusTrend,
    pub churn: ChurnTrend,
    pub rows: Vec<RenewalRow>,
}

pub fn renewal_overview(
    records: &[ClassifiedRecord],
    granularity: TrendGranularity,
) -> RenewalOverview {
    let count = |status: RenewalStatus| {
        records.iter().filter(|item| item.status == status).count() as u64
    };

    let mut rows: Vec<(&ClassifiedRecord, RenewalRow)> = records
        .iter()
        .map(|item| {
            let row = RenewalRow {
                student: item.record.student.clone(),
                course: item.record.category.clone(),
                start_date: iso_or_empty(item.record.start_date),
                end_date: iso_or_empty(item.record.end_date),
                amount_paid: item.record.amount_paid,
                status: item.status,
            };
            (item, row)
        })
        .collect();
    // Ascending by start date; rows without a parseable start date last.
    rows.sort_by_key(|(item, _)| (item.record.start_date.is_none(), item.record.start_date));

    RenewalOverview {
        done: count(RenewalStatus::Done),
        pending: count(RenewalStatus::Pending),
        overdue: count(RenewalStatus::Overdue),
        trend: status_trend(records, granularity),
        churn: churn_retention_trend(records, granularity),
        rows: rows.into_iter().map(|(_, row)| row).collect(),
    }
}

fn iso_or_empty(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pulse_core::types::{RawRecord, SourceKind};
    use pulse_pipeline::{classify_all, normalize_all};

    fn today() -> NaiveDate {
        "2024-06-15".parse().unwrap()
    }

    #[test]
    fn test_enrollment_overview_metrics() {
        let raws = vec![
            RawRecord::new()
                .with("Activity", "Yoga")
                .with("Fees Paid Amount", "1,000")
                .with("Date", "3/15/2024"),
            RawRecord::new()
                .with("Activity", "Karate")
                .with("Fees Paid Amount", "500")
                .with("Date", "3/20/2024"),
        ];
        let records = classify_all(normalize_all(&raws, SourceKind::Enrollment), today());

        let overview = enrollment_overview(&records);
        assert_eq!(overview.total_enrollments, 2);
        assert_eq!(overview.total_revenue, 1500.0);
        assert_eq!(overview.active_categories, 2);
        assert_eq!(overview.monthly_trend.len(), 1);
        assert_eq!(overview.monthly_trend[0].period, "2024-03");
        assert_eq!(overview.monthly_trend[0].count, 2);
    }

    #[test]
    fn test_empty_input_degrades_to_empty_views() {
        let overview = enrollment_overview(&[]);
        assert_eq!(overview.total_enrollments, 0);
        assert_eq!(overview.total_revenue, 0.0);
        assert!(overview.by_category.is_empty());
        assert!(overview.monthly_trend.is_empty());

        let renewal = renewal_overview(&[], TrendGranularity::Daily);
        assert_eq!(renewal.done + renewal.pending + renewal.overdue, 0);
        assert!(renewal.trend.labels.is_empty());
        assert!(renewal.rows.is_empty());
    }

    #[test]
    fn test_renewal_rows_sorted_with_dateless_last() {
        let raws = vec![
            RawRecord::new()
                .with("Student Name", "Beta")
                .with("Start Date", "2024-06-10")
                .with("Fees  Remaining Amount ", "0"),
            RawRecord::new()
                .with("Student Name", "NoDate")
                .with("Fees  Remaining Amount ", "0"),
            RawRecord::new()
                .with("Student Name", "Alpha")
                .with("Start Date", "2024-05-01")
                .with("Fees  Remaining Amount ", "0"),
        ];
        let records = classify_all(normalize_all(&raws, SourceKind::Renewal), today());

        let overview = renewal_overview(&records, TrendGranularity::Daily);
        let students: Vec<&str> = overview.rows.iter().map(|r| r.student.as_str()).collect();
        assert_eq!(students, vec!["Alpha", "Beta", "NoDate"]);
        assert_eq!(overview.rows[2].start_date, "");
    }

    #[test]
    fn test_renewal_status_counts() {
        let raws = vec![
            RawRecord::new()
                .with("Start Date", "2024-06-01")
                .with("Fees  Remaining Amount ", "0"),
            RawRecord::new()
                .with("Start Date", "2024-06-01")
                .with("Fees  Remaining Amount ", "200")
                .with("End Date", "2024-06-14"),
            RawRecord::new()
                .with("Start Date", "2024-06-01")
                .with("Fees  Remaining Amount ", "200")
                .with("End Date", "2024-07-01"),
        ];
        let records = classify_all(normalize_all(&raws, SourceKind::Renewal), today());

        let overview = renewal_overview(&records, TrendGranularity::Daily);
        assert_eq!(overview.done, 1);
        assert_eq!(overview.overdue, 1);
        assert_eq!(overview.pending, 1);
    }
}
