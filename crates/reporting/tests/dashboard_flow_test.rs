//! Integration test for the full raw-records → dashboard-views flow.

use chrono::NaiveDate;
use pulse_core::types::{RawRecord, RenewalStatus, SourceKind, TrendGranularity};
use pulse_pipeline::{apply, classify_all, normalize_all, DateRange, FilterState};
use pulse_reporting::{
    accumulate, enrollment_overview, filter_customers, renewal_overview,
};

fn today() -> NaiveDate {
    "2024-06-15".parse().unwrap()
}

/// Rows shaped like the upstream enrollment sheet export, messy fields
/// included.
fn enrollment_rows() -> Vec<RawRecord> {
    vec![
        RawRecord::new()
            .with("Student Name", "Avery Lee")
            .with("Activity", "Yoga")
            .with("Fees Paid Amount", "1,000")
            .with("Date", "3/15/2024")
            .with("Start Date", "3/15/2024"),
        RawRecord::new()
            .with("Student Name", "Blake Ray")
            .with("Activity", "Yoga")
            .with("Fees Paid Amount", "500")
            .with("Date", "04/02/2024")
            .with("Start Date", "04/02/2024"),
        RawRecord::new()
            .with("Student Name", "Casey Fox")
            .with("Activity", "Karate")
            .with("Fees Paid Amount", "not recorded")
            .with("Date", "when we met"),
    ]
}

fn renewal_rows() -> Vec<RawRecord> {
    vec![
        RawRecord::new()
            .with("Student Name", "Avery Lee")
            .with("Activity", "Yoga")
            .with("Fees Paid Amount", "750")
            .with("Fees  Remaining Amount ", "0")
            .with("Start Date", "05-Jun-24")
            .with("End Date", "05-Sep-24"),
        RawRecord::new()
            .with("Student Name", "Blake Ray")
            .with("Activity", "Yoga")
            .with("Fees Paid Amount", "0")
            .with("Fees  Remaining Amount ", "200")
            .with("Start Date", "2024-06-01")
            .with("End Date", "6/14/2024"),
        RawRecord::new()
            .with("Student Name", "Casey Fox")
            .with("Activity", "Karate")
            .with("Fees Paid Amount", "300")
            .with("Fees  Remaining Amount ", "150")
            .with("Start Date", "2024-06-10")
            .with("End Date", "NA"),
    ]
}

#[test]
fn test_enrollment_dashboard_flow() {
    let records = classify_all(
        normalize_all(&enrollment_rows(), SourceKind::Enrollment),
        today(),
    );
    let filtered = apply(&records, &FilterState::default(), today());
    let overview = enrollment_overview(&filtered);

    assert_eq!(overview.total_enrollments, 3);
    // The unparseable amount folds to zero rather than poisoning the sum.
    assert_eq!(overview.total_revenue, 1500.0);
    assert_eq!(overview.active_categories, 2);

    let monthly: Vec<(&str, u64)> = overview
        .monthly_trend
        .iter()
        .map(|p| (p.period.as_str(), p.count))
        .collect();
    assert_eq!(monthly, vec![("2024-03", 1), ("2024-04", 1)]);

    let yoga = overview
        .by_category
        .iter()
        .find(|slice| slice.category == "Yoga")
        .expect("yoga slice");
    assert_eq!(yoga.count, 2);
}

#[test]
fn test_renewal_dashboard_flow() {
    let records = classify_all(
        normalize_all(&renewal_rows(), SourceKind::Renewal),
        today(),
    );
    let overview = renewal_overview(&records, TrendGranularity::Daily);

    // Settled balance is Done whatever the end date; an open balance due
    // one day before `today` is Overdue; an open balance with an NA end
    // date stays Pending.
    assert_eq!(overview.done, 1);
    assert_eq!(overview.overdue, 1);
    assert_eq!(overview.pending, 1);

    assert_eq!(overview.rows[0].student, "Blake Ray");
    assert_eq!(overview.rows[0].end_date, "2024-06-14");
    assert_eq!(overview.rows[0].status, RenewalStatus::Overdue);
    assert_eq!(overview.rows[2].student, "Casey Fox");
    assert_eq!(overview.rows[2].end_date, "");
}

#[test]
fn test_filtered_aggregates_match_predicate_restriction() {
    let records = classify_all(
        normalize_all(&renewal_rows(), SourceKind::Renewal),
        today(),
    );

    let filter = FilterState {
        category: Some("Yoga".to_string()),
        status: Some(RenewalStatus::Done),
        range: DateRange::All,
    };
    let filtered = apply(&records, &filter, today());
    let overview = renewal_overview(&filtered, TrendGranularity::Daily);

    let expected = records
        .iter()
        .filter(|item| {
            item.record.category == "Yoga" && item.status == RenewalStatus::Done
        })
        .count() as u64;
    assert_eq!(overview.done, expected);
    assert_eq!(overview.pending, 0);
    assert_eq!(overview.overdue, 0);
    assert_eq!(overview.rows.len(), expected as usize);
}

#[test]
fn test_ltv_flow_joins_both_sources() {
    let enrollments = normalize_all(&enrollment_rows(), SourceKind::Enrollment);
    let renewals = normalize_all(&renewal_rows(), SourceKind::Renewal);

    let rows = accumulate(&enrollments, &renewals);
    assert_eq!(rows.len(), 3);

    let avery = rows
        .iter()
        .find(|row| row.student == "Avery Lee")
        .expect("avery row");
    assert_eq!(avery.total_paid, 1750.0);
    assert_eq!(avery.courses, vec!["Yoga"]);
    assert_eq!(avery.first_engaged, Some("2024-03-15".parse().unwrap()));

    // Casey's enrollment date never parsed, but the renewal start did.
    let casey = rows
        .iter()
        .find(|row| row.student == "Casey Fox")
        .expect("casey row");
    assert_eq!(casey.first_engaged, Some("2024-06-10".parse().unwrap()));

    let june = filter_customers(
        &rows,
        None,
        &DateRange::Custom {
            start: Some("2024-06-01".parse().unwrap()),
            end: None,
        },
        today(),
    );
    // Only customers first engaged in June remain.
    assert_eq!(june.len(), 1);
    assert_eq!(june[0].student, "Casey Fox");
}
