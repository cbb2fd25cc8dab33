//! Pure narrowing pass over classified records.
//!
//! The presentation layer owns filter-state transitions; this module only
//! consumes immutable [`FilterState`] snapshots. All time-relative windows
//! resolve against an injected `today` — the system clock is never read
//! here.

use chrono::{Datelike, Duration, NaiveDate};
use pulse_core::types::RenewalStatus;
use serde::{Deserialize, Serialize};

use crate::classify::ClassifiedRecord;

/// User-selected predicates, combined with AND semantics. `None` on a
/// dimension means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub status: Option<RenewalStatus>,
    pub category: Option<String>,
    #[serde(default)]
    pub range: DateRange,
}

/// Date-range predicate over a record's primary date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    #[default]
    All,
    Today,
    Yesterday,
    LastDays(u32),
    ThisMonth,
    LastMonth,
    /// Explicit inclusive range; an unset bound is unconstrained.
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl DateRange {
    /// Inclusive day bounds relative to `today`. `None` on a side means
    /// unconstrained.
    fn bounds(&self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match self {
            DateRange::All => (None, None),
            DateRange::Today => (Some(today), Some(today)),
            DateRange::Yesterday => {
                let day = today - Duration::days(1);
                (Some(day), Some(day))
            }
            DateRange::LastDays(n) => (Some(today - Duration::days(*n as i64)), Some(today)),
            DateRange::ThisMonth => (Some(first_of_month(today)), Some(today)),
            DateRange::LastMonth => {
                let last = first_of_month(today) - Duration::days(1);
                (Some(first_of_month(last)), Some(last))
            }
            DateRange::Custom { start, end } => (*start, *end),
        }
    }

    /// Whether a record date passes this range. A record with no parseable
    /// date fails every range except `All`.
    pub fn contains(&self, date: Option<NaiveDate>, today: NaiveDate) -> bool {
        if matches!(self, DateRange::All) {
            return true;
        }
        let Some(date) = date else {
            return false;
        };
        let (lo, hi) = self.bounds(today);
        lo.map_or(true, |lo| date >= lo) && hi.map_or(true, |hi| date <= hi)
    }
}

impl FilterState {
    pub fn matches(&self, item: &ClassifiedRecord, today: NaiveDate) -> bool {
        self.status.map_or(true, |status| item.status == status)
            && self
                .category
                .as_deref()
                .map_or(true, |category| item.record.category == category)
            && self.range.contains(item.record.primary_date, today)
    }
}

/// Apply the filter as a pure narrowing pass. Input is never mutated; the
/// output is a fresh subset in input order.
pub fn apply(
    records: &[ClassifiedRecord],
    filter: &FilterState,
    today: NaiveDate,
) -> Vec<ClassifiedRecord> {
    records
        .iter()
        .filter(|item| filter.matches(item, today))
        .cloned()
        .collect()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
