use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Sentinel substituted for a missing activity or student name.
pub const UNKNOWN: &str = "Unknown";

/// Header aliases for the columns we read from the upstream sheets.
/// Lookup is ordered: the first alias with a non-blank value wins.
pub mod fields {
    /// Course/activity column, e.g. "Yoga".
    pub const ACTIVITY: &[&str] = &["Activity", "activity", "Course"];
    pub const STUDENT_NAME: &[&str] = &["Student Name", "Name"];
    pub const AMOUNT_PAID: &[&str] = &["Fees Paid Amount", "Amount Paid"];
    /// The live sheet header carries a double space and a trailing space.
    pub const AMOUNT_REMAINING: &[&str] =
        &["Fees  Remaining Amount ", "Fees Remaining Amount"];
    /// When an enrollment row was recorded.
    pub const ENROLLED_AT: &[&str] = &["Timestamp", "Date", "timestamp"];
    pub const START_DATE: &[&str] = &["Start Date"];
    pub const END_DATE: &[&str] = &["End Date", "Due Date"];
}

/// A single row fetched from an upstream endpoint: sheet headers mapped to
/// untyped scalars. Immutable once fetched; all typing happens downstream
/// in the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    pub fields: HashMap<String, Value>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter, mainly for tests and fixtures.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// First non-blank value among the given header aliases.
    pub fn first(&self, aliases: &[&str]) -> Option<&Value> {
        aliases
            .iter()
            .filter_map(|name| self.fields.get(*name))
            .find(|v| !is_blank(v))
    }

    /// Trimmed string form of the first non-blank alias value, if any.
    pub fn text(&self, aliases: &[&str]) -> Option<String> {
        match self.first(aliases)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Which upstream endpoint a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Enrollment,
    Renewal,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Enrollment => write!(f, "enrollment"),
            SourceKind::Renewal => write!(f, "renewal"),
        }
    }
}

/// Lifecycle status of a renewal, recomputed from the remaining balance and
/// end date on every derivation — never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalStatus {
    Done,
    Pending,
    Overdue,
}

impl RenewalStatus {
    pub const ALL: [RenewalStatus; 3] = [
        RenewalStatus::Done,
        RenewalStatus::Pending,
        RenewalStatus::Overdue,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RenewalStatus::Done => "Done",
            RenewalStatus::Pending => "Pending",
            RenewalStatus::Overdue => "Overdue",
        }
    }
}

impl fmt::Display for RenewalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RenewalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "done" => Ok(RenewalStatus::Done),
            "pending" => Ok(RenewalStatus::Pending),
            "overdue" => Ok(RenewalStatus::Overdue),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// Granularity of a time-series bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendGranularity {
    Daily,
    Weekly,
    Monthly,
}

impl FromStr for TrendGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(TrendGranularity::Daily),
            "weekly" => Ok(TrendGranularity::Weekly),
            "monthly" => Ok(TrendGranularity::Monthly),
            other => Err(format!("unknown granularity: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alias_lookup_skips_blank_values() {
        let record = RawRecord::new()
            .with("Timestamp", "")
            .with("Date", "3/15/2024");

        assert_eq!(
            record.text(fields::ENROLLED_AT).as_deref(),
            Some("3/15/2024")
        );
    }

    #[test]
    fn test_text_renders_numbers() {
        let record = RawRecord::new().with("Fees Paid Amount", json!(1500));
        assert_eq!(record.text(fields::AMOUNT_PAID).as_deref(), Some("1500"));
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!("overdue".parse::<RenewalStatus>(), Ok(RenewalStatus::Overdue));
        assert_eq!(RenewalStatus::Overdue.label(), "Overdue");
        assert!("expired".parse::<RenewalStatus>().is_err());
    }
}
