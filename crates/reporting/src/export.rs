//! Spreadsheet-compatible export of already-filtered view rows.
//!
//! The export surface accepts a flat sequence of column→value mappings and
//! performs no transformation of its own; filtering and derivation happen
//! upstream.

use std::collections::HashMap;

/// Render rows as CSV in the given column order. String cells are quoted
/// with doubled-quote escaping; missing cells render empty.
pub fn export_csv(columns: &[&str], rows: &[HashMap<String, serde_json::Value>]) -> String {
    let mut csv = columns.join(",");
    csv.push('\n');
    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|col| match row.get(*col) {
                Some(serde_json::Value::String(s)) => {
                    format!("\"{}\"", s.replace('"', "\"\""))
                }
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        csv.push_str(&cells.join(","));
        csv.push('\n');
    }
    csv
}

/// JSON counterpart of [`export_csv`], one object per row.
pub fn export_json(rows: &[HashMap<String, serde_json::Value>]) -> String {
    serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
}
