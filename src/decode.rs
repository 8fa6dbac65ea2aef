//! Typed decoding of store rows.
//!
//! Rows arrive as untyped JSON objects. Everything past this module works
//! with typed records only. Malformed values are normalized here: a count
//! that is missing or unreadable becomes 0, and a row without a usable
//! label is dropped. Both cases are logged.

use serde_json::Value;
use tracing::warn;

use crate::models::{CategoryCount, EditedArtist, OverviewStats, RecentUpdate, UNKNOWN_CATEGORY};

/// One result row: column name to scalar value.
pub type Row = serde_json::Map<String, Value>;

/// Reads an unsigned integer from a JSON number or numeric string.
///
/// ClickHouse quotes 64-bit integers in `FORMAT JSON` output by default,
/// so `"123"` is as valid as `123`. Floats are truncated.
pub fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })
        }
        _ => None,
    }
}

pub fn lenient_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

fn label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn count_field(row: &Row, column: &str) -> u64 {
    match row.get(column) {
        Some(value) => lenient_u64(value).unwrap_or_else(|| {
            warn!(column, %value, "unreadable count, treating as 0");
            0
        }),
        None => {
            warn!(column, "missing count column, treating as 0");
            0
        }
    }
}

fn category_field(row: &Row, column: &str) -> Option<String> {
    match row.get(column) {
        Some(Value::Null) => Some(UNKNOWN_CATEGORY.to_string()),
        Some(value) => {
            let parsed = label(value);
            if parsed.is_none() {
                warn!(column, %value, "unusable category label, dropping row");
            }
            parsed
        }
        None => {
            warn!(column, "missing category column, dropping row");
            None
        }
    }
}

fn name_field(row: &Row, column: &str) -> Option<String> {
    let parsed = row.get(column).and_then(label);
    if parsed.is_none() {
        warn!(column, "row without a usable name, dropping it");
    }
    parsed
}

/// Decodes `(category, count)` rows, keeping store order.
pub fn category_counts(rows: &[Row], category_column: &str, count_column: &str) -> Vec<CategoryCount> {
    rows.iter()
        .filter_map(|row| {
            let category = category_field(row, category_column)?;
            Some(CategoryCount::new(category, count_field(row, count_column)))
        })
        .collect()
}

/// Decodes the single overview row. No row at all yields zeros.
pub fn overview(rows: &[Row]) -> OverviewStats {
    let Some(row) = rows.first() else {
        warn!("overview query returned no rows");
        return OverviewStats::default();
    };

    OverviewStats {
        artists: count_field(row, "artists"),
        areas: count_field(row, "areas"),
        ended_artists: count_field(row, "ended_artists"),
        active_artists: count_field(row, "active_artists"),
    }
}

pub fn edited_artists(rows: &[Row]) -> Vec<EditedArtist> {
    rows.iter()
        .filter_map(|row| {
            Some(EditedArtist {
                name: name_field(row, "name")?,
                edits: count_field(row, "edits"),
            })
        })
        .collect()
}

pub fn recent_updates(rows: &[Row]) -> Vec<RecentUpdate> {
    rows.iter()
        .filter_map(|row| {
            Some(RecentUpdate {
                name: name_field(row, "name")?,
                last_updated: row.get("last_updated").and_then(label),
            })
        })
        .collect()
}
