//! Query cost envelope: elapsed time, rows read and bytes read for one
//! query execution.
//!
//! Backends report these in different shapes. ClickHouse puts them in the
//! `statistics` object of a `FORMAT JSON` response (elapsed in seconds) and
//! also in the `X-ClickHouse-Summary` response header (elapsed in
//! nanoseconds, every value a quoted string). Both are normalized here;
//! the envelope always carries seconds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decode::{lenient_f64, lenient_u64};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QueryCostEnvelope {
    pub elapsed_seconds: f64,
    pub rows_read: u64,
    pub bytes_read: u64,
}

/// `statistics` object as found in a `FORMAT JSON` payload. Every field is
/// optional and may arrive as a number or a numeric string.
#[derive(Debug, Default, Deserialize)]
pub struct RawStatistics {
    #[serde(default)]
    pub elapsed: Option<Value>,
    #[serde(default)]
    pub rows_read: Option<Value>,
    #[serde(default)]
    pub bytes_read: Option<Value>,
}

impl QueryCostEnvelope {
    pub fn new(elapsed_seconds: f64, rows_read: u64, bytes_read: u64) -> Self {
        Self {
            elapsed_seconds: sanitize_seconds(elapsed_seconds),
            rows_read,
            bytes_read,
        }
    }

    /// Normalizes a `statistics` object; absent or unusable fields become 0.
    pub fn from_statistics(stats: &RawStatistics) -> Self {
        Self::new(
            stats.elapsed.as_ref().and_then(lenient_f64).unwrap_or(0.0),
            stats.rows_read.as_ref().and_then(lenient_u64).unwrap_or(0),
            stats.bytes_read.as_ref().and_then(lenient_u64).unwrap_or(0),
        )
    }

    /// Parses the `X-ClickHouse-Summary` header value. Returns `None` when
    /// the header is not a JSON object.
    pub fn from_summary_header(header: &str) -> Option<Self> {
        let summary: serde_json::Map<String, Value> = serde_json::from_str(header).ok()?;
        let field = |name: &str| summary.get(name).and_then(lenient_u64).unwrap_or(0);

        Some(Self::new(
            field("elapsed_ns") as f64 / NANOS_PER_SECOND,
            field("read_rows"),
            field("read_bytes"),
        ))
    }

    /// Render-time conversion; the envelope itself always holds seconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_seconds * 1000.0
    }

    /// Sums two envelopes, e.g. for a whole dashboard load.
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            elapsed_seconds: self.elapsed_seconds + other.elapsed_seconds,
            rows_read: self.rows_read.saturating_add(other.rows_read),
            bytes_read: self.bytes_read.saturating_add(other.bytes_read),
        }
    }
}

fn sanitize_seconds(secs: f64) -> f64 {
    if secs.is_finite() && secs > 0.0 {
        secs
    } else {
        0.0
    }
}
