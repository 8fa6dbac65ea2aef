use serde::{Deserialize, Serialize};

use crate::cost::QueryCostEnvelope;

/// Label used when the store has no category for a row.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// One (category, count) pair as returned by an aggregate query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

impl CategoryCount {
    pub fn new(category: impl Into<String>, count: u64) -> Self {
        Self {
            category: category.into(),
            count,
        }
    }
}

/// A single ranked row of a [`RankedDistribution`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub category: String,
    pub count: u64,
    pub cumulative_count: u64,
    pub cumulative_pct: f64,
}

/// Categories ordered by count with a running cumulative share.
///
/// Built by [`crate::projections::DistributionBuilder`]; ranks start at 1
/// and are contiguous.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedDistribution {
    pub entries: Vec<RankedEntry>,
    pub total: u64,
}

impl RankedDistribution {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Category labels of the first `k` ranks.
    pub fn top_categories(&self, k: usize) -> Vec<&str> {
        self.entries
            .iter()
            .take(k)
            .map(|e| e.category.as_str())
            .collect()
    }
}

/// Minimal prefix of a distribution that covers `threshold_pct` of the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoThreshold {
    pub threshold_pct: f64,
    pub rank_at_threshold: usize,
    pub total_categories: usize,
    pub pct_of_categories: f64,
}

/// Result of a threshold search. `Unreachable` is an expected outcome
/// (empty or all-zero distribution), not a fault.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParetoOutcome {
    Reached(ParetoThreshold),
    Unreachable {
        threshold_pct: f64,
        total_categories: usize,
    },
}

impl ParetoOutcome {
    pub fn threshold(&self) -> Option<&ParetoThreshold> {
        match self {
            Self::Reached(t) => Some(t),
            Self::Unreachable { .. } => None,
        }
    }

    /// Display text for summary cards; `n/a` when unreachable.
    pub fn label(&self) -> String {
        match self {
            Self::Reached(t) => format!(
                "{} of {} ({:.2}%)",
                t.rank_at_threshold, t.total_categories, t.pct_of_categories
            ),
            Self::Unreachable { .. } => "n/a".to_string(),
        }
    }
}

/// Pareto chart points plus the threshold outcome.
#[derive(Debug, Clone, Serialize)]
pub struct ParetoReport {
    pub points: Vec<RankedEntry>,
    pub outcome: ParetoOutcome,
    pub label: String,
}

/// Headline counters for the summary cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverviewStats {
    pub artists: u64,
    pub areas: u64,
    pub ended_artists: u64,
    pub active_artists: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditedArtist {
    pub name: String,
    pub edits: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentUpdate {
    pub name: String,
    pub last_updated: Option<String>,
}

/// Any query-derived value together with what it cost to produce.
#[derive(Debug, Clone, Serialize)]
pub struct Measured<T> {
    pub data: T,
    pub cost: QueryCostEnvelope,
}

impl<T> Measured<T> {
    pub fn new(data: T, cost: QueryCostEnvelope) -> Self {
        Self { data, cost }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Measured<U> {
        Measured {
            data: f(self.data),
            cost: self.cost,
        }
    }
}
