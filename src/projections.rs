use std::collections::BTreeMap;

use crate::error::InvalidThreshold;
use crate::models::{CategoryCount, ParetoOutcome, ParetoThreshold, RankedDistribution, RankedEntry};


/// Percentage rounded half-up to 2 decimals; 0.0 when the denominator is
/// zero. Rounding happens on integer hundredths so exact halves such as
/// 23/160 = 14.375% are not lost to binary floating point.
pub fn safe_pct(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let (n, d) = (u128::from(numerator), u128::from(denominator));
    let hundredths = (n * 20_000 + d) / (2 * d);
    hundredths as f64 / 100.0
}

/// Ranks category counts by count with a running cumulative share
pub struct DistributionBuilder;

impl DistributionBuilder {
    /// Merges duplicate labels, orders by count desc then label asc, and
    /// assigns ranks 1..N with cumulative percentages.
    pub fn build(counts: impl IntoIterator<Item = CategoryCount>) -> RankedDistribution {
        let mut merged: BTreeMap<String, u64> = BTreeMap::new();
        for entry in counts {
            let slot = merged.entry(entry.category).or_insert(0);
            *slot = slot.saturating_add(entry.count);
        }

        let total = merged.values().fold(0u64, |acc, n| acc.saturating_add(*n));

        // BTreeMap iterates label-ascending and sort_by is stable, so equal
        // counts keep that order.
        let mut ordered: Vec<(String, u64)> = merged.into_iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1));

        let mut cumulative_count = 0u64;
        let entries = ordered
            .into_iter()
            .enumerate()
            .map(|(idx, (category, count))| {
                cumulative_count = cumulative_count.saturating_add(count);
                RankedEntry {
                    rank: idx + 1,
                    category,
                    count,
                    cumulative_count,
                    cumulative_pct: safe_pct(cumulative_count, total),
                }
            })
            .collect();

        RankedDistribution { entries, total }
    }
}

pub const DEFAULT_PARETO_THRESHOLD: f64 = 80.0;

/// Finds the smallest rank whose cumulative share meets a threshold.
#[derive(Debug, Clone, Copy)]
pub struct ParetoThresholdFinder {
    threshold_pct: f64,
}

impl Default for ParetoThresholdFinder {
    fn default() -> Self {
        Self {
            threshold_pct: DEFAULT_PARETO_THRESHOLD,
        }
    }
}

impl ParetoThresholdFinder {
    pub fn new(threshold_pct: f64) -> Result<Self, InvalidThreshold> {
        if threshold_pct.is_nan() || threshold_pct <= 0.0 || threshold_pct > 100.0 {
            return Err(InvalidThreshold(threshold_pct));
        }
        Ok(Self { threshold_pct })
    }

    pub fn threshold_pct(&self) -> f64 {
        self.threshold_pct
    }

    pub fn find(&self, dist: &RankedDistribution) -> ParetoOutcome {
        let total_categories = dist.len();

        match dist
            .entries
            .iter()
            .find(|e| e.cumulative_pct >= self.threshold_pct)
        {
            Some(entry) => ParetoOutcome::Reached(ParetoThreshold {
                threshold_pct: self.threshold_pct,
                rank_at_threshold: entry.rank,
                total_categories,
                pct_of_categories: safe_pct(entry.rank as u64, total_categories as u64),
            }),
            None => ParetoOutcome::Unreachable {
                threshold_pct: self.threshold_pct,
                total_categories,
            },
        }
    }
}
