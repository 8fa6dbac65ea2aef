//! Side-by-side execution of one logical aggregate against two
//! materializations of the same data, typically a raw fact table and a
//! precomputed rollup.
//!
//! This is a diagnostic. The two sides may legitimately disagree (the raw
//! table and the rollup bucket missing categories differently), so nothing
//! here fails on disagreement. Agreement is reported, not enforced.

use serde::Serialize;
use tracing::info;

use crate::clickhouse::QueryExecutor;
use crate::cost::QueryCostEnvelope;
use crate::decode;
use crate::error::QueryResult;
use crate::models::RankedDistribution;
use crate::projections::DistributionBuilder;

/// How many leading ranks the agreement summary compares.
pub const AGREEMENT_TOP_K: usize = 3;

/// A ranked-by-count aggregate query and the columns holding its
/// grouping key and count.
#[derive(Debug, Clone)]
pub struct AggregateQuery {
    pub label: String,
    pub sql: String,
    pub category_column: String,
    pub count_column: String,
}

impl AggregateQuery {
    pub fn new(
        label: impl Into<String>,
        sql: impl Into<String>,
        category_column: impl Into<String>,
        count_column: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            sql: sql.into(),
            category_column: category_column.into(),
            count_column: count_column.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateSide {
    pub label: String,
    pub distribution: RankedDistribution,
    pub cost: QueryCostEnvelope,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Agreement {
    pub totals_agree: bool,
    pub top_k: usize,
    pub top_k_agree: bool,
    /// primary rows read / secondary rows read; `None` when the secondary
    /// read nothing.
    pub rows_read_ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DualAggregateResult {
    pub primary: AggregateSide,
    pub secondary: AggregateSide,
    pub agreement: Agreement,
}

impl DualAggregateResult {
    pub fn new(primary: AggregateSide, secondary: AggregateSide) -> Self {
        let agreement = Agreement {
            totals_agree: primary.distribution.total == secondary.distribution.total,
            top_k: AGREEMENT_TOP_K,
            top_k_agree: top_k_agree(&primary, &secondary, AGREEMENT_TOP_K),
            rows_read_ratio: rows_read_ratio(&primary.cost, &secondary.cost),
        };

        Self {
            primary,
            secondary,
            agreement,
        }
    }

    pub fn totals_agree(&self) -> bool {
        self.agreement.totals_agree
    }

    pub fn top_k_agree(&self, k: usize) -> bool {
        top_k_agree(&self.primary, &self.secondary, k)
    }
}

fn top_k_agree(primary: &AggregateSide, secondary: &AggregateSide, k: usize) -> bool {
    primary.distribution.top_categories(k) == secondary.distribution.top_categories(k)
}

fn rows_read_ratio(primary: &QueryCostEnvelope, secondary: &QueryCostEnvelope) -> Option<f64> {
    (secondary.rows_read > 0).then(|| primary.rows_read as f64 / secondary.rows_read as f64)
}

pub struct DualAggregateComparator {
    primary: AggregateQuery,
    secondary: AggregateQuery,
    top: Option<usize>,
}

impl DualAggregateComparator {
    pub fn new(primary: AggregateQuery, secondary: AggregateQuery) -> Self {
        Self {
            primary,
            secondary,
            top: None,
        }
    }

    /// Keep only the first `n` ranked entries per side in the result.
    /// Totals and agreement are still computed over every row returned.
    pub fn with_top(mut self, n: usize) -> Self {
        self.top = Some(n);
        self
    }

    /// Runs both sides concurrently. Either side failing fails the whole
    /// comparison.
    pub async fn compare(&self, executor: &dyn QueryExecutor) -> QueryResult<DualAggregateResult> {
        let (primary, secondary) = tokio::try_join!(
            run_side(&self.primary, executor),
            run_side(&self.secondary, executor),
        )?;

        let mut result = DualAggregateResult::new(primary, secondary);
        if let Some(n) = self.top {
            result.primary.distribution.entries.truncate(n);
            result.secondary.distribution.entries.truncate(n);
        }
        info!(
            primary = %result.primary.label,
            secondary = %result.secondary.label,
            primary_ms = result.primary.cost.elapsed_ms(),
            secondary_ms = result.secondary.cost.elapsed_ms(),
            totals_agree = result.agreement.totals_agree,
            top_k_agree = result.agreement.top_k_agree,
            "aggregate comparison finished"
        );

        Ok(result)
    }
}

async fn run_side(query: &AggregateQuery, executor: &dyn QueryExecutor) -> QueryResult<AggregateSide> {
    let output = executor.execute(&query.sql).await?;
    let counts = decode::category_counts(&output.rows, &query.category_column, &query.count_column);

    Ok(AggregateSide {
        label: query.label.clone(),
        distribution: DistributionBuilder::build(counts),
        cost: output.stats,
    })
}
