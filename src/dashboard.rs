//! Whole-page load: every widget query fanned out at once and joined.
//!
//! The join fails on the first error; a page is never rendered from a
//! subset of its widgets.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clickhouse::QueryExecutor;
use crate::comparison::DualAggregateResult;
use crate::cost::QueryCostEnvelope;
use crate::error::QueryResult;
use crate::models::{CategoryCount, EditedArtist, Measured, OverviewStats, ParetoReport, RecentUpdate};
use crate::projections::ParetoThresholdFinder;
use crate::queries;

/// Widget sizes for one page load.
#[derive(Debug, Clone, Copy)]
pub struct DashboardOptions {
    pub top_areas: usize,
    pub top_initials: usize,
    pub pareto_points: usize,
    pub pareto: ParetoThresholdFinder,
    pub rollup_areas: usize,
    pub most_edited: usize,
    pub recently_updated: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            top_areas: 15,
            top_initials: 20,
            pareto_points: 25,
            pareto: ParetoThresholdFinder::default(),
            rollup_areas: 15,
            most_edited: 12,
            recently_updated: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub snapshot_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub overview: Measured<OverviewStats>,
    pub top_areas: Measured<Vec<CategoryCount>>,
    pub top_initials: Measured<Vec<CategoryCount>>,
    pub pareto: Measured<ParetoReport>,
    pub rollup_comparison: DualAggregateResult,
    pub most_edited: Measured<Vec<EditedArtist>>,
    pub recently_updated: Measured<Vec<RecentUpdate>>,
    pub total_cost: QueryCostEnvelope,
}

pub async fn load_dashboard(
    executor: &dyn QueryExecutor,
    options: &DashboardOptions,
) -> QueryResult<DashboardSnapshot> {
    let snapshot_id = Uuid::new_v4();
    let started = Instant::now();

    let joined = tokio::try_join!(
        queries::overview(executor),
        queries::top_areas(executor, options.top_areas),
        queries::top_initials(executor, options.top_initials),
        queries::pareto_by_area(executor, options.pareto, options.pareto_points),
        queries::rollup_comparison(executor, options.rollup_areas),
        queries::most_edited(executor, options.most_edited),
        queries::recently_updated(executor, options.recently_updated),
    );

    let (overview, top_areas, top_initials, pareto, rollup_comparison, most_edited, recently_updated) =
        match joined {
            Ok(parts) => parts,
            Err(err) => {
                warn!(%snapshot_id, kind = err.kind(), error = %err, "dashboard load failed");
                return Err(err);
            }
        };

    let total_cost = [
        overview.cost,
        top_areas.cost,
        top_initials.cost,
        pareto.cost,
        rollup_comparison.primary.cost,
        rollup_comparison.secondary.cost,
        most_edited.cost,
        recently_updated.cost,
    ]
    .iter()
    .fold(QueryCostEnvelope::default(), |acc, cost| acc.combine(cost));

    info!(
        %snapshot_id,
        wall_ms = started.elapsed().as_secs_f64() * 1000.0,
        query_ms = total_cost.elapsed_ms(),
        rows_read = total_cost.rows_read,
        bytes_read = total_cost.bytes_read,
        pareto_threshold = options.pareto.threshold_pct(),
        pareto = %pareto.data.label,
        "dashboard loaded"
    );

    Ok(DashboardSnapshot {
        snapshot_id,
        generated_at: Utc::now(),
        overview,
        top_areas,
        top_initials,
        pareto,
        rollup_comparison,
        most_edited,
        recently_updated,
        total_cost,
    })
}
