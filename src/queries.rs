//! Aggregate queries behind the dashboard widgets.
//!
//! Every SQL string starts with an `artist-stats:<name>` comment so the
//! query shows up by name in `system.query_log`. The store only groups and
//! counts; ranking and cumulative shares are computed in
//! [`crate::projections`].

use crate::clickhouse::QueryExecutor;
use crate::comparison::{AggregateQuery, DualAggregateComparator, DualAggregateResult};
use crate::decode;
use crate::error::QueryResult;
use crate::models::{
    CategoryCount, EditedArtist, Measured, OverviewStats, ParetoReport, RankedDistribution, RecentUpdate,
};
use crate::projections::{DistributionBuilder, ParetoThresholdFinder};

pub const MAX_LIMIT: usize = 100;

/// Keeps interpolated LIMIT values within 1..=MAX_LIMIT.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

fn tagged(name: &str, body: &str) -> String {
    format!("/* artist-stats:{name} */\n{}", body.trim())
}

pub fn overview_sql() -> String {
    tagged(
        "overview",
        "
        SELECT
          count() AS artists,
          uniqExactIf(area_id, area_id IS NOT NULL) AS areas,
          countIf(ended = 1) AS ended_artists,
          countIf(ended = 0) AS active_artists
        FROM mb_artist
        ",
    )
}

pub fn top_areas_sql(limit: usize) -> String {
    tagged(
        "top_areas",
        &format!(
            "
            SELECT
              if(r.area_id = 0, 'Unknown', coalesce(a.name, toString(r.area_id))) AS area,
              sum(r.artists) AS artists
            FROM mb_artist_area_rollup r
            LEFT ANY JOIN mb_area a ON a.area_id = r.area_id
            GROUP BY area
            ORDER BY artists DESC, area ASC
            LIMIT {}
            ",
            clamp_limit(limit)
        ),
    )
}

pub fn top_initials_sql(limit: usize) -> String {
    tagged(
        "top_initials",
        &format!(
            "
            SELECT
              if(lengthUTF8(trimBoth(name)) = 0, '#', upper(substringUTF8(trimBoth(name), 1, 1))) AS initial,
              count() AS artists
            FROM mb_artist
            GROUP BY initial
            ORDER BY artists DESC, initial ASC
            LIMIT {}
            ",
            clamp_limit(limit)
        ),
    )
}

pub fn most_edited_sql(limit: usize) -> String {
    tagged(
        "most_edited",
        &format!(
            "
            SELECT
              name,
              max(edits) AS edits
            FROM mb_artist
            GROUP BY name
            ORDER BY edits DESC, name ASC
            LIMIT {}
            ",
            clamp_limit(limit)
        ),
    )
}

pub fn recently_updated_sql(limit: usize) -> String {
    tagged(
        "recently_updated",
        &format!(
            "
            SELECT
              name,
              last_updated
            FROM mb_artist
            WHERE last_updated IS NOT NULL
            ORDER BY parseDateTimeBestEffortOrNull(last_updated) DESC, name ASC
            LIMIT {}
            ",
            clamp_limit(limit)
        ),
    )
}

/// Per-area counts from the rollup, excluding the `area_id = 0` bucket.
/// No LIMIT: the cumulative share needs every area.
pub fn area_distribution_sql() -> String {
    tagged(
        "area_distribution",
        "
        SELECT
          coalesce(a.name, toString(r.area_id)) AS area,
          sum(r.artists) AS artists
        FROM mb_artist_area_rollup r
        LEFT ANY JOIN mb_area a ON a.area_id = r.area_id
        WHERE r.area_id != 0
        GROUP BY area
        ",
    )
}

/// Raw side of the rollup comparison: a full scan of `mb_artist`.
/// Missing area ids become `Unknown` through `ifNull`. No LIMIT: totals are
/// compared over the whole grouping.
pub fn rollup_raw_sql() -> String {
    tagged(
        "rollup_raw",
        "
        SELECT
          ifNull(toString(area_id), 'Unknown') AS area,
          count() AS artists
        FROM mb_artist
        GROUP BY area
        ORDER BY artists DESC, area ASC
        ",
    )
}

/// Rollup side of the comparison. The rollup stores missing areas under
/// the `area_id = 0` sentinel.
pub fn rollup_agg_sql() -> String {
    tagged(
        "rollup_agg",
        "
        SELECT
          if(area_id = 0, 'Unknown', toString(area_id)) AS area,
          sum(artists) AS artists
        FROM mb_artist_area_rollup
        GROUP BY area
        ORDER BY artists DESC, area ASC
        ",
    )
}

pub async fn overview(executor: &dyn QueryExecutor) -> QueryResult<Measured<OverviewStats>> {
    let output = executor.execute(&overview_sql()).await?;
    Ok(Measured::new(decode::overview(&output.rows), output.stats))
}

pub async fn top_areas(executor: &dyn QueryExecutor, limit: usize) -> QueryResult<Measured<Vec<CategoryCount>>> {
    let output = executor.execute(&top_areas_sql(limit)).await?;
    Ok(Measured::new(
        decode::category_counts(&output.rows, "area", "artists"),
        output.stats,
    ))
}

pub async fn top_initials(executor: &dyn QueryExecutor, limit: usize) -> QueryResult<Measured<Vec<CategoryCount>>> {
    let output = executor.execute(&top_initials_sql(limit)).await?;
    Ok(Measured::new(
        decode::category_counts(&output.rows, "initial", "artists"),
        output.stats,
    ))
}

pub async fn most_edited(executor: &dyn QueryExecutor, limit: usize) -> QueryResult<Measured<Vec<EditedArtist>>> {
    let output = executor.execute(&most_edited_sql(limit)).await?;
    Ok(Measured::new(decode::edited_artists(&output.rows), output.stats))
}

pub async fn recently_updated(
    executor: &dyn QueryExecutor,
    limit: usize,
) -> QueryResult<Measured<Vec<RecentUpdate>>> {
    let output = executor.execute(&recently_updated_sql(limit)).await?;
    Ok(Measured::new(decode::recent_updates(&output.rows), output.stats))
}

pub async fn area_distribution(executor: &dyn QueryExecutor) -> QueryResult<Measured<RankedDistribution>> {
    let output = executor.execute(&area_distribution_sql()).await?;
    let counts = decode::category_counts(&output.rows, "area", "artists");
    Ok(Measured::new(DistributionBuilder::build(counts), output.stats))
}

/// Area concentration: the first `limit` ranked points for the chart, and
/// how many areas it takes to cover the finder's threshold.
pub async fn pareto_by_area(
    executor: &dyn QueryExecutor,
    finder: ParetoThresholdFinder,
    limit: usize,
) -> QueryResult<Measured<ParetoReport>> {
    let distribution = area_distribution(executor).await?;

    Ok(distribution.map(|dist| {
        let outcome = finder.find(&dist);
        let label = outcome.label();
        let mut points = dist.entries;
        points.truncate(clamp_limit(limit));
        ParetoReport {
            points,
            outcome,
            label,
        }
    }))
}

/// Raw table vs rollup, both grouped by area. Each side keeps its first
/// `limit` ranked areas; totals cover every area.
pub async fn rollup_comparison(executor: &dyn QueryExecutor, limit: usize) -> QueryResult<DualAggregateResult> {
    let comparator = DualAggregateComparator::new(
        AggregateQuery::new("raw", rollup_raw_sql(), "area", "artists"),
        AggregateQuery::new("rollup", rollup_agg_sql(), "area", "artists"),
    )
    .with_top(clamp_limit(limit));
    comparator.compare(executor).await
}
