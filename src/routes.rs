//! HTTP routes. Read-only: every handler runs fresh queries and returns
//! JSON.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use crate::clickhouse::QueryExecutor;
use crate::comparison::DualAggregateResult;
use crate::dashboard::{self, DashboardOptions, DashboardSnapshot};
use crate::error::{InvalidThreshold, QueryError};
use crate::models::{CategoryCount, EditedArtist, Measured, OverviewStats, ParetoReport, RecentUpdate};
use crate::projections::ParetoThresholdFinder;
use crate::queries;

/// Shared, immutable per-process state.
pub struct AppState {
    pub executor: Arc<dyn QueryExecutor>,
    pub options: DashboardOptions,
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/overview", get(get_overview))
        .route("/api/areas/top", get(get_top_areas))
        .route("/api/initials", get(get_top_initials))
        .route("/api/artists/most-edited", get(get_most_edited))
        .route("/api/artists/recent", get(get_recently_updated))
        .route("/api/pareto", get(get_pareto))
        .route("/api/rollup-comparison", get(get_rollup_comparison))
        .with_state(state)
}

async fn root() -> &'static str {
    concat!("Artist stats dashboard API v", env!("CARGO_PKG_VERSION"))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Deserialize)]
struct LimitParams {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ParetoParams {
    threshold: Option<f64>,
    limit: Option<usize>,
}

/// Full page: every widget, or an error state if any query failed.
async fn get_dashboard(State(state): State<SharedState>) -> Result<Json<DashboardSnapshot>, AppError> {
    let snapshot = dashboard::load_dashboard(state.executor.as_ref(), &state.options).await?;
    Ok(Json(snapshot))
}

async fn get_overview(State(state): State<SharedState>) -> Result<Json<Measured<OverviewStats>>, AppError> {
    Ok(Json(queries::overview(state.executor.as_ref()).await?))
}

async fn get_top_areas(
    State(state): State<SharedState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Measured<Vec<CategoryCount>>>, AppError> {
    let limit = params.limit.unwrap_or(state.options.top_areas);
    Ok(Json(queries::top_areas(state.executor.as_ref(), limit).await?))
}

async fn get_top_initials(
    State(state): State<SharedState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Measured<Vec<CategoryCount>>>, AppError> {
    let limit = params.limit.unwrap_or(state.options.top_initials);
    Ok(Json(queries::top_initials(state.executor.as_ref(), limit).await?))
}

async fn get_most_edited(
    State(state): State<SharedState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Measured<Vec<EditedArtist>>>, AppError> {
    let limit = params.limit.unwrap_or(state.options.most_edited);
    Ok(Json(queries::most_edited(state.executor.as_ref(), limit).await?))
}

async fn get_recently_updated(
    State(state): State<SharedState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Measured<Vec<RecentUpdate>>>, AppError> {
    let limit = params.limit.unwrap_or(state.options.recently_updated);
    Ok(Json(queries::recently_updated(state.executor.as_ref(), limit).await?))
}

async fn get_pareto(
    State(state): State<SharedState>,
    Query(params): Query<ParetoParams>,
) -> Result<Json<Measured<ParetoReport>>, AppError> {
    let finder = match params.threshold {
        Some(pct) => ParetoThresholdFinder::new(pct)?,
        None => state.options.pareto,
    };
    let limit = params.limit.unwrap_or(state.options.pareto_points);

    Ok(Json(
        queries::pareto_by_area(state.executor.as_ref(), finder, limit).await?,
    ))
}

async fn get_rollup_comparison(
    State(state): State<SharedState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<DualAggregateResult>, AppError> {
    let limit = params.limit.unwrap_or(state.options.rollup_areas);
    Ok(Json(queries::rollup_comparison(state.executor.as_ref(), limit).await?))
}

/// Structured JSON error response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<InvalidThreshold> for AppError {
    fn from(err: InvalidThreshold) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_threshold",
            message: err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
            "kind": self.kind,
        });
        (self.status, Json(body)).into_response()
    }
}
