//! In-memory [`QueryExecutor`] for tests.
//!
//! Queries are matched on the `artist-stats:<name>` tag every SQL string in
//! [`crate::queries`] starts with. The most recently added script for a tag
//! wins, so a canned dashboard can be overridden per test.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Barrier;

use crate::clickhouse::{QueryExecutor, QueryOutput};
use crate::cost::QueryCostEnvelope;
use crate::decode::Row;
use crate::error::{QueryError, QueryResult};

enum Script {
    Rows(QueryOutput),
    Fail(QueryError),
}

#[derive(Default)]
pub struct ScriptedExecutor {
    scripts: Vec<(String, Script)>,
    calls: Mutex<Vec<String>>,
    barrier: Option<Arc<Barrier>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, name: &str, rows: Value, stats: QueryCostEnvelope) -> Self {
        let rows: Vec<Row> = serde_json::from_value(rows).expect("rows must be a JSON array of objects");
        self.scripts
            .push((tag(name), Script::Rows(QueryOutput { rows, stats })));
        self
    }

    pub fn with_error(mut self, name: &str, err: QueryError) -> Self {
        self.scripts.push((tag(name), Script::Fail(err)));
        self
    }

    /// Every call waits on this barrier before answering, so a caller that
    /// runs queries one after another never gets past the first one.
    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn tag(name: &str) -> String {
    format!("artist-stats:{name} ")
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn execute(&self, sql: &str) -> QueryResult<QueryOutput> {
        self.calls.lock().unwrap().push(sql.to_string());

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }

        match self.scripts.iter().rev().find(|(tag, _)| sql.contains(tag.as_str())) {
            Some((_, Script::Rows(output))) => Ok(output.clone()),
            Some((_, Script::Fail(err))) => Err(err.clone()),
            None => Err(QueryError::Response(format!("no scripted result for: {sql}"))),
        }
    }
}

/// A fully scripted dashboard: every query the page needs answers.
pub fn dashboard_executor() -> ScriptedExecutor {
    use serde_json::json;

    ScriptedExecutor::new()
        .with_rows(
            "overview",
            json!([{ "artists": "1000", "areas": "3", "ended_artists": "100", "active_artists": "900" }]),
            QueryCostEnvelope::new(0.002, 1000, 9000),
        )
        .with_rows(
            "top_areas",
            json!([
                { "area": "United States", "artists": "500" },
                { "area": "United Kingdom", "artists": "300" },
                { "area": "Unknown", "artists": "200" }
            ]),
            QueryCostEnvelope::new(0.001, 3, 120),
        )
        .with_rows(
            "top_initials",
            json!([
                { "initial": "T", "artists": "120" },
                { "initial": "#", "artists": "4" }
            ]),
            QueryCostEnvelope::new(0.003, 1000, 20000),
        )
        .with_rows(
            "area_distribution",
            json!([
                { "area": "United States", "artists": "500" },
                { "area": "United Kingdom", "artists": "300" },
                { "area": "Japan", "artists": "200" }
            ]),
            QueryCostEnvelope::new(0.001, 3, 150),
        )
        .with_rows(
            "rollup_raw",
            json!([
                { "area": "222", "artists": "500" },
                { "area": "221", "artists": "300" },
                { "area": "Unknown", "artists": "200" }
            ]),
            QueryCostEnvelope::new(0.02, 1000, 8000),
        )
        .with_rows(
            "rollup_agg",
            json!([
                { "area": "222", "artists": "500" },
                { "area": "221", "artists": "300" },
                { "area": "Unknown", "artists": "200" }
            ]),
            QueryCostEnvelope::new(0.001, 3, 48),
        )
        .with_rows(
            "most_edited",
            json!([{ "name": "Various Artists", "edits": "4100" }]),
            QueryCostEnvelope::new(0.004, 1000, 30000),
        )
        .with_rows(
            "recently_updated",
            json!([{ "name": "Björk", "last_updated": "2024-05-01 10:00:00" }]),
            QueryCostEnvelope::new(0.005, 1000, 40000),
        )
}
