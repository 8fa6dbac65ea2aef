//! Query execution against the ClickHouse HTTP interface.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::ClickHouseConfig;
use crate::cost::{QueryCostEnvelope, RawStatistics};
use crate::decode::Row;
use crate::error::{ConfigError, QueryError, QueryResult};

const SUMMARY_HEADER: &str = "X-ClickHouse-Summary";

/// Rows plus the cost of producing them. Stats are always present,
/// zero-filled when the backend reports nothing.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    pub rows: Vec<Row>,
    pub stats: QueryCostEnvelope,
}

/// The one capability the analytics layer needs from a store.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> QueryResult<QueryOutput>;
}

#[derive(Debug, Deserialize)]
struct JsonPayload {
    #[serde(default)]
    data: Vec<Row>,
    #[serde(default)]
    statistics: Option<RawStatistics>,
}

/// Parses a `FORMAT JSON` body. `summary` is the `X-ClickHouse-Summary`
/// header, used when the body has no `statistics` object.
pub fn parse_payload(body: &[u8], summary: Option<&str>) -> QueryResult<QueryOutput> {
    let payload: JsonPayload =
        serde_json::from_slice(body).map_err(|e| QueryError::Response(format!("invalid JSON payload: {e}")))?;

    let stats = match payload.statistics {
        Some(raw) => QueryCostEnvelope::from_statistics(&raw),
        None => summary
            .and_then(QueryCostEnvelope::from_summary_header)
            .unwrap_or_default(),
    };

    Ok(QueryOutput {
        rows: payload.data,
        stats,
    })
}

pub struct ClickHouseClient {
    client: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    pub fn new(config: ClickHouseConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("artist-stats-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    fn map_transport(&self, err: reqwest::Error) -> QueryError {
        if err.is_timeout() {
            QueryError::Timeout(self.config.timeout)
        } else {
            QueryError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl QueryExecutor for ClickHouseClient {
    async fn execute(&self, sql: &str) -> QueryResult<QueryOutput> {
        let response = self
            .client
            .post(self.config.endpoint())
            .basic_auth(&self.config.user, Some(&self.config.password))
            .header(CONTENT_TYPE, "text/plain; charset=UTF-8")
            .body(format!("{}\nFORMAT JSON", sql.trim()))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        let summary = response
            .headers()
            .get(SUMMARY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(QueryError::Status {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.map_transport(e))?;
        let output = parse_payload(&body, summary.as_deref())?;

        debug!(
            rows = output.rows.len(),
            elapsed_ms = output.stats.elapsed_ms(),
            rows_read = output.stats.rows_read,
            bytes_read = output.stats.bytes_read,
            "query finished"
        );

        Ok(output)
    }
}
