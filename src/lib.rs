//! Read-only analytics API over a ClickHouse snapshot of music-artist
//! metadata.
//!
//! The store does the grouping and counting. This crate ranks the results,
//! derives the Pareto concentration of artists by area, compares the raw
//! table against its rollup, and annotates everything with the cost the
//! store reported.

pub mod clickhouse;
pub mod comparison;
pub mod config;
pub mod cost;
pub mod dashboard;
pub mod decode;
pub mod error;
pub mod models;
pub mod projections;
pub mod queries;
pub mod routes;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

pub use clickhouse::{ClickHouseClient, QueryExecutor, QueryOutput};
pub use comparison::{AggregateQuery, DualAggregateComparator, DualAggregateResult};
pub use config::ClickHouseConfig;
pub use cost::QueryCostEnvelope;
pub use dashboard::{load_dashboard, DashboardOptions, DashboardSnapshot};
pub use error::{ConfigError, InvalidThreshold, QueryError};
pub use models::{CategoryCount, ParetoOutcome, ParetoThreshold, RankedDistribution, RankedEntry};
pub use projections::{DistributionBuilder, ParetoThresholdFinder};
