use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use artist_stats::routes::{self, AppState};
use artist_stats::{ClickHouseClient, ClickHouseConfig, DashboardOptions};

/// Read-only HTTP API over the artist metadata snapshot.
/// Never writes to the store; every response is computed fresh.
#[derive(Parser, Debug)]
#[command(name = "artist-stats-api", version, about)]
struct Cli {
    /// Bind address.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Read CLICKHOUSE_* settings from this dotenv file instead of the
    /// process environment.
    #[arg(long, env = "ARTIST_STATS_ENV_FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let cli = Cli::parse();

    // Incomplete configuration is fatal; no partial startup.
    let config = match &cli.env_file {
        Some(path) => ClickHouseConfig::from_env_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ClickHouseConfig::from_env().context("loading configuration from environment")?,
    };
    tracing::info!(?config, "clickhouse configured");

    let client = ClickHouseClient::new(config).context("building query client")?;

    let state = Arc::new(AppState {
        executor: Arc::new(client),
        options: DashboardOptions::default(),
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port).parse()?;
    tracing::info!(%addr, version = env!("CARGO_PKG_VERSION"), "artist-stats-api starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
