//! CoursePulse — enrollment, renewal, and lifetime-value analytics for a
//! training business.
//!
//! Main entry point that loads configuration, primes the snapshot store,
//! and starts the API server.

use clap::Parser;
use pulse_api::ApiServer;
use pulse_core::config::AppConfig;
use pulse_ingest::{refresh, HttpRecordSource, RecordSource, SnapshotStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "coursepulse")]
#[command(about = "Enrollment, renewal, and LTV analytics dashboards")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "COURSEPULSE__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "COURSEPULSE__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Enrollment endpoint URL (overrides config)
    #[arg(long, env = "COURSEPULSE__SOURCES__ENROLLMENT_URL")]
    enrollment_url: Option<String>,

    /// Renewal endpoint URL (overrides config)
    #[arg(long, env = "COURSEPULSE__SOURCES__RENEWAL_URL")]
    renewal_url: Option<String>,

    /// Seconds between background refreshes (overrides config)
    #[arg(long)]
    refresh_interval: Option<u64>,

    /// Skip the background refresh task (snapshot only changes via /v1/refresh)
    #[arg(long, default_value_t = false)]
    no_refresh: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursepulse=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("CoursePulse starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(url) = cli.enrollment_url {
        config.sources.enrollment_url = url;
    }
    if let Some(url) = cli.renewal_url {
        config.sources.renewal_url = url;
    }
    if let Some(secs) = cli.refresh_interval {
        config.sources.refresh_interval_secs = secs;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        enrollment_url = %config.sources.enrollment_url,
        renewal_url = %config.sources.renewal_url,
        "Configuration loaded"
    );

    let store = Arc::new(SnapshotStore::new());
    let source: Arc<dyn RecordSource> = Arc::new(HttpRecordSource::new(&config.sources)?);

    // Prime the store so the first dashboard request has data to serve.
    let outcome = refresh(source.as_ref(), &store).await;
    info!(
        enrollments = outcome.enrollment_count,
        renewals = outcome.renewal_count,
        "Initial snapshot installed"
    );

    if !cli.no_refresh {
        let store = store.clone();
        let source = source.clone();
        let interval_secs = config.sources.refresh_interval_secs.max(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            // The first tick fires immediately and the store is already primed.
            interval.tick().await;
            loop {
                interval.tick().await;
                let outcome = refresh(source.as_ref(), &store).await;
                if outcome.stale {
                    warn!(generation = outcome.generation, "Background refresh superseded");
                }
            }
        });
    }

    let server = ApiServer::new(config.clone(), store, source);

    if config.metrics.enabled {
        if let Err(e) = server.start_metrics().await {
            warn!(error = %e, "Failed to start metrics exporter");
        }
    }

    server.start_http().await
}
