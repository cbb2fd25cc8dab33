//! API server — HTTP router plus the Prometheus metrics listener.

use crate::rest::{self, AppState};
use axum::routing::{get, post};
use axum::Router;
use pulse_core::config::AppConfig;
use pulse_ingest::{RecordSource, SnapshotStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct ApiServer {
    config: AppConfig,
    store: Arc<SnapshotStore>,
    source: Arc<dyn RecordSource>,
}

impl ApiServer {
    pub fn new(
        config: AppConfig,
        store: Arc<SnapshotStore>,
        source: Arc<dyn RecordSource>,
    ) -> Self {
        Self {
            config,
            store,
            source,
        }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let state = AppState {
            store: self.store.clone(),
            source: self.source.clone(),
            node_id: self.config.node_id.clone(),
            start_time: Instant::now(),
        };

        let app = Router::new()
            // Dashboard views
            .route("/v1/enrollments/dashboard", get(rest::enrollment_dashboard))
            .route("/v1/renewals/dashboard", get(rest::renewal_dashboard))
            .route("/v1/renewals/export", get(rest::renewal_export))
            .route("/v1/ltv", get(rest::ltv_dashboard))
            .route("/v1/refresh", post(rest::trigger_refresh))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
