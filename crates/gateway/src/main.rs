//! PressForge API Gateway
//!
//! Entry point for the HTTP API. Loads configuration, connects the
//! content store, builds the provider clients and serves the router.

use anyhow::Context;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use pressforge_common::{
    config::{AppConfig, ObservabilityConfig},
    db::{ensure_schema, DbPool},
    metrics, Providers,
};
use pressforge_gateway::{create_router, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.observability);

    info!("Starting PressForge API Gateway v{}", pressforge_common::VERSION);

    install_metrics_exporter(config.observability.metrics_port)?;
    metrics::register_metrics();

    let db = DbPool::new(&config.database).await?;
    ensure_schema(db.conn()).await?;

    let providers = Providers::from_config(&config)?;
    info!(
        llm = providers.llm.model_name(),
        images = providers.images.provider_name(),
        translator = providers.translator.provider_name(),
        "Providers ready"
    );

    let config = Arc::new(config);
    if config.admin.secret_key.as_deref().unwrap_or_default().is_empty() {
        warn!("No admin secret configured, admin routes will reject every request");
    }

    let state = AppState::new(config.clone(), db, &providers);
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

/// Serve `/metrics` on its own port; port 0 disables the exporter
fn install_metrics_exporter(port: u16) -> anyhow::Result<()> {
    if port == 0 {
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
        .set_buckets_for_metric(
            Matcher::Suffix("request_duration_seconds".to_string()),
            metrics::LATENCY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Suffix("llm_duration_seconds".to_string()),
            metrics::LLM_BUCKETS,
        )?
        .install()
        .context("failed to install Prometheus exporter")?;

    info!(port, "Prometheus exporter listening");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
