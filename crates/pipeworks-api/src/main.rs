//! Pipeline orchestrator API server binary.

use std::net::SocketAddr;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pipeworks_api::{create_router, metrics, ApiConfig, AppState};
use pipeworks_queue::StuckDetector;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT").map(|v| v.to_lowercase() == "json").unwrap_or(false);
    let env_filter = EnvFilter::from_default_env().add_directive("pipeworks=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry().with(fmt::layer().json()).with(env_filter).init();
    } else {
        tracing_subscriber::registry().with(fmt::layer().with_ansi(true).with_target(true).with_file(false).with_line_number(false)).with(env_filter).init();
    }

    info!("starting pipeworks-api");

    let config = ApiConfig::from_env();
    info!(host = %config.host, port = config.port, environment = %config.environment, "loaded config");

    let state = match AppState::new(config.clone()).await {
        Ok(s) => s,
        Err(e) => {
            error!("failed to build application state: {e}");
            std::process::exit(1);
        }
    };

    let metrics_enabled = std::env::var("METRICS_ENABLED").map(|v| v == "true" || v == "1").unwrap_or(true);
    let metrics_handle = if metrics_enabled {
        info!("prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics())
    } else {
        None
    };

    let stuck_detector = StuckDetector::new(state.queue.table(), config.core.stage_timeouts.clone(), config.core.stuck_scan_interval);
    tokio::spawn(async move {
        stuck_detector.run().await;
    });

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse().expect("invalid bind address");
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.unwrap();

    info!("server shutdown complete");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    info!("received shutdown signal");
}
