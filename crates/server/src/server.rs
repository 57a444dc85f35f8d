//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration (webhook, health, metrics)
//! - Middleware stack (request ids, logging, panics, CORS, timeouts)
//! - Background idempotency sweeper
//! - Graceful shutdown handling

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::middleware::{log_requests, request_id};
use crate::routes::{api_info, health, not_found, webhook};
use crate::state::ServerState;
use crate::telemetry::{install_prometheus, PrometheusPipelineMetrics};
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use leadflow::{set_pipeline_metrics, spawn_sweeper, LeadPipeline, PipelineConfig};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// Middleware stack (outermost first):
/// 1. Tracing
/// 2. Request ID tracking
/// 3. Request logging
/// 4. Panic to `500 {"error":"Internal server error"}`
/// 5. CORS
/// 6. Compression
/// 7. Timeout
/// 8. Body size limit
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin)
    } else {
        CorsLayer::new()
    };

    let webhook_route =
        post(webhook::receive_webhook).fallback(webhook::method_not_allowed);

    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .route(&state.config.webhook_path, webhook_route)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.timeout(),
        ))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "handler panicked".to_string());
    ServerError::Internal(detail).into_response()
}

/// Install the JSON tracing subscriber. A second call is a no-op.
pub fn init_tracing(log_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .try_init();
}

/// Build the webhook pipeline described by `config`.
pub fn build_pipeline(config: &ServerConfig) -> anyhow::Result<LeadPipeline> {
    let pipeline_config = match &config.pipeline_config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    let store = config.backend_config()?.build()?;
    Ok(LeadPipeline::with_store(store, pipeline_config))
}

/// Start the leadflow HTTP server
///
/// Blocks until SIGTERM or Ctrl+C, then drains in-flight requests and
/// stops the idempotency sweeper.
///
/// # Example
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    init_tracing(&config.log_level);
    config.validate()?;

    let pipeline = build_pipeline(&config)?;
    let sweep_interval = pipeline.config().idempotency.sweep_interval();

    let mut state = ServerState::new(config.clone(), pipeline.clone());
    if config.metrics_enabled {
        state = state.with_metrics(install_prometheus()?);
        set_pipeline_metrics(Some(Arc::new(PrometheusPipelineMetrics)));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_sweeper(pipeline.cache().clone(), sweep_interval, shutdown_rx);

    let app = build_router(Arc::new(state));
    let addr: SocketAddr = config.socket_addr()?;

    tracing::info!(
        addr = %addr,
        webhook_path = %config.webhook_path,
        store = pipeline.store().name(),
        retention_secs = pipeline.config().idempotency.retention_secs,
        sweep_interval_secs = sweep_interval.as_secs(),
        cors = config.enable_cors,
        metrics = config.metrics_enabled,
        "server_starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    match sweeper.await {
        Ok(removed_total) => tracing::info!(removed_total, "server_shutdown_complete"),
        Err(err) => tracing::warn!(error = %err, "idempotency_sweeper_join_failed"),
    }
    set_pipeline_metrics(None);
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received_ctrl_c"),
        _ = terminate => tracing::info!("received_sigterm"),
    }
}
