//! Observability module for centralized metrics, tracing, and logging setup.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - Metrics collection and Prometheus export
//! - Liveness/readiness endpoints served next to `/metrics`
//! - Span helpers and metric recorders for the order pipeline

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tracing_subscriber::prelude::*;

use crate::observability_config::ObservabilityConfig;

/// Readiness flag flipped once the bot has verified its token
#[derive(Debug, Default)]
pub struct HealthState {
    ready: AtomicBool,
}

impl HealthState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Initialize the complete observability stack with custom configuration
pub async fn init_observability_with_config(
    config: &ObservabilityConfig,
    metrics_port: u16,
    health: Arc<HealthState>,
) -> Result<()> {
    init_logging(config)?;
    start_metrics_export(config, metrics_port, health).await?;

    tracing::info!(
        environment = %config.environment,
        metrics_port = %metrics_port,
        metrics_enabled = %config.enable_metrics_export,
        "Observability stack initialized successfully"
    );
    Ok(())
}

/// Validate the logging settings and install the global subscriber.
///
/// `main` calls this before loading the application configuration, so
/// configuration errors reach the log output.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;
    init_tracing_with_config(config)
}

/// Install the Prometheus recorder and serve `/metrics` and the health routes
pub async fn start_metrics_export(
    config: &ObservabilityConfig,
    metrics_port: u16,
    health: Arc<HealthState>,
) -> Result<()> {
    if config.enable_metrics_export {
        let metrics_handle = init_metrics_with_config(config)?;
        start_metrics_server(metrics_handle, metrics_port, health).await?;
    } else {
        tracing::info!("Metrics export disabled, skipping Prometheus recorder");
    }
    Ok(())
}

/// Initialize structured logging with tracing and configuration
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("catalog_order_bot={}", config.log_level.to_lowercase()).parse()?)
        .add_directive("teloxide=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    if config.use_pretty_logs() {
        // Pretty formatting for development
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?;
    } else {
        // JSON formatting for production (default)
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Initialize metrics collection with Prometheus exporter and configuration
pub fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();
    let handle = builder.install_recorder()?;

    tracing::info!(
        metrics_enabled = %config.enable_metrics_export,
        "Metrics collection initialized"
    );
    Ok(handle)
}

async fn start_metrics_server(
    metrics_handle: PrometheusHandle,
    port: u16,
    health: Arc<HealthState>,
) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on {}", addr);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let metrics_handle = metrics_handle.clone();
                    let health = Arc::clone(&health);

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = hyper::service::service_fn(
                            move |req: hyper::Request<hyper::body::Incoming>| {
                                let metrics_handle = metrics_handle.clone();
                                let health = Arc::clone(&health);
                                async move {
                                    let (status, body) = route_health_request(
                                        req.method(),
                                        req.uri().path(),
                                        &metrics_handle,
                                        &health,
                                    );
                                    let mut response = hyper::Response::new(body);
                                    *response.status_mut() = status;
                                    Ok::<_, std::convert::Infallible>(response)
                                }
                            },
                        );

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            tracing::error!("Error serving connection: {:?}", err);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Error accepting connection: {}", e);
                }
            }
        }
    });

    Ok(())
}

fn route_health_request(
    method: &hyper::Method,
    path: &str,
    metrics_handle: &PrometheusHandle,
    health: &HealthState,
) -> (hyper::StatusCode, String) {
    match (method, path) {
        (&hyper::Method::GET, "/metrics") => (hyper::StatusCode::OK, metrics_handle.render()),
        (&hyper::Method::GET, "/health/live") => (hyper::StatusCode::OK, "OK".to_string()),
        (&hyper::Method::GET, "/health/ready") => readiness_response(health),
        _ => (hyper::StatusCode::NOT_FOUND, "Not Found".to_string()),
    }
}

/// Readiness probe body: ready once the bot token has been verified
pub fn readiness_response(health: &HealthState) -> (hyper::StatusCode, String) {
    if health.is_ready() {
        (hyper::StatusCode::OK, "OK".to_string())
    } else {
        (
            hyper::StatusCode::SERVICE_UNAVAILABLE,
            "NOT READY: bot not connected".to_string(),
        )
    }
}

/// Create a span for Telegram bot operations
pub fn telegram_span(operation: &str, user_id: Option<u64>) -> tracing::Span {
    tracing::info_span!(
        "telegram_operation",
        operation = operation,
        user_id = user_id,
        component = "telegram"
    )
}

/// Create a span for one order, from payload to acknowledgement
pub fn order_span(source: &str, chat_id: i64) -> tracing::Span {
    tracing::info_span!(
        "order_processing",
        source = source,
        chat_id = chat_id,
        component = "order"
    )
}

/// Create a span for one fan-out
pub fn delivery_span(target_count: usize, item_count: usize) -> tracing::Span {
    tracing::info_span!(
        "order_delivery",
        target_count = target_count,
        item_count = item_count,
        component = "delivery"
    )
}

/// Record Telegram message processing metrics
pub fn record_telegram_message(message_type: &str) {
    let message_type = message_type.to_string();
    metrics::counter!("telegram_messages_total", "type" => message_type).increment(1);
}

/// Record an incoming order payload and whether it was accepted
pub fn record_order_received(accepted: bool, item_count: usize) {
    metrics::counter!(
        "orders_received_total",
        "result" => if accepted { "accepted" } else { "invalid" }
    )
    .increment(1);
    if accepted {
        metrics::histogram!("order_item_count").record(item_count as f64);
    }
}

/// Record the effective total of an accepted order
pub fn record_order_total(total: u64) {
    metrics::histogram!("order_total_amount").record(total as f64);
}

/// Record one send attempt of the fan-out
pub fn record_delivery_attempt(target_kind: &str, success: bool, duration: Duration) {
    let target_kind = target_kind.to_string();
    metrics::counter!(
        "order_delivery_attempts_total",
        "target" => target_kind,
        "result" => if success { "success" } else { "failure" }
    )
    .increment(1);
    metrics::histogram!("order_delivery_duration_seconds").record(duration.as_secs_f64());
}

/// Record the aggregate result of a fan-out
pub fn record_fanout_outcome(attempted: usize, failed: usize) {
    let outcome = if failed == 0 { "complete" } else { "degraded" };
    metrics::counter!("order_fanouts_total", "outcome" => outcome).increment(1);
    metrics::gauge!("order_fanout_last_failed_targets").set(failed as f64);
    metrics::histogram!("order_fanout_targets").record(attempted as f64);
}

/// Record a failure reported by the update listener
pub fn record_transport_error(kind: &str) {
    let kind = kind.to_string();
    metrics::counter!("telegram_transport_errors_total", "kind" => kind).increment(1);
}
