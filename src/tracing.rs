//! Tracing setup: console logs, in-memory log buffer, optional OTLP export
//!
//! # Architecture
//!
//! ```text
//! tracing events ─┬→ fmt layer (stdout)
//!                 ├→ LogBufferLayer → GET /api/logs
//!                 └→ OTLP (gRPC) → collector → Tempo   (only when an endpoint is configured)
//! ```

use std::sync::Arc;

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::logbuf::{LogBuffer, LogBufferLayer};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,spawngate=debug";

/// Initialize the tracing subsystem
///
/// Spans are exported over OTLP only when `otlp_endpoint` is given. Every
/// event at DEBUG or above is also copied into `log_buffer`.
///
/// # Example
/// ```ignore
/// let logs = Arc::new(LogBuffer::new(1000));
/// init_tracing("spawngate", None, logs.clone())?;
/// ```
pub fn init_tracing(
    service_name: &str,
    otlp_endpoint: Option<&str>,
    log_buffer: Arc<LogBuffer>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let otel_layer = match otlp_endpoint {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint);

            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(exporter)
                .with_trace_config(sdktrace::Config::default().with_resource(Resource::new(
                    vec![
                        KeyValue::new("service.name", service_name.to_string()),
                        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    ],
                )))
                .install_batch(runtime::Tokio)?;

            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(LogBufferLayer::new(log_buffer))
        .with(otel_layer)
        .try_init()?;

    tracing::info!(
        service = service_name,
        otlp = otlp_endpoint.unwrap_or("disabled"),
        "Tracing initialized"
    );

    Ok(())
}

/// Flush pending spans to the collector
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
    tracing::info!("Tracing shutdown complete");
}
