//! Logging, optional OTLP trace export and the Prometheus scrape endpoint.

use crate::config::Config;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{self as sdktrace, Tracer};
use opentelemetry_sdk::{runtime, Resource};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "fieldesk=info";

/// Flushes pending spans on drop when trace export is enabled
pub struct ObservabilityGuard {
    exporting: bool,
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        if self.exporting {
            opentelemetry::global::shutdown_tracer_provider();
        }
    }
}

pub fn init(config: &Config) -> Result<ObservabilityGuard, Box<dyn std::error::Error>> {
    let tracer = otlp_tracer(config)?;
    let exporting = tracer.is_some();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(otel_layer)
        .try_init()?;

    if exporting {
        tracing::info!(
            endpoint = config.otel_exporter_endpoint.as_deref().unwrap_or_default(),
            "Exporting notification traces over OTLP"
        );
    }

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    } else {
        tracing::debug!("METRICS_PORT not set, metrics exporter disabled");
    }

    Ok(ObservabilityGuard { exporting })
}

/// Batch OTLP tracer tagged with the client's name and version
fn otlp_tracer(config: &Config) -> Result<Option<Tracer>, opentelemetry::trace::TraceError> {
    let Some(endpoint) = config.otel_exporter_endpoint.as_deref() else {
        return Ok(None);
    };

    let resource = Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        KeyValue::new("fieldesk.api_url", config.api_url.clone()),
    ]);

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(sdktrace::config().with_resource(resource))
        .install_batch(runtime::Tokio)?;

    Ok(Some(tracer))
}

fn install_prometheus(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;

    metrics::describe_counter!(
        "fieldesk_fetch_total",
        "Notification backend calls by endpoint and outcome"
    );
    metrics::describe_counter!(
        "fieldesk_cache_hits_total",
        "Page requests served from the TTL cache"
    );
    metrics::describe_counter!(
        "fieldesk_coalesced_total",
        "Requests that joined an in-flight fetch"
    );
    metrics::describe_counter!("fieldesk_poll_ticks_total", "Poll timer ticks");

    tracing::info!(port, "Prometheus exporter listening");
    Ok(())
}
