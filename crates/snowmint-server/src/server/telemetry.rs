//! # Telemetry
//!
//! Console logging through `tracing-subscriber` is always on; the level is
//! taken from `RUST_LOG` and defaults to `info`.
//!
//! OpenTelemetry export is opt-in through cargo features:
//!
//! - `otel-tracing`: export spans (per request, per issue, per mint).
//! - `otel-metrics`: export counters and histograms for issuance.
//! - `otel-stdout`: print exported telemetry to stdout.
//! - `otel-otlp`: ship exported telemetry over OTLP/gRPC to
//!   `OTEL_EXPORTER_OTLP_ENDPOINT` (default `http://localhost:4317`).
//!
//! Exporters require at least one of `otel-tracing` or `otel-metrics`, and
//! both exporters may be enabled together.
//!
//! ```bash
//! cargo run -p snowmint-server --features otel-tracing,otel-metrics,otel-otlp
//! ```

#[cfg(all(
    feature = "otel-otlp",
    not(any(feature = "otel-tracing", feature = "otel-metrics"))
))]
compile_error!(
    "The 'otel-otlp' feature requires at least one of 'otel-tracing' or 'otel-metrics' to be enabled."
);

#[cfg(all(
    feature = "otel-stdout",
    not(any(feature = "otel-tracing", feature = "otel-metrics"))
))]
compile_error!(
    "The 'otel-stdout' feature requires at least one of 'otel-tracing' or 'otel-metrics' to be enabled."
);

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(all(
    feature = "otel-otlp",
    any(feature = "otel-metrics", feature = "otel-tracing")
))]
use opentelemetry_otlp::{Protocol, WithExportConfig};

#[cfg(feature = "otel-metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter};
#[cfg(feature = "otel-metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "otel-metrics")]
use std::sync::OnceLock;

#[cfg(any(feature = "otel-metrics", feature = "otel-tracing"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "otel-metrics", feature = "otel-tracing"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "otel-metrics", feature = "otel-tracing"))]
use opentelemetry_semantic_conventions as semvcns;

#[cfg(feature = "otel-tracing")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "otel-tracing")]
use opentelemetry_sdk::propagation::TraceContextPropagator;
#[cfg(feature = "otel-tracing")]
use opentelemetry_sdk::trace as sdktrace;

const SERVICE_NAME: &str = "snowmint";

pub struct TelemetryProviders {
    #[cfg(feature = "otel-tracing")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "otel-metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down every exporter. Failures are printed rather
    /// than logged since the subscriber may already be gone.
    pub fn shutdown(self) {
        #[cfg(feature = "otel-tracing")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {err:#?}");
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {err:#?}");
            }
        }

        #[cfg(feature = "otel-metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "otel-tracing")]
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    #[cfg(feature = "otel-tracing")]
    let tracer_provider = init_tracer()?;

    #[cfg(feature = "otel-metrics")]
    let meter_provider = init_metrics()?;

    #[cfg(any(feature = "otel-metrics", feature = "otel-tracing"))]
    let scope = InstrumentationScope::builder(SERVICE_NAME)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339()),
        );

    #[cfg(feature = "otel-tracing")]
    let registry = {
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "otel-metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(meter);

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "otel-tracing")]
        tracer_provider,
        #[cfg(feature = "otel-metrics")]
        meter_provider,
    })
}

#[cfg(all(
    feature = "otel-otlp",
    any(feature = "otel-metrics", feature = "otel-tracing")
))]
fn otlp_endpoint() -> String {
    std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string())
}

#[cfg(any(feature = "otel-metrics", feature = "otel-tracing"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "otel-metrics")]
fn init_metrics() -> anyhow::Result<sdkmetrics::SdkMeterProvider> {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "otel-stdout")]
    let builder = {
        let exporter = opentelemetry_stdout::MetricExporter::default();
        let reader = sdkmetrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();
        builder.with_reader(reader)
    };

    #[cfg(feature = "otel-otlp")]
    let builder = {
        use anyhow::Context;

        let exporter = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_timeout(std::time::Duration::from_secs(10))
            .with_endpoint(otlp_endpoint())
            .with_protocol(Protocol::Grpc)
            .build()
            .context("failed to build metrics exporter")?;

        builder.with_periodic_exporter(exporter)
    };

    Ok(builder.build())
}

#[cfg(feature = "otel-tracing")]
fn init_tracer() -> anyhow::Result<sdktrace::SdkTracerProvider> {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "otel-stdout")]
    let builder = {
        let exporter = opentelemetry_stdout::SpanExporter::default();
        let batch = sdktrace::BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                sdktrace::BatchConfigBuilder::default()
                    .with_scheduled_delay(std::time::Duration::from_secs(5))
                    .with_max_queue_size(2048)
                    .build(),
            )
            .build();
        builder.with_span_processor(batch)
    };

    #[cfg(feature = "otel-otlp")]
    let builder = {
        use anyhow::Context;

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_timeout(std::time::Duration::from_secs(10))
            .with_endpoint(otlp_endpoint())
            .with_protocol(Protocol::Grpc)
            .build()
            .context("failed to build tracer exporter")?;

        let batch = sdktrace::BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                sdktrace::BatchConfigBuilder::default()
                    .with_scheduled_delay(std::time::Duration::from_secs(5))
                    .with_max_queue_size(2048)
                    .build(),
            )
            .build();
        builder.with_span_processor(batch)
    };

    Ok(builder.build())
}

#[cfg(feature = "otel-metrics")]
static REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "otel-metrics")]
static ISSUANCE_ERRORS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "otel-metrics")]
static REQUEST_DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();
#[cfg(feature = "otel-metrics")]
static IDS_ISSUED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "otel-metrics")]
static IDS_PER_REQUEST: OnceLock<Histogram<f64>> = OnceLock::new();

#[cfg(feature = "otel-metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = REQUESTS.set(
        meter
            .u64_counter("requests")
            .with_description("Total ID requests")
            .build(),
    );

    let _ = ISSUANCE_ERRORS.set(
        meter
            .u64_counter("issuance_errors")
            .with_description("Requests that exhausted their retry budget")
            .build(),
    );

    let _ = REQUEST_DURATION_MS.set(
        meter
            .f64_histogram("request_duration")
            .with_unit("ms")
            .with_description("Time spent issuing IDs per request")
            .build(),
    );

    let _ = IDS_ISSUED.set(
        meter
            .u64_counter("ids_issued")
            .with_description("Total Snowflake IDs issued")
            .build(),
    );

    let _ = IDS_PER_REQUEST.set(
        meter
            .f64_histogram("ids_per_request")
            .with_description("IDs issued per successful request")
            .build(),
    );
}

// Each helper compiles to a no-op when metrics are disabled.
#[cfg(feature = "otel-metrics")]
pub fn increment_requests() {
    if let Some(counter) = REQUESTS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "otel-metrics"))]
pub fn increment_requests() {}

#[cfg(feature = "otel-metrics")]
pub fn increment_issuance_errors() {
    if let Some(counter) = ISSUANCE_ERRORS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "otel-metrics"))]
pub fn increment_issuance_errors() {}

#[cfg(feature = "otel-metrics")]
pub fn record_request_duration(duration_ms: f64) {
    if let Some(histogram) = REQUEST_DURATION_MS.get() {
        histogram.record(duration_ms, &[]);
    }
}

#[cfg(not(feature = "otel-metrics"))]
pub fn record_request_duration(_duration_ms: f64) {}

#[cfg(feature = "otel-metrics")]
pub fn record_ids_issued(count: usize) {
    if let Some(counter) = IDS_ISSUED.get() {
        counter.add(count as u64, &[]);
    }
    if let Some(histogram) = IDS_PER_REQUEST.get() {
        histogram.record(count as f64, &[]);
    }
}

#[cfg(not(feature = "otel-metrics"))]
pub fn record_ids_issued(_count: usize) {}
