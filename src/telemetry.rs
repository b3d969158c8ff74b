use std::time::Duration;

use anyhow::{Context, Result};
use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{BatchConfig, RandomIdGenerator, Sampler, Tracer};
use opentelemetry_sdk::{runtime, Resource};
use tracing::debug;

use crate::singleton::Lazy;

const METRICS_EXPORT_PERIOD: Duration = Duration::from_secs(10);

fn resource(service_name: &str) -> Resource {
    Resource::new(vec![KeyValue::new(
        "service.name",
        service_name.to_string(),
    )])
}

/// Installs the OTLP trace pipeline with a batch span processor and
/// returns its tracer for the tracing-opentelemetry layer.
pub fn init_tracer_provider(endpoint: &str, service_name: &str) -> Result<Tracer> {
    debug!(endpoint = endpoint, "install otlp trace pipeline");
    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource(service_name)),
        )
        .with_batch_config(BatchConfig::default())
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .install_batch(runtime::Tokio)
        .context("fail install otlp trace pipeline")?;
    Ok(tracer)
}

/// Installs the OTLP periodic-reader meter provider and registers it
/// globally. The returned provider must be shut down to flush.
pub fn init_meter_provider(endpoint: &str, service_name: &str) -> Result<SdkMeterProvider> {
    debug!(endpoint = endpoint, "install otlp metrics pipeline");
    let provider = opentelemetry_otlp::new_pipeline()
        .metrics(runtime::Tokio)
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_resource(resource(service_name))
        .with_period(METRICS_EXPORT_PERIOD)
        .build()
        .context("fail install otlp metrics pipeline")?;
    global::set_meter_provider(provider.clone());
    Ok(provider)
}

/// Flushes and tears down the trace exporter. Blocking under the hood,
/// so it runs off the async workers.
pub async fn shutdown_tracer_provider() -> Result<()> {
    tokio::task::spawn_blocking(global::shutdown_tracer_provider)
        .await
        .context("tracer provider shutdown task failed")?;
    Ok(())
}

/// Flushes and tears down the metrics exporter.
pub async fn shutdown_meter_provider(provider: SdkMeterProvider) -> Result<()> {
    tokio::task::spawn_blocking(move || provider.shutdown())
        .await
        .context("meter provider shutdown task failed")?
        .context("fail shutdown meter provider")?;
    Ok(())
}

/// Hands out the one tracer handle shared by all request paths.
///
/// The handle is built lazily on first use so it picks up whichever
/// tracer provider the composition root installed; every caller after
/// that sees the identical handle.
pub struct Telemetry {
    service_name: String,
    tracer: Lazy<BoxedTracer>,
}

impl Telemetry {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            tracer: Lazy::new(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn tracer(&self) -> &BoxedTracer {
        self.tracer
            .get_or_init(|| global::tracer(self.service_name.clone()))
    }
}
