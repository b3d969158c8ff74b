use anyhow::{Context, Error, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

mod config;
mod db;
mod error;
mod metrics;
mod server;
mod shutdown;
mod signal;
mod singleton;
mod telemetry;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// path to the config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    // load config from path
    let config = config::Config::load(args.config)?;

    let mut providers = shutdown::ProviderRegistry::new();

    // exporters only run when a collector endpoint is configured
    let otel_layer = match &config.otel {
        Some(otel) => {
            let tracer = telemetry::init_tracer_provider(&otel.endpoint, &config.service.name)?;
            let meter_provider =
                telemetry::init_meter_provider(&otel.endpoint, &config.service.name)?;
            providers.register("tracer", telemetry::shutdown_tracer_provider);
            providers.register("metrics", move || {
                telemetry::shutdown_meter_provider(meter_provider)
            });
            Some(OpenTelemetryLayer::new(tracer))
        }
        None => None,
    };

    // init tracing
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(config.log_level()))
        .with(otel_layer)
        .try_init();

    let telemetry = Arc::new(telemetry::Telemetry::new(config.service.name.clone()));
    let metrics = metrics::Metrics::new();
    let store: db::DynUserStorer = Arc::new(db::InMemory::new(metrics.clone()));
    let server = server::Server::new(config.server.addr.clone(), metrics, store, telemetry);

    let coordinator = signal::ShutdownCoordinator::new();

    // start server
    let server_token = coordinator.subscribe();
    let server_handle = tokio::spawn({
        let token = server_token.clone();
        async move {
            server.serve(token).await;
        }
    });
    // the op stops the accept loop itself, so it stays self-contained
    providers.register("http", move || async move {
        server_token.cancel();
        server_handle.await.context("http server task failed")?;
        Ok(())
    });

    signal::wait_for_shutdown_signal().await;

    info!("start graceful shutdown");
    coordinator.trigger();

    shutdown::ShutdownOrchestrator::new(config.shutdown_timeout())
        .run(providers)
        .await;

    Ok(())
}
