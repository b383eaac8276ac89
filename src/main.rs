//! API Gateway binary.
//!
//! Loads the configuration, starts the gateway and the request-log pipeline,
//! and stops both on SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::task::JoinError;
use tracing::{error, info};

use api_gateway::config::load_config;
use api_gateway::http::ServerError;
use api_gateway::lifecycle::{shutdown_signal, ShutdownError};
use api_gateway::observability::logging;
use api_gateway::observability::metrics::{GatewayMetrics, MetricsRegistry};
use api_gateway::observability::pipeline::{LogPipeline, PipelineConfig};
use api_gateway::observability::sink::TracingSink;
use api_gateway::Gateway;

#[derive(Parser)]
#[command(name = "api-gateway")]
#[command(about = "Static-route HTTP API gateway", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", cli.config.display(), e);
            return Err(e.into());
        }
    };

    logging::init(&config.logging)?;

    info!(
        config = %cli.config.display(),
        bind_address = %config.server.bind_address,
        routes = config.routes.len(),
        tls = config.server.tls.is_some(),
        "Configuration loaded"
    );

    let registry = Arc::new(MetricsRegistry::new()?);
    let metrics = Arc::new(GatewayMetrics::new(registry.clone())?);
    let pipeline = LogPipeline::spawn(PipelineConfig::from(&config.logging), TracingSink);

    let gateway = Arc::new(Gateway::new(
        &config,
        Arc::new(pipeline.handle()),
        metrics,
        registry,
    ));

    let mut server = tokio::spawn({
        let gateway = gateway.clone();
        async move { gateway.run().await }
    });

    info!("API Gateway starting");

    // Wait for a stop signal, or for the server to exit on its own (e.g. bind failure).
    let shutdown_result = tokio::select! {
        _ = shutdown_signal() => {
            let stopped = gateway.shutdown(config.server.shutdown_timeout()).await;
            if let Err(e) = &stopped {
                error!(error = %e, "Server forced to shutdown");
            }
            stopped.and(server_outcome(server.await))
        }
        joined = &mut server => {
            let outcome = server_outcome(joined);
            if let Err(e) = &outcome {
                error!(error = %e, "HTTP server stopped unexpectedly");
            }
            outcome
        }
    };

    let dropped = pipeline.dropped();
    if let Err(e) = pipeline.shutdown().await {
        error!(error = %e, "Request log pipeline did not stop cleanly");
    }
    if dropped > 0 {
        info!(dropped, "Request log entries were dropped under load");
    }
    info!("API Gateway stopped");

    shutdown_result.map_err(Into::into)
}

fn server_outcome(joined: Result<Result<(), ServerError>, JoinError>) -> Result<(), ShutdownError> {
    Ok(joined??)
}
