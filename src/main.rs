use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Json, Router};
use clap::Parser;
use serde_json::{json, Value};
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber;

use guardrail::config::GuardrailConfig;
use guardrail::http::{ip_rate_limit, HttpServer, RateLimitState};
use guardrail::ratelimit::{LimiterRegistry, TrustedSources};

/// Request rate limiting and abuse-control service.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let cli = Cli::parse();

    info!("Starting Guardrail Abuse-Control Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = GuardrailConfig::load(cli.config.as_deref())?;
    info!(listen_addr = %config.server.listen_addr, "Configuration loaded");

    // Wire the standing tier engines and the trust gate
    let registry = Arc::new(LimiterRegistry::new(&config.rate_limiting));
    let trusted = Arc::new(TrustedSources::with_sources(
        config.rate_limiting.trusted_sources.iter().cloned(),
    ));
    let state = RateLimitState::new(registry, trusted);
    info!("Limiter registry initialized");

    let router = Router::new()
        .route("/api/status", get(status))
        .layer(middleware::from_fn_with_state(state, ip_rate_limit));

    let server = HttpServer::new(config.server.listen_addr, router);

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Guardrail Abuse-Control Service stopped");
    Ok(())
}

async fn status() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
