//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, without the root `ips-run` entry point.
//!
//! ## Intended use
//! Development and debugging of the REST surface and its OpenAPI/Swagger UI.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, run_config_from_env, AppState};
use ips_core::SuiteService;

/// Main entry point for the IPS REST API server.
///
/// # Environment Variables
/// - `IPS_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `IPS_CONFIG`, `IPS_SERVER_URL`, `IPS_VALIDATOR_URL`: see [`run_config_from_env`]
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the run configuration is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("IPS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let service = SuiteService::new(run_config_from_env()?)?;

    tracing::info!("-- Starting IPS REST API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(AppState::new(service))).await?;

    Ok(())
}
