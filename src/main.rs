use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router, run_config_from_env};
use ips_core::SuiteService;

/// Main entry point for the IPS suite server
///
/// Loads `.env`, resolves the run configuration once and serves the REST API with its
/// OpenAPI/Swagger UI.
///
/// # Environment Variables
/// - `IPS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `IPS_CONFIG`: YAML run configuration file (optional)
/// - `IPS_SERVER_URL`: FHIR base URL of the server under test (optional)
/// - `IPS_VALIDATOR_URL`: validator service base URL (default: "http://localhost:4567")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("ips=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("IPS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let config = run_config_from_env()?;
    tracing::info!(
        "++ Validator at {}, server under test {}",
        config.validator_url(),
        config.server_url().unwrap_or("<per run>")
    );
    let service = SuiteService::new(config)?;

    tracing::info!("++ Starting IPS REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(AppState::new(service))).await?;

    Ok(())
}
