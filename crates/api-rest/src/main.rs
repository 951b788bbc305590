//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging. The workspace's main `saude-run` binary serves the same
//! router.

use api_rest::{router, AppState};
use saude_core::config::core_config_from_env_values;
use saude_core::Backend;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Saúde REST API server
///
/// # Environment Variables
/// - `SAUDE_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `SAUDE_STORE`: `files` (default) or `memory`
/// - `SAUDE_DATA_DIR`: Directory for the files store (default: "saude_data")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the store cannot be opened,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("saude_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("SAUDE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = core_config_from_env_values(
        std::env::var("SAUDE_DATA_DIR").ok(),
        std::env::var("SAUDE_STORE").ok(),
        std::env::var("SAUDE_THEME").ok(),
    )?;
    let backend = Backend::from_config(&cfg)?;

    tracing::info!("-- Starting Saúde REST API on {}", addr);

    let app = router(AppState { backend });
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
