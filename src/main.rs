use api_rest::{AppState, router};
use api_shared::HealthService;
use saude_core::Backend;
use saude_core::config::core_config_from_env_values;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Saúde application
///
/// Resolves configuration once from the environment, opens the configured document store and
/// serves the REST API until interrupted with Ctrl-C.
///
/// # Environment Variables
/// - `SAUDE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `SAUDE_STORE`: `files` (default) or `memory`
/// - `SAUDE_DATA_DIR`: Directory for the files store (default: "saude_data")
/// - `SAUDE_THEME`: `light` (default) or `dark`
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, store setup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("saude=info".parse()?)
                .add_directive("saude_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("SAUDE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = core_config_from_env_values(
        std::env::var("SAUDE_DATA_DIR").ok(),
        std::env::var("SAUDE_STORE").ok(),
        std::env::var("SAUDE_THEME").ok(),
    )?;
    let backend = Backend::from_config(&cfg)?;

    tracing::info!("{}", HealthService::check_health().message);
    tracing::info!("++ Starting Saúde REST on {}", rest_addr);

    let app = router(AppState { backend });
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Saúde REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
