// KomplekIn Backend entry point

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use komplekin_backend::{api_router, app_config, initialize_app_state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&app_config::config().server.rust_log)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = app_config::config();
    tracing::info!(
        environment = %config.server.environment,
        "Starting KomplekIn backend"
    );

    let state = initialize_app_state()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize application state: {}", e))?;

    let app = api_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!("Listening on {}", config.server.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
