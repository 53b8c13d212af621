use anyhow::Result;
use launch_bridge_server::{Settings, build_app};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter()));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init(),
        "compact" => tracing_subscriber::fmt()
            .compact()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        _ => tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config_path = Settings::config_path();
    let settings = Settings::load_from(&config_path)?;
    init_tracing(&settings);

    if config_path.exists() {
        info!("Loaded configuration from {}", config_path.display());
    } else {
        debug!(
            "No config file found at {}, using defaults and environment",
            config_path.display()
        );
    }

    let app = build_app(&settings)?;

    let addr = settings.socket_addr();
    info!(
        provider = %settings.provider.kind,
        callback = %settings.routes.callback_path,
        "Launch bridge listening on http://{}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
