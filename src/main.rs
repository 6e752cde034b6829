use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pronunciation_backend::config::Config;
use pronunciation_backend::routes;
use pronunciation_backend::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pronunciation_backend=debug,tower_http=debug")),
        )
        .init();

    let config = Config::load(None)?;
    info!("Loaded configuration: {:?}", config);

    let temp_root = config.system_config.temp_root();
    std::fs::create_dir_all(&temp_root)?;
    info!("Upload workspaces under {}", temp_root.display());

    let app_state = AppState::new(config.clone())?;
    if app_state.normalizer.is_available() {
        info!("ffmpeg found; non-WAV uploads will be converted");
    } else {
        warn!("ffmpeg not found; only WAV uploads can be assessed");
    }

    let app = routes::build_app(app_state);

    let host = config.system_config.host.as_str();
    let port = config.system_config.port;
    info!("Starting server on {}:{}", host, port);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
