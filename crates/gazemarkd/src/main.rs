use anyhow::{Context, Result};
use gazemark_store::JsonFileStore;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod http_interface;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::Config::from_env();
    tracing::info!(
        dataset = %config.dataset_path.display(),
        strict_pupil_flags = config.strict_pupil_flags,
        "gazemarkd starting"
    );

    let engine = engine::spawn_engine(JsonFileStore::new(&config.dataset_path))?;
    let state = http_interface::AppState {
        engine,
        flag_mode: config.flag_mode(),
    };
    let app = http_interface::router(state, config.max_body_bytes);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "gazemarkd ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("gazemarkd shutting down");
    Ok(())
}
