use anyhow::Result;
use tracing_subscriber::EnvFilter;
use zbus::connection;

use augtrack_core::Config as CoreConfig;

mod config;
mod dbus_interface;
mod engine;

use config::Config;
use dbus_interface::AugtrackService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("augtrackd starting");

    let config = Config::from_env();
    let core_config = match &config.core_config_path {
        Some(path) => CoreConfig::from_file(path)?,
        None => CoreConfig::default(),
    };

    let engine = engine::spawn_engine(
        &config.camera_device,
        &config.sift_model_path(),
        &config.mser_model_path(),
        core_config,
    )?;

    let service = AugtrackService { engine };
    let _connection = connection::Builder::system()?
        .name("org.freedesktop.Augtrack1")?
        .serve_at("/org/freedesktop/Augtrack1", service)?
        .build()
        .await?;

    tracing::info!("augtrackd ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("augtrackd shutting down");

    Ok(())
}
