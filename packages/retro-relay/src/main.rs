use std::path::PathBuf;

use retro_relay::config::{default_config_path, load_config};
use retro_relay::server::spawn_server;
use retro_relay::state::AppState;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let config = load_config(&config_path);
    let state = AppState::new(&config);

    if let Err(e) = spawn_server(state).await {
        log::error!("[retro.relay] {}", e);
        std::process::exit(1);
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("[retro.relay] Failed to listen for shutdown signal: {}", e);
    }
    log::info!("[retro.relay] Shutting down");
}
