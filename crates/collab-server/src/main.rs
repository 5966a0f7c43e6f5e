use std::sync::Arc;

use collab_server::{app::AppState, config::ServerConfig, eviction, hub::Hub, websocket};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config_path = std::env::var("COLLAB_CONFIG").unwrap_or_else(|_| "collab.toml".to_string());
    let config = ServerConfig::load(config_path)?;

    let state = AppState::open(&config)?;
    let hub = Arc::new(Hub::new());

    tokio::spawn(eviction::run(state.clone(), config.clone()));

    websocket::serve(state, hub, &config.bind_address).await
}
