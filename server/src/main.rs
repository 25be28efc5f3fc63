//! Arena Server
//!
//! Authoritative UDP server for arena runs. One session per client.

use log::{error, info};

use arena_server::config::ServerConfig;
use arena_server::network::Server;
use arena_server::world::ZoneManager;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    info!("Starting Arena Server...");
    info!("Tick rate: {} Hz", config.tick_rate);
    info!("Session limit: {} ticks", config.max_session_ticks);

    let zones = ZoneManager::load_or_default(&config.zones_path);
    info!("Zones available: {:?}", zones.get_zone_ids());

    let mut server = match Server::new(config, zones).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return;
        }
    };

    info!("Server started successfully!");

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;

    info!("Server stopped");
}
