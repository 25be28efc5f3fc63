//! Play one arena run in-process with the autopilot.
//!
//! Usage: arena-local [zone_id] [seed]

use log::{error, info};

use arena_server::config::ServerConfig;
use arena_server::session::run_local;
use arena_server::world::ZoneManager;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    let mut args = std::env::args().skip(1);
    let zone_id = match args.next().map(|a| a.parse::<u32>()) {
        None => config.default_zone,
        Some(Ok(id)) => id,
        Some(Err(e)) => {
            error!("Invalid zone id: {}", e);
            std::process::exit(2);
        }
    };
    let seed = match args.next().map(|a| a.parse::<u64>()) {
        None => None,
        Some(Ok(seed)) => Some(seed),
        Some(Err(e)) => {
            error!("Invalid seed: {}", e);
            std::process::exit(2);
        }
    };

    let zones = ZoneManager::load_or_default(&config.zones_path);
    info!("Running zone {} (seed {:?})", zone_id, seed);

    match run_local(&config, &zones, zone_id, seed).await {
        Ok(end) => {
            info!(
                "Result: {:?}, {} xp, {} gold, dropped {:?}, gathered {:?}",
                end.result, end.xp_gained, end.gold_gained, end.items_dropped, end.items_gathered
            );
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
