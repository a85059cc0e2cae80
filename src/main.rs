//! Room server (default binary).
//!
//! Runs the TCP adapter on a background tokio runtime and drives every room
//! from a fixed-tick game loop on the main thread.

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use blockrooms::adapter::Adapter;
use blockrooms::engine::{GameConfig, Registry};
use blockrooms::gateway::Gateway;
use blockrooms::types::TICK_MS;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let game_config = GameConfig::from_env();
    info!(seed = game_config.seed, "starting room server");

    let mut adapter = Adapter::start_from_env()?;
    info!(addr = %adapter.local_addr(), "accepting clients");

    let mut gateway = Gateway::new(Registry::new(game_config));
    run(&mut adapter, &mut gateway);
    Ok(())
}

fn run(adapter: &mut Adapter, gateway: &mut Gateway) {
    let started = Instant::now();
    let tick_duration = Duration::from_millis(TICK_MS as u64);

    loop {
        let tick_start = Instant::now();
        let now_ms = started.elapsed().as_millis() as u64;

        while let Some(inbound) = adapter.try_recv() {
            for msg in gateway.handle(inbound, now_ms) {
                adapter.send(msg);
            }
        }

        for msg in gateway.tick(now_ms) {
            adapter.send(msg);
        }

        if let Some(rest) = tick_duration.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }
}
