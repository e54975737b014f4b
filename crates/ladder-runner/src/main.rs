//! Ladder game runner: hot-seat play against bots, or bulk bot simulations.

use anyhow::Context;
use ladder_core::GameConfig;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod host;
mod protocol;
mod table;

use host::HostState;
use protocol::SeatSpec;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mode = std::env::var("LADDER_MODE").unwrap_or_else(|_| "play".into());
    let json = std::env::var("LADDER_OUTPUT").map_or(false, |v| v == "json");

    let mut config = match std::env::var("LADDER_CONFIG") {
        Ok(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path))?;
            GameConfig::from_json(&text).with_context(|| format!("parsing config {}", path))?
        }
        Err(_) => GameConfig::default(),
    };
    if let Ok(seed) = std::env::var("LADDER_SEED") {
        config.seed = Some(seed.parse().context("LADDER_SEED must be a number")?);
    }

    let host = Arc::new(HostState::new());

    match mode.as_str() {
        "simulate" => {
            let seats = SeatSpec::parse_list(
                &std::env::var("LADDER_PLAYERS").unwrap_or_else(|_| "bot:A,bot:B,bot:C,bot:D".into()),
            )?;
            let games: u32 = std::env::var("LADDER_GAMES")
                .unwrap_or_else(|_| "100".into())
                .parse()
                .context("LADDER_GAMES must be a number")?;

            info!(games, seats = seats.len(), "running simulations");
            let summaries = host::run_simulations(host, seats, config, games).await?;
            for summary in &summaries {
                println!("{}", serde_json::to_string(summary)?);
            }

            let finished = summaries.iter().filter(|s| s.finished).count();
            let turns: u32 = summaries.iter().map(|s| s.turns).sum();
            eprintln!(
                "{} of {} games finished, {:.1} turns on average",
                finished,
                summaries.len(),
                turns as f64 / summaries.len().max(1) as f64
            );
            Ok(())
        }
        "play" => {
            let seats = SeatSpec::parse_list(
                &std::env::var("LADDER_PLAYERS").unwrap_or_else(|_| "Player,bot:Bot".into()),
            )?;
            info!(seats = seats.len(), "starting interactive table");
            host::run_interactive(host, seats, config, json).await
        }
        other => anyhow::bail!("unknown LADDER_MODE `{}` (expected play or simulate)", other),
    }
}
