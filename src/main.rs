use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;

mod config;
mod dashboard;
mod db;
mod live_scores;
mod picks;
mod schedule;

use config::Config;
use dashboard::AppState;
use db::SqliteLedger;
use live_scores::EspnScoreboard;
use picks::matcher::ContainmentMatcher;
use picks::normalize::Normalizer;
use picks::projection::RatingModel;
use picks::ReconcileEngine;
use schedule::SheetSchedule;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let ledger = SqliteLedger::open(&config.database_path)?;
    info!("Ledger opened: {}", config.database_path);

    let scores = EspnScoreboard::new(
        &config.scoreboard_url,
        &config.scoreboard_groups,
        config.scoreboard_limit,
        config.feed_timeout(),
    )?;
    let sheet = SheetSchedule::new(&config.schedule_url, config.feed_timeout())?;

    let normalizer = Normalizer::default().with_extra(&config.strip_affixes);
    if !config.strip_affixes.is_empty() {
        info!("Extra name affixes: {}", config.strip_affixes.join(", "));
    }

    let engine = Arc::new(
        ReconcileEngine::new(
            Arc::new(ledger),
            Arc::new(sheet),
            Arc::new(scores),
            config.engine_settings(),
        )
        .with_projector(Arc::new(RatingModel::default()))
        .with_matcher(Arc::new(ContainmentMatcher::new(normalizer))),
    );

    if config.once {
        let board = engine.run_cycle().await;
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }

    // Reconciliation loop in its own task
    let cycle_engine = engine.clone();
    let poll_interval = Duration::from_secs(config.poll_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            cycle_engine.run_cycle().await;
        }
    });

    let app = dashboard::router(AppState { engine });
    let addr: SocketAddr = config
        .dashboard_addr
        .parse()
        .with_context(|| format!("Invalid dashboard address {}", config.dashboard_addr))?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Run dashboard server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
