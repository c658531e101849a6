use clap::Parser;
use std::time::Duration;

use crate::live_scores::DEFAULT_SCOREBOARD_URL;
use crate::picks::EngineSettings;

/// Spread pick locker and settlement ledger
#[derive(Parser, Debug, Clone)]
#[command(name = "pick-ledger", version, about)]
pub struct Config {
    /// SQLite ledger path
    #[arg(long, env = "DATABASE_PATH", default_value = "picks.db")]
    pub database_path: String,

    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// Published schedule sheet (CSV export URL)
    #[arg(long, env = "SCHEDULE_URL")]
    pub schedule_url: String,

    /// Live scoreboard URL
    #[arg(long, env = "SCOREBOARD_URL", default_value = DEFAULT_SCOREBOARD_URL)]
    pub scoreboard_url: String,

    /// Scoreboard conference group filter
    #[arg(long, env = "SCOREBOARD_GROUPS", default_value = "50")]
    pub scoreboard_groups: String,

    /// Maximum events requested from the scoreboard
    #[arg(long, env = "SCOREBOARD_LIMIT", default_value = "100")]
    pub scoreboard_limit: u32,

    /// Per-feed fetch timeout in seconds
    #[arg(long, env = "FEED_TIMEOUT_SECS", default_value = "5")]
    pub feed_timeout_secs: u64,

    /// Seconds between reconciliation cycles
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "60")]
    pub poll_interval_secs: u64,

    /// Minimum edge (points) for a pick to count as a value play
    #[arg(long, env = "VALUE_THRESHOLD", default_value = "1.5")]
    pub value_threshold: f64,

    /// Number of legs in the suggested parlay
    #[arg(long, env = "PARLAY_SIZE", default_value = "3")]
    pub parlay_size: usize,

    /// Units risked per unit won (1.1 = standard -110)
    #[arg(long, env = "JUICE", default_value = "1.1")]
    pub juice: f64,

    /// Extra words stripped from team names before matching
    #[arg(long = "strip-affix", env = "STRIP_AFFIXES", value_delimiter = ',')]
    pub strip_affixes: Vec<String>,

    /// Run one cycle, print the board as JSON and exit
    #[arg(long, env = "RUN_ONCE", default_value = "false")]
    pub once: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if url::Url::parse(&self.schedule_url).is_err() {
            anyhow::bail!("schedule_url is not a valid URL: {}", self.schedule_url);
        }
        if self.feed_timeout_secs == 0 {
            anyhow::bail!("feed_timeout_secs must be positive");
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be positive");
        }
        if !self.value_threshold.is_finite() || self.value_threshold < 0.0 {
            anyhow::bail!("value_threshold must be zero or positive");
        }
        if self.parlay_size == 0 {
            anyhow::bail!("parlay_size must be at least 1");
        }
        if !self.juice.is_finite() || self.juice <= 0.0 {
            anyhow::bail!("juice must be positive");
        }
        Ok(())
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            value_threshold: self.value_threshold,
            parlay_size: self.parlay_size,
            juice: self.juice,
            feed_timeout: self.feed_timeout(),
        }
    }
}
