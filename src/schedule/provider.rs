use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::ScheduledEvent;

/// Source of upcoming matchups with projection inputs and a market line.
#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    async fn fetch_schedule(&self) -> Result<Vec<ScheduledEvent>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
