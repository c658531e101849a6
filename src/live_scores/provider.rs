use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::LiveEvent;

/// Trait that every live-score feed must implement.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    /// Return every event on the feed's current board, whatever its state.
    async fn fetch_live_events(&self) -> Result<Vec<LiveEvent>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
