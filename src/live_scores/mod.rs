pub mod espn;
pub mod provider;

pub use espn::{EspnScoreboard, DEFAULT_SCOREBOARD_URL};
pub use provider::ScoreProvider;
