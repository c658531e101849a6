use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of a matchup a pick or projection refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Away,
    Home,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Away => "AWAY",
            Side::Home => "HOME",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AWAY" => Ok(Side::Away),
            "HOME" => Ok(Side::Home),
            other => Err(format!("unknown side '{}'", other)),
        }
    }
}

/// Settlement status of a ledger row.
///
/// `Pending` and `Live` are open; `Win`, `Loss` and `Push` are terminal.
/// New rows are written as `Pending`. `Live` is accepted on read so rows
/// written by older tooling still settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PickStatus {
    Pending,
    Live,
    Win,
    Loss,
    Push,
}

impl PickStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickStatus::Pending => "PENDING",
            PickStatus::Live => "LIVE",
            PickStatus::Win => "WIN",
            PickStatus::Loss => "LOSS",
            PickStatus::Push => "PUSH",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PickStatus::Win | PickStatus::Loss | PickStatus::Push)
    }
}

impl fmt::Display for PickStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PickStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(PickStatus::Pending),
            "LIVE" => Ok(PickStatus::Live),
            "WIN" => Ok(PickStatus::Win),
            "LOSS" => Ok(PickStatus::Loss),
            "PUSH" => Ok(PickStatus::Push),
            other => Err(format!("unknown pick status '{}'", other)),
        }
    }
}

// ── SQLite conversions ─────────────────────────────────────────────────────────

fn text_from_sql<T: FromStr<Err = String>>(value: ValueRef<'_>) -> FromSqlResult<T> {
    let text = value.as_str()?;
    text.parse::<T>().map_err(|e| FromSqlError::Other(e.into()))
}

impl ToSql for Side {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Side {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_from_sql(value)
    }
}

impl ToSql for PickStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PickStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        text_from_sql(value)
    }
}

// ── Feed shapes ────────────────────────────────────────────────────────────────

/// Numeric inputs to the projection model for one matchup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchupInputs {
    pub away_rank: f64,
    pub home_rank: f64,
    /// Points scored per game
    pub away_ppg: f64,
    pub home_ppg: f64,
    /// Points allowed per game
    pub away_ppga: f64,
    pub home_ppga: f64,
}

/// Substituted when a rank cell is blank or unparseable.
pub const DEFAULT_RANK: f64 = 182.0;
/// Substituted when a scoring or allowed-scoring average is blank or unparseable.
pub const DEFAULT_POINTS: f64 = 70.0;

impl Default for MatchupInputs {
    fn default() -> Self {
        MatchupInputs {
            away_rank: DEFAULT_RANK,
            home_rank: DEFAULT_RANK,
            away_ppg: DEFAULT_POINTS,
            home_ppg: DEFAULT_POINTS,
            away_ppga: DEFAULT_POINTS,
            home_ppga: DEFAULT_POINTS,
        }
    }
}

/// One matchup from the schedule feed. Rebuilt every cycle, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub away_team: String,
    pub home_team: String,
    pub inputs: MatchupInputs,
    /// Published home-side spread (negative = home favored)
    pub market_spread: f64,
    /// Published game total, passed through as text
    pub market_total: Option<String>,
    /// Feed-specific start-time text
    pub start_time: Option<String>,
    pub away_logo: Option<String>,
    pub home_logo: Option<String>,
}

impl ScheduledEvent {
    pub fn matchup_label(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Away => &self.away_team,
            Side::Home => &self.home_team,
        }
    }
}

/// Lifecycle of a live-feed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    NotStarted,
    InProgress,
    Final,
}

impl EventState {
    pub fn is_started(&self) -> bool {
        !matches!(self, EventState::NotStarted)
    }
}

/// One event as reported by the live-score feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    /// Live feed's stable event identifier; the ledger's unique key
    pub event_id: String,
    pub away_team: String,
    pub home_team: String,
    pub state: EventState,
    pub away_score: i32,
    pub home_score: i32,
}

impl LiveEvent {
    pub fn is_final(&self) -> bool {
        self.state == EventState::Final
    }

    pub fn score_text(&self) -> String {
        format!("{} - {}", self.away_score, self.home_score)
    }
}

// ── Persisted ──────────────────────────────────────────────────────────────────

/// A locked pick. At most one per `event_id`; the pick fields never change
/// after the first write and only `status` / `final_score` move once more
/// when the game goes final.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub created_at: DateTime<Utc>,
    /// "Away @ Home" using the schedule feed's names
    pub matchup: String,
    pub status: PickStatus,
    /// "away - home", set on settlement
    pub final_score: Option<String>,
    pub pick_team: String,
    pub pick_side: Side,
    /// Spread taken for `pick_team` (negative = laying points)
    pub pick_line: f64,
    pub away_projection: f64,
    pub home_projection: f64,
    pub edge: f64,
    /// Inputs the pick was computed from, kept for audit
    pub inputs: MatchupInputs,
    pub event_id: String,
}
