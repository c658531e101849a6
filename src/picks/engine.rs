use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::db::models::{LedgerRecord, LiveEvent, PickStatus, ScheduledEvent, Side};
use crate::db::{Ledger, LedgerError};
use crate::live_scores::ScoreProvider;
use crate::schedule::ScheduleProvider;

use super::lock::{lock_record, lock_state, LockState};
use super::matcher::{ContainmentMatcher, EventMatcher};
use super::projection::{recommend, round1, Projector, RatingModel, Recommendation};
use super::settlement;
use super::stats::{aggregate, LedgerStats};

/// Tunables for one engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Edge a pick needs before it is shown as a lean / parlay leg
    pub value_threshold: f64,
    pub parlay_size: usize,
    /// Units risked per unit won
    pub juice: f64,
    /// Per-feed fetch timeout
    pub feed_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            value_threshold: 1.5,
            parlay_size: 3,
            juice: 1.1,
            feed_timeout: Duration::from_secs(5),
        }
    }
}

/// Where a board row sits in the lock lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No live-feed counterpart yet
    Unmatched,
    /// Matched, not started
    Upcoming,
    /// Started but the ledger write failed this cycle; retried next cycle
    Started,
    /// Pick read from the ledger
    Locked,
}

/// One matchup as shown to readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardRow {
    pub matchup: String,
    pub away_team: String,
    pub home_team: String,
    pub away_logo: Option<String>,
    pub home_logo: Option<String>,
    pub start_time: Option<String>,
    pub phase: Phase,
    /// Ledger status, once locked
    pub status: Option<PickStatus>,
    pub event_id: Option<String>,
    pub pick_team: String,
    pub pick_side: Side,
    pub pick_line: f64,
    pub lean: Option<Side>,
    pub away_projection: f64,
    pub home_projection: f64,
    pub projected_total: f64,
    pub market_total: Option<String>,
    pub edge: f64,
    pub live_score: Option<String>,
    pub final_score: Option<String>,
}

impl BoardRow {
    fn dynamic(event: &ScheduledEvent, rec: &Recommendation, live: Option<&LiveEvent>) -> Self {
        let phase = match live {
            None => Phase::Unmatched,
            Some(l) if l.state.is_started() => Phase::Started,
            Some(_) => Phase::Upcoming,
        };
        BoardRow {
            matchup: event.matchup_label(),
            away_team: event.away_team.clone(),
            home_team: event.home_team.clone(),
            away_logo: event.away_logo.clone(),
            home_logo: event.home_logo.clone(),
            start_time: event.start_time.clone(),
            phase,
            status: None,
            event_id: live.map(|l| l.event_id.clone()),
            pick_team: event.team(rec.side).to_string(),
            pick_side: rec.side,
            pick_line: rec.line,
            lean: rec.lean(),
            away_projection: rec.away_projection,
            home_projection: rec.home_projection,
            projected_total: rec.projected_total(),
            market_total: event.market_total.clone(),
            edge: rec.edge,
            live_score: live
                .filter(|l| l.state.is_started())
                .map(LiveEvent::score_text),
            final_score: None,
        }
    }

    fn locked(
        event: &ScheduledEvent,
        record: &LedgerRecord,
        live: &LiveEvent,
        value_threshold: f64,
    ) -> Self {
        BoardRow {
            matchup: record.matchup.clone(),
            away_team: event.away_team.clone(),
            home_team: event.home_team.clone(),
            away_logo: event.away_logo.clone(),
            home_logo: event.home_logo.clone(),
            start_time: event.start_time.clone(),
            phase: Phase::Locked,
            status: Some(record.status),
            event_id: Some(record.event_id.clone()),
            pick_team: record.pick_team.clone(),
            pick_side: record.pick_side,
            pick_line: record.pick_line,
            lean: (record.edge > value_threshold).then_some(record.pick_side),
            away_projection: record.away_projection,
            home_projection: record.home_projection,
            projected_total: round1(record.away_projection + record.home_projection),
            market_total: event.market_total.clone(),
            edge: record.edge,
            live_score: live.state.is_started().then(|| live.score_text()),
            final_score: record.final_score.clone(),
        }
    }
}

/// A final from the live feed, matched or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedGame {
    pub event_id: String,
    pub matchup: String,
    pub score: String,
}

/// Counters for one cycle, logged and returned with the board.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub scheduled: usize,
    pub live: usize,
    pub matched: usize,
    pub locked: usize,
    pub settled: usize,
    /// Appends lost to another cycle
    pub conflicts: usize,
    pub schedule_ok: bool,
    pub scores_ok: bool,
    pub ledger_ok: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub generated_at: DateTime<Utc>,
    pub games: Vec<BoardRow>,
    /// Best unlocked value plays by edge
    pub parlay: Vec<BoardRow>,
    pub completed: Vec<CompletedGame>,
    pub stats: LedgerStats,
    pub summary: CycleSummary,
}

/// Runs reconciliation cycles: pull both feeds and the ledger, match, lock
/// started games, settle finished ones, aggregate.
///
/// Cycles share nothing but the ledger and may overlap freely.
pub struct ReconcileEngine {
    ledger: Arc<dyn Ledger>,
    schedule: Arc<dyn ScheduleProvider>,
    scores: Arc<dyn ScoreProvider>,
    projector: Arc<dyn Projector>,
    matcher: Arc<dyn EventMatcher>,
    settings: EngineSettings,
    /// Board from the most recently finished cycle
    latest: RwLock<Option<Board>>,
}

impl ReconcileEngine {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        schedule: Arc<dyn ScheduleProvider>,
        scores: Arc<dyn ScoreProvider>,
        settings: EngineSettings,
    ) -> Self {
        ReconcileEngine {
            ledger,
            schedule,
            scores,
            projector: Arc::new(RatingModel::default()),
            matcher: Arc::new(ContainmentMatcher::default()),
            settings,
            latest: RwLock::new(None),
        }
    }

    pub fn with_projector(mut self, projector: Arc<dyn Projector>) -> Self {
        self.projector = projector;
        self
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn EventMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub async fn latest_board(&self) -> Option<Board> {
        self.latest.read().await.clone()
    }

    pub fn ledger_records(&self) -> Result<Vec<LedgerRecord>, LedgerError> {
        self.ledger.list_records()
    }

    pub fn ledger_stats(&self) -> Result<LedgerStats, LedgerError> {
        Ok(aggregate(&self.ledger.list_records()?, self.settings.juice))
    }

    /// One full refresh. Never fails: a dead feed is treated as empty and a
    /// failed ledger call skips only the event it was for.
    pub async fn run_cycle(&self) -> Board {
        let timeout = self.settings.feed_timeout;
        let (schedule, live) = futures_util::future::join(
            fetch_or_empty(self.schedule.name(), timeout, self.schedule.fetch_schedule()),
            fetch_or_empty(self.scores.name(), timeout, self.scores.fetch_live_events()),
        )
        .await;

        let mut summary = CycleSummary {
            schedule_ok: schedule.is_some(),
            scores_ok: live.is_some(),
            ledger_ok: true,
            ..CycleSummary::default()
        };
        let schedule = schedule.unwrap_or_default();
        let live = live.unwrap_or_default();
        summary.scheduled = schedule.len();
        summary.live = live.len();

        // Snapshot only: appends are conditional in storage, so a stale or
        // empty snapshot costs a conflict, never a duplicate.
        let mut known: HashMap<String, LedgerRecord> = match self.ledger.list_records() {
            Ok(records) => records
                .into_iter()
                .map(|r| (r.event_id.clone(), r))
                .collect(),
            Err(e) => {
                warn!("Ledger read failed, continuing with empty snapshot: {}", e);
                summary.ledger_ok = false;
                HashMap::new()
            }
        };

        let threshold = self.settings.value_threshold;
        let mut games = Vec::with_capacity(schedule.len());
        let mut handled: HashSet<String> = HashSet::new();
        for event in &schedule {
            let projection = self.projector.project(&event.inputs);
            let dynamic = recommend(&projection, event.market_spread, threshold);
            let matched = self.matcher.find_match(event, &live);
            if matched.is_some() {
                summary.matched += 1;
            }
            let existing = matched.and_then(|l| known.get(&l.event_id)).cloned();

            let row = match lock_state(matched, existing.as_ref()) {
                LockState::Unresolved { live } => {
                    debug!("{}: unresolved", event.matchup_label());
                    BoardRow::dynamic(event, &dynamic, live)
                }
                LockState::Lockable { live } => match self.lock(event, live, &dynamic, &mut summary) {
                    Some(record) => {
                        let record = self.settle_if_final(record, live, &mut summary);
                        let row = BoardRow::locked(event, &record, live, threshold);
                        handled.insert(record.event_id.clone());
                        known.insert(record.event_id.clone(), record);
                        row
                    }
                    None => BoardRow::dynamic(event, &dynamic, Some(live)),
                },
                LockState::Locked { live, record } => {
                    let record = self.settle_if_final(record.clone(), live, &mut summary);
                    let row = BoardRow::locked(event, &record, live, threshold);
                    handled.insert(record.event_id.clone());
                    known.insert(record.event_id.clone(), record);
                    row
                }
            };
            games.push(row);
        }

        // Open picks whose schedule row is gone (sheet moved on, or the sheet
        // feed is down) still settle from the ledger row and the live feed.
        let orphaned: Vec<LedgerRecord> = known
            .values()
            .filter(|r| !r.status.is_terminal() && !handled.contains(&r.event_id))
            .cloned()
            .collect();
        for record in orphaned {
            let Some(live_event) = live.iter().find(|l| l.event_id == record.event_id) else {
                continue;
            };
            debug!("{} [{}]: no schedule row, checking live feed", record.matchup, record.event_id);
            let record = self.settle_if_final(record, live_event, &mut summary);
            known.insert(record.event_id.clone(), record);
        }

        let records = match self.ledger.list_records() {
            Ok(records) => records,
            Err(e) => {
                warn!("Ledger re-read failed, stats from cycle snapshot: {}", e);
                summary.ledger_ok = false;
                known.into_values().collect()
            }
        };
        let stats = aggregate(&records, self.settings.juice);

        let mut parlay: Vec<BoardRow> = games
            .iter()
            .filter(|g| matches!(g.phase, Phase::Unmatched | Phase::Upcoming) && g.lean.is_some())
            .cloned()
            .collect();
        parlay.sort_by(|a, b| b.edge.total_cmp(&a.edge));
        parlay.truncate(self.settings.parlay_size);

        let completed = live
            .iter()
            .filter(|l| l.is_final())
            .map(|l| CompletedGame {
                event_id: l.event_id.clone(),
                matchup: format!("{} @ {}", l.away_team, l.home_team),
                score: l.score_text(),
            })
            .collect();

        info!(
            "Cycle done: {} scheduled, {} live, {} matched, {} locked, {} settled, {} conflicts ({}-{}-{})",
            summary.scheduled,
            summary.live,
            summary.matched,
            summary.locked,
            summary.settled,
            summary.conflicts,
            stats.wins,
            stats.losses,
            stats.pushes,
        );

        let board = Board {
            generated_at: Utc::now(),
            games,
            parlay,
            completed,
            stats,
            summary,
        };
        *self.latest.write().await = Some(board.clone());
        board
    }

    /// Append the pick for a game that just started. On a lost race the
    /// stored row is returned instead of ours.
    fn lock(
        &self,
        event: &ScheduledEvent,
        live: &LiveEvent,
        rec: &Recommendation,
        summary: &mut CycleSummary,
    ) -> Option<LedgerRecord> {
        let record = lock_record(event, live, rec, Utc::now());
        match self.ledger.append_if_absent(&record) {
            Ok(true) => {
                info!(
                    "Locked {} [{}]: {} {:+} (edge {:.1})",
                    record.matchup, record.event_id, record.pick_team, record.pick_line, record.edge
                );
                summary.locked += 1;
                Some(record)
            }
            Ok(false) => {
                info!(
                    "{} [{}] already locked by another cycle, using stored pick",
                    record.matchup, record.event_id
                );
                summary.conflicts += 1;
                self.reload(&record.event_id)
            }
            Err(e) => {
                warn!("Failed to lock {} [{}]: {}", record.matchup, record.event_id, e);
                None
            }
        }
    }

    fn settle_if_final(
        &self,
        mut record: LedgerRecord,
        live: &LiveEvent,
        summary: &mut CycleSummary,
    ) -> LedgerRecord {
        let Some((status, score)) = settlement::evaluate(&record, live) else {
            return record;
        };
        match self.ledger.settle(&record.event_id, status, &score) {
            Ok(true) => {
                info!(
                    "Settled {} [{}]: {} {:+} → {} ({})",
                    record.matchup, record.event_id, record.pick_team, record.pick_line, status, score
                );
                summary.settled += 1;
                record.status = status;
                record.final_score = Some(score);
                record
            }
            Ok(false) => {
                debug!("{} already settled by another cycle", record.event_id);
                self.reload(&record.event_id).unwrap_or(record)
            }
            Err(e) => {
                warn!("Failed to settle {}: {}", record.event_id, e);
                record
            }
        }
    }

    fn reload(&self, event_id: &str) -> Option<LedgerRecord> {
        match self.ledger.get(event_id) {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                warn!("Ledger row {} missing after conflict", event_id);
                None
            }
            Err(e) => {
                warn!("Failed to reload ledger row {}: {}", event_id, e);
                None
            }
        }
    }
}

/// Run one feed fetch under a timeout; `None` means the feed is down for
/// this cycle.
async fn fetch_or_empty<T>(
    source: &str,
    timeout: Duration,
    fetch: impl Future<Output = anyhow::Result<Vec<T>>>,
) -> Option<Vec<T>> {
    match tokio::time::timeout(timeout, fetch).await {
        Ok(Ok(items)) => Some(items),
        Ok(Err(e)) => {
            warn!("{} feed unavailable: {:#}", source, e);
            None
        }
        Err(_) => {
            warn!("{} feed timed out after {:?}", source, timeout);
            None
        }
    }
}
