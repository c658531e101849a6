//! When a pick stops being recomputed.
//!
//! ```text
//!  Unresolved ──(matched live event has started, no ledger row)──▶ Lockable
//!  Lockable   ──(row appended, or found already appended)───────▶ Locked
//! ```
//!
//! `Locked` is terminal for the pick fields. Only settlement touches the row
//! after that.

use chrono::{DateTime, Utc};

use crate::db::models::{LedgerRecord, LiveEvent, PickStatus, ScheduledEvent};

use super::projection::Recommendation;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LockState<'a> {
    /// No live counterpart, or it has not started: recompute every cycle.
    Unresolved { live: Option<&'a LiveEvent> },
    /// Started and not yet in the ledger: lock now.
    Lockable { live: &'a LiveEvent },
    /// Ledger row exists and is authoritative.
    Locked {
        live: &'a LiveEvent,
        record: &'a LedgerRecord,
    },
}

/// `existing` is the ledger row for `live`'s event id, if any.
pub fn lock_state<'a>(
    live: Option<&'a LiveEvent>,
    existing: Option<&'a LedgerRecord>,
) -> LockState<'a> {
    match (live, existing) {
        (None, _) => LockState::Unresolved { live: None },
        (Some(live), Some(record)) => LockState::Locked { live, record },
        (Some(live), None) if live.state.is_started() => LockState::Lockable { live },
        (Some(live), None) => LockState::Unresolved { live: Some(live) },
    }
}

/// Freeze `rec` into a new ledger row for `live`.
pub fn lock_record(
    event: &ScheduledEvent,
    live: &LiveEvent,
    rec: &Recommendation,
    now: DateTime<Utc>,
) -> LedgerRecord {
    LedgerRecord {
        created_at: now,
        matchup: event.matchup_label(),
        status: PickStatus::Pending,
        final_score: None,
        pick_team: event.team(rec.side).to_string(),
        pick_side: rec.side,
        pick_line: rec.line,
        away_projection: rec.away_projection,
        home_projection: rec.home_projection,
        edge: rec.edge,
        inputs: event.inputs,
        event_id: live.event_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{EventState, MatchupInputs, Side};

    fn live(state: EventState) -> LiveEvent {
        LiveEvent {
            event_id: "555".into(),
            away_team: "Duke Blue Devils".into(),
            home_team: "Wake Forest Demon Deacons".into(),
            state,
            away_score: 10,
            home_score: 8,
        }
    }

    fn scheduled() -> ScheduledEvent {
        ScheduledEvent {
            away_team: "Duke".into(),
            home_team: "Wake Forest".into(),
            inputs: MatchupInputs {
                away_rank: 12.0,
                ..MatchupInputs::default()
            },
            market_spread: -3.5,
            market_total: Some("148.5".into()),
            start_time: Some("7:00 PM".into()),
            away_logo: None,
            home_logo: None,
        }
    }

    fn rec() -> Recommendation {
        Recommendation {
            side: Side::Home,
            line: -3.5,
            away_projection: 72.0,
            home_projection: 77.5,
            model_spread: -5.5,
            edge: 2.0,
            has_value: true,
        }
    }

    #[test]
    fn no_live_match_is_unresolved() {
        assert_eq!(lock_state(None, None), LockState::Unresolved { live: None });
    }

    #[test]
    fn not_started_is_unresolved_even_when_matched() {
        let l = live(EventState::NotStarted);
        assert_eq!(
            lock_state(Some(&l), None),
            LockState::Unresolved { live: Some(&l) }
        );
    }

    #[test]
    fn started_without_row_is_lockable() {
        for state in [EventState::InProgress, EventState::Final] {
            let l = live(state);
            assert_eq!(lock_state(Some(&l), None), LockState::Lockable { live: &l });
        }
    }

    #[test]
    fn existing_row_is_locked_regardless_of_live_state() {
        let l = live(EventState::NotStarted);
        let r = lock_record(&scheduled(), &l, &rec(), Utc::now());
        assert!(matches!(
            lock_state(Some(&l), Some(&r)),
            LockState::Locked { .. }
        ));
    }

    #[test]
    fn lock_record_freezes_pick_and_inputs() {
        let l = live(EventState::InProgress);
        let r = lock_record(&scheduled(), &l, &rec(), Utc::now());
        assert_eq!(r.event_id, "555");
        assert_eq!(r.matchup, "Duke @ Wake Forest");
        assert_eq!(r.status, PickStatus::Pending);
        assert_eq!(r.pick_team, "Wake Forest");
        assert_eq!(r.pick_side, Side::Home);
        assert_eq!(r.pick_line, -3.5);
        assert_eq!(r.inputs.away_rank, 12.0);
        assert!(r.final_score.is_none());
    }
}
