use serde::{Deserialize, Serialize};

use crate::db::models::{LedgerRecord, LiveEvent, PickStatus, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Settlement {
    Win,
    Loss,
    Push,
}

impl From<Settlement> for PickStatus {
    fn from(s: Settlement) -> Self {
        match s {
            Settlement::Win => PickStatus::Win,
            Settlement::Loss => PickStatus::Loss,
            Settlement::Push => PickStatus::Push,
        }
    }
}

/// Standard spread settlement: add the line to the picked side's score and
/// compare against the other side.
pub fn settle(side: Side, line: f64, away_score: i32, home_score: i32) -> Settlement {
    let (ours, theirs) = match side {
        Side::Home => (home_score, away_score),
        Side::Away => (away_score, home_score),
    };
    let margin = f64::from(ours) + line - f64::from(theirs);
    if margin > 0.0 {
        Settlement::Win
    } else if margin < 0.0 {
        Settlement::Loss
    } else {
        Settlement::Push
    }
}

/// Terminal status and score text for `record` if `live` is final and the
/// record is still open. Always uses the record's locked line.
pub fn evaluate(record: &LedgerRecord, live: &LiveEvent) -> Option<(PickStatus, String)> {
    if !live.is_final() || record.status.is_terminal() {
        return None;
    }
    let outcome = settle(
        record.pick_side,
        record.pick_line,
        live.away_score,
        live.home_score,
    );
    Some((outcome.into(), live.score_text()))
}
