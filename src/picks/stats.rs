use serde::{Deserialize, Serialize};

use crate::db::models::{LedgerRecord, PickStatus};

use super::projection::round1;

/// Running record over the whole ledger.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LedgerStats {
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    /// Locked but not yet settled
    pub pending: u32,
    /// wins / (wins + losses) × 100, one decimal; 0 with no decided picks
    pub win_pct: f64,
    /// +1 per win, −juice per loss, one decimal
    pub units: f64,
}

pub fn aggregate(records: &[LedgerRecord], juice: f64) -> LedgerStats {
    let mut stats = LedgerStats::default();
    for record in records {
        match record.status {
            PickStatus::Win => stats.wins += 1,
            PickStatus::Loss => stats.losses += 1,
            PickStatus::Push => stats.pushes += 1,
            PickStatus::Pending | PickStatus::Live => stats.pending += 1,
        }
    }
    let decided = stats.wins + stats.losses;
    if decided > 0 {
        stats.win_pct = round1(f64::from(stats.wins) / f64::from(decided) * 100.0);
    }
    stats.units = round1(f64::from(stats.wins) - f64::from(stats.losses) * juice);
    stats
}
