//! Score projection and pick selection.
//!
//! Spread convention throughout is home-side: `-3.5` means the home team is
//! favored by 3.5. The away line is the negation.

use serde::{Deserialize, Serialize};

use crate::db::models::{MatchupInputs, Side};

/// Model output for one matchup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub away_score: f64,
    pub home_score: f64,
    /// Model's home-side spread (`away_score - home_score`)
    pub spread: f64,
    pub favored: Side,
}

/// Deterministic numeric model. Injected so coefficients and formula can be
/// swapped without touching locking or settlement.
pub trait Projector: Send + Sync {
    fn project(&self, inputs: &MatchupInputs) -> Projection;
}

/// Rank-and-efficiency model:
///
///   proj = base + (rank_pivot − rank) / rank_divisor
///          + ((ppg − league_avg) + (league_avg − opp_ppga)) · efficiency_weight
///
/// with `home_court` added to the home side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingModel {
    pub base: f64,
    pub rank_pivot: f64,
    pub rank_divisor: f64,
    pub league_avg: f64,
    pub efficiency_weight: f64,
    pub home_court: f64,
}

impl Default for RatingModel {
    fn default() -> Self {
        RatingModel {
            base: 71.0,
            rank_pivot: 182.0,
            rank_divisor: 18.0,
            league_avg: 72.0,
            efficiency_weight: 0.4,
            home_court: 3.2,
        }
    }
}

impl RatingModel {
    fn side_score(&self, rank: f64, ppg: f64, opp_ppga: f64) -> f64 {
        self.base
            + (self.rank_pivot - rank) / self.rank_divisor
            + ((ppg - self.league_avg) + (self.league_avg - opp_ppga)) * self.efficiency_weight
    }
}

impl Projector for RatingModel {
    fn project(&self, inputs: &MatchupInputs) -> Projection {
        let away = self.side_score(inputs.away_rank, inputs.away_ppg, inputs.home_ppga);
        let home =
            self.side_score(inputs.home_rank, inputs.home_ppg, inputs.away_ppga) + self.home_court;
        Projection {
            away_score: round1(away),
            home_score: round1(home),
            spread: round1(away - home),
            favored: if away > home { Side::Away } else { Side::Home },
        }
    }
}

/// A pick derived from a projection and the market line. Mutable until the
/// game is locked into the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub side: Side,
    /// Market line for `side`
    pub line: f64,
    pub away_projection: f64,
    pub home_projection: f64,
    pub model_spread: f64,
    /// |model spread − market spread|
    pub edge: f64,
    /// Edge clears the value threshold
    pub has_value: bool,
}

impl Recommendation {
    /// Display lean: the side when the edge clears the threshold.
    pub fn lean(&self) -> Option<Side> {
        self.has_value.then_some(self.side)
    }

    pub fn projected_total(&self) -> f64 {
        round1(self.away_projection + self.home_projection)
    }
}

/// Compare the model spread against the market. A positive raw edge means the
/// model likes the away side more than the market does.
pub fn recommend(projection: &Projection, market_spread: f64, value_threshold: f64) -> Recommendation {
    let raw_edge = projection.spread - market_spread;
    let side = if raw_edge > 0.0 { Side::Away } else { Side::Home };
    let line = match side {
        Side::Home => market_spread,
        Side::Away => -market_spread,
    };
    let edge = round1(raw_edge).abs();
    Recommendation {
        side,
        line,
        away_projection: projection.away_score,
        home_projection: projection.home_score,
        model_spread: projection.spread,
        edge,
        has_value: edge > value_threshold,
    }
}

/// Round half away from zero to one decimal.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn even_inputs_give_home_court_edge() {
        let p = RatingModel::default().project(&MatchupInputs::default());
        // rank 182 and 70/70 averages: 71 + 0 + ((70-72) + (72-70)) * 0.4 = 71
        assert_relative_eq!(p.away_score, 71.0, epsilon = 1e-9);
        assert_relative_eq!(p.home_score, 74.2, epsilon = 1e-9);
        assert_relative_eq!(p.spread, -3.2, epsilon = 1e-9);
        assert_eq!(p.favored, Side::Home);
    }

    #[test]
    fn better_rank_and_offense_raise_projection() {
        let inputs = MatchupInputs {
            away_rank: 10.0,
            home_rank: 120.0,
            away_ppg: 82.0,
            home_ppg: 70.0,
            away_ppga: 64.0,
            home_ppga: 74.0,
        };
        let p = RatingModel::default().project(&inputs);
        // away: 71 + 172/18 + ((82-72) + (72-74)) * 0.4 = 71 + 9.5556 + 3.2
        assert_relative_eq!(p.away_score, 83.8, epsilon = 1e-9);
        // home: 71 + 62/18 + ((70-72) + (72-64)) * 0.4 + 3.2 = 71 + 3.4444 + 2.4 + 3.2
        assert_relative_eq!(p.home_score, 80.0, epsilon = 1e-9);
        assert_eq!(p.favored, Side::Away);
        assert_relative_eq!(p.spread, 3.7, epsilon = 1e-9);
    }

    #[test]
    fn home_pick_when_model_likes_home_more_than_market() {
        let p = Projection {
            away_score: 70.0,
            home_score: 78.0,
            spread: -8.0,
            favored: Side::Home,
        };
        let rec = recommend(&p, -3.5, 1.5);
        assert_eq!(rec.side, Side::Home);
        assert_relative_eq!(rec.line, -3.5, epsilon = 1e-9);
        assert_relative_eq!(rec.edge, 4.5, epsilon = 1e-9);
        assert!(rec.has_value);
        assert_eq!(rec.lean(), Some(Side::Home));
    }

    #[test]
    fn away_pick_takes_the_negated_line() {
        let p = Projection {
            away_score: 74.0,
            home_score: 75.0,
            spread: -1.0,
            favored: Side::Home,
        };
        let rec = recommend(&p, -6.5, 1.5);
        assert_eq!(rec.side, Side::Away);
        assert_relative_eq!(rec.line, 6.5, epsilon = 1e-9);
        assert_relative_eq!(rec.edge, 5.5, epsilon = 1e-9);
    }

    #[test]
    fn small_edge_has_no_lean_but_still_picks_a_side() {
        let p = Projection {
            away_score: 71.0,
            home_score: 74.2,
            spread: -3.2,
            favored: Side::Home,
        };
        let rec = recommend(&p, -3.5, 1.5);
        assert_eq!(rec.side, Side::Away);
        assert!(!rec.has_value);
        assert_eq!(rec.lean(), None);
        assert_relative_eq!(rec.projected_total(), 145.2, epsilon = 1e-9);
    }

    #[test]
    fn zero_edge_defaults_to_home() {
        let p = Projection {
            away_score: 70.0,
            home_score: 73.0,
            spread: -3.0,
            favored: Side::Home,
        };
        assert_eq!(recommend(&p, -3.0, 1.5).side, Side::Home);
    }

    #[test]
    fn round1_rounds_half_away_from_zero() {
        assert_relative_eq!(round1(2.25), 2.3, epsilon = 1e-9);
        assert_relative_eq!(round1(-2.25), -2.3, epsilon = 1e-9);
    }
}
