use crate::db::models::{LiveEvent, ScheduledEvent};

use super::normalize::Normalizer;

/// Resolves a scheduled matchup to at most one live-feed event.
///
/// Implementations must be pure functions of their inputs; the engine calls
/// them once per scheduled event per cycle.
pub trait EventMatcher: Send + Sync {
    fn find_match<'a>(
        &self,
        event: &ScheduledEvent,
        live: &'a [LiveEvent],
    ) -> Option<&'a LiveEvent>;
}

/// Matches when any normalized scheduled name contains, or is contained in,
/// any normalized live name. The first live event that qualifies wins.
#[derive(Debug, Clone, Default)]
pub struct ContainmentMatcher {
    normalizer: Normalizer,
}

impl ContainmentMatcher {
    pub fn new(normalizer: Normalizer) -> Self {
        ContainmentMatcher { normalizer }
    }
}

impl EventMatcher for ContainmentMatcher {
    fn find_match<'a>(
        &self,
        event: &ScheduledEvent,
        live: &'a [LiveEvent],
    ) -> Option<&'a LiveEvent> {
        let wanted = [
            self.normalizer.normalize(&event.away_team),
            self.normalizer.normalize(&event.home_team),
        ];
        if wanted.iter().all(|k| k.is_empty()) {
            return None;
        }

        live.iter().find(|candidate| {
            let keys = [
                self.normalizer.normalize(&candidate.away_team),
                self.normalizer.normalize(&candidate.home_team),
            ];
            wanted
                .iter()
                .any(|w| keys.iter().any(|k| keys_overlap(w, k)))
        })
    }
}

/// An empty key is a substring of everything, so it never matches.
fn keys_overlap(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}
