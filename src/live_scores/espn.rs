use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::provider::ScoreProvider;
use crate::db::models::{EventState, LiveEvent};

/// Men's college basketball scoreboard (no key required).
pub const DEFAULT_SCOREBOARD_URL: &str =
    "https://site.api.espn.com/apis/site/v2/sports/basketball/mens-college-basketball/scoreboard";

/// Live-score provider backed by the public ESPN scoreboard API.
pub struct EspnScoreboard {
    http: Client,
    url: String,
    /// Conference group filter ("50" = all of Division I)
    groups: String,
    limit: u32,
}

impl EspnScoreboard {
    pub fn new(url: &str, groups: &str, limit: u32, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(EspnScoreboard {
            http,
            url: url.to_string(),
            groups: groups.to_string(),
            limit,
        })
    }
}

#[async_trait]
impl ScoreProvider for EspnScoreboard {
    fn name(&self) -> &str {
        "ESPN"
    }

    async fn fetch_live_events(&self) -> Result<Vec<LiveEvent>> {
        debug!("Fetching scoreboard from {}", self.url);

        let limit = self.limit.to_string();
        let resp = self
            .http
            .get(&self.url)
            .query(&[("groups", self.groups.as_str()), ("limit", limit.as_str())])
            .send()
            .await
            .context("ESPN scoreboard request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("ESPN scoreboard error: {}", resp.status());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse ESPN scoreboard response")?;

        Ok(parse_scoreboard(&raw))
    }
}

/// Extract events from a scoreboard payload. Events without an id or without
/// both a home and an away competitor are skipped.
pub fn parse_scoreboard(raw: &serde_json::Value) -> Vec<LiveEvent> {
    let events = match raw["events"].as_array() {
        Some(a) => a,
        None => return vec![],
    };

    events
        .iter()
        .filter_map(|ev| {
            let event_id = match &ev["id"] {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let comp = ev["competitions"].as_array()?.first()?;

            let mut away: Option<(String, i32)> = None;
            let mut home: Option<(String, i32)> = None;
            for competitor in comp["competitors"].as_array()? {
                let team = &competitor["team"];
                let name = team["displayName"]
                    .as_str()
                    .or_else(|| team["shortDisplayName"].as_str())
                    .unwrap_or_default()
                    .to_string();
                let score = parse_score(&competitor["score"]);
                match competitor["homeAway"].as_str() {
                    Some("home") => home = Some((name, score)),
                    Some("away") => away = Some((name, score)),
                    _ => {}
                }
            }
            let (away_team, away_score) = away?;
            let (home_team, home_score) = home?;

            // Status lives on the event; some payloads only carry it on the competition.
            let status = if ev["status"].is_object() {
                &ev["status"]
            } else {
                &comp["status"]
            };

            Some(LiveEvent {
                event_id,
                away_team,
                home_team,
                state: state_from_status(status),
                away_score,
                home_score,
            })
        })
        .collect()
}

fn parse_score(v: &serde_json::Value) -> i32 {
    v.as_str()
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| v.as_i64().and_then(|n| i32::try_from(n).ok()))
        .unwrap_or(0)
}

/// `completed` wins; otherwise `state` ("pre" / "in" / "post"), then the
/// description. A "post" game that is not completed (postponed, canceled)
/// counts as not started so it is never locked.
fn state_from_status(status: &serde_json::Value) -> EventState {
    let kind = &status["type"];
    if kind["completed"].as_bool() == Some(true) {
        return EventState::Final;
    }
    match kind["state"].as_str() {
        Some("in") => EventState::InProgress,
        Some("pre") | Some("post") => EventState::NotStarted,
        _ => match kind["description"].as_str() {
            Some(d) if d.eq_ignore_ascii_case("final") => EventState::Final,
            Some(d) if d.eq_ignore_ascii_case("in progress") || d.eq_ignore_ascii_case("halftime") => {
                EventState::InProgress
            }
            _ => EventState::NotStarted,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn competitor(home_away: &str, name: &str, score: serde_json::Value) -> serde_json::Value {
        json!({
            "homeAway": home_away,
            "score": score,
            "team": { "displayName": name, "shortDisplayName": name.split(' ').next().unwrap() }
        })
    }

    fn event(id: &str, state: &str, completed: bool, description: &str) -> serde_json::Value {
        json!({
            "id": id,
            "status": { "type": { "state": state, "completed": completed, "description": description } },
            "competitions": [{
                "competitors": [
                    competitor("home", "Wake Forest Demon Deacons", json!("78")),
                    competitor("away", "Duke Blue Devils", json!("74")),
                ]
            }]
        })
    }

    #[test]
    fn parses_final_event() {
        let raw = json!({ "events": [event("555", "post", true, "Final")] });
        let events = parse_scoreboard(&raw);
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.event_id, "555");
        assert_eq!(e.away_team, "Duke Blue Devils");
        assert_eq!(e.home_team, "Wake Forest Demon Deacons");
        assert_eq!((e.away_score, e.home_score), (74, 78));
        assert_eq!(e.state, EventState::Final);
    }

    #[test]
    fn maps_lifecycle_states() {
        let raw = json!({ "events": [
            event("1", "pre", false, "Scheduled"),
            event("2", "in", false, "In Progress"),
            event("3", "post", false, "Postponed"),
        ]});
        let states: Vec<EventState> = parse_scoreboard(&raw).into_iter().map(|e| e.state).collect();
        assert_eq!(
            states,
            vec![EventState::NotStarted, EventState::InProgress, EventState::NotStarted]
        );
    }

    #[test]
    fn falls_back_to_description_and_competition_status() {
        let raw = json!({ "events": [{
            "id": 9,
            "competitions": [{
                "status": { "type": { "description": "Final" } },
                "competitors": [
                    competitor("home", "Kansas Jayhawks", json!(70)),
                    competitor("away", "Baylor Bears", json!(68)),
                ]
            }]
        }]});
        let events = parse_scoreboard(&raw);
        assert_eq!(events[0].event_id, "9");
        assert_eq!(events[0].state, EventState::Final);
        assert_eq!((events[0].away_score, events[0].home_score), (68, 70));
    }

    #[test]
    fn skips_events_missing_a_side_or_id() {
        let raw = json!({ "events": [
            { "id": "1", "competitions": [{ "competitors": [competitor("home", "Duke", json!("0"))] }] },
            { "competitions": [{ "competitors": [] }] },
        ]});
        assert!(parse_scoreboard(&raw).is_empty());
    }

    #[test]
    fn blank_score_is_zero() {
        let raw = json!({ "events": [{
            "id": "4",
            "status": { "type": { "state": "pre" } },
            "competitions": [{ "competitors": [
                competitor("home", "Duke", json!("")),
                competitor("away", "UNC", serde_json::Value::Null),
            ]}]
        }]});
        let e = &parse_scoreboard(&raw)[0];
        assert_eq!((e.away_score, e.home_score), (0, 0));
    }

    #[test]
    fn out_of_range_score_is_zero() {
        let raw = json!({ "events": [{
            "id": "5",
            "status": { "type": { "state": "in" } },
            "competitions": [{ "competitors": [
                competitor("home", "Duke", json!(5_000_000_000i64)),
                competitor("away", "UNC", json!("99999999999")),
            ]}]
        }]});
        let e = &parse_scoreboard(&raw)[0];
        assert_eq!((e.away_score, e.home_score), (0, 0));
    }

    #[test]
    fn missing_events_array_is_empty() {
        assert!(parse_scoreboard(&json!({})).is_empty());
    }
}
