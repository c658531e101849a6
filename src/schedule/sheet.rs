use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::provider::ScheduleProvider;
use crate::db::models::{MatchupInputs, ScheduledEvent, DEFAULT_POINTS, DEFAULT_RANK};

/// Schedule provider backed by a spreadsheet published as CSV.
pub struct SheetSchedule {
    http: Client,
    url: Url,
}

impl SheetSchedule {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let url = Url::parse(url).with_context(|| format!("Invalid schedule URL {}", url))?;
        Ok(SheetSchedule { http, url })
    }

    /// Published sheets are cached upstream; a throwaway `cb` parameter
    /// forces a fresh copy.
    fn cache_busted_url(&self) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("cb", &Utc::now().timestamp_millis().to_string());
        url
    }
}

#[async_trait]
impl ScheduleProvider for SheetSchedule {
    fn name(&self) -> &str {
        "sheet"
    }

    async fn fetch_schedule(&self) -> Result<Vec<ScheduledEvent>> {
        let url = self.cache_busted_url();
        debug!("Fetching schedule from {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("Schedule sheet request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Schedule sheet error: {}", resp.status());
        }

        let body = resp.text().await.context("Failed to read schedule sheet")?;
        parse_schedule_csv(&body)
    }
}

/// One sheet row. Every cell is read as text; numbers are cleaned afterwards
/// so a bad cell costs a default, not the row.
#[derive(Debug, Deserialize)]
struct SheetRow {
    #[serde(rename = "Away Team", default)]
    away_team: Option<String>,
    #[serde(rename = "Home Team", default)]
    home_team: Option<String>,
    #[serde(rename = "Rank Away", default)]
    rank_away: Option<String>,
    #[serde(rename = "Rank Home", default)]
    rank_home: Option<String>,
    #[serde(rename = "PPG Away", default)]
    ppg_away: Option<String>,
    #[serde(rename = "PPG Home", default)]
    ppg_home: Option<String>,
    #[serde(rename = "PPGA Away", default)]
    ppga_away: Option<String>,
    #[serde(rename = "PPGA Home", default)]
    ppga_home: Option<String>,
    #[serde(rename = "FD Spread", default)]
    spread: Option<String>,
    #[serde(rename = "FD Total", default)]
    total: Option<String>,
    #[serde(rename = "Time", default)]
    time: Option<String>,
    #[serde(rename = "Away Logo", default)]
    away_logo: Option<String>,
    #[serde(rename = "Home Logo", default)]
    home_logo: Option<String>,
}

/// Parse the sheet body. Header and cell whitespace is trimmed. Rows with no
/// team names at all are skipped; rows that fail to decode are logged and
/// skipped.
pub fn parse_schedule_csv(body: &str) -> Result<Vec<ScheduledEvent>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());
    reader.headers().context("Schedule sheet has no header row")?;

    let mut events = Vec::new();
    for (i, row) in reader.deserialize::<SheetRow>().enumerate() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping schedule row {}: {}", i + 1, e);
                continue;
            }
        };
        if let Some(event) = row_to_event(row) {
            events.push(event);
        }
    }
    Ok(events)
}

fn row_to_event(row: SheetRow) -> Option<ScheduledEvent> {
    let away = non_blank(row.away_team);
    let home = non_blank(row.home_team);
    if away.is_none() && home.is_none() {
        return None;
    }

    Some(ScheduledEvent {
        away_team: away.unwrap_or_else(|| "Away".to_string()),
        home_team: home.unwrap_or_else(|| "Home".to_string()),
        inputs: MatchupInputs {
            away_rank: clean_number(row.rank_away.as_deref(), DEFAULT_RANK),
            home_rank: clean_number(row.rank_home.as_deref(), DEFAULT_RANK),
            away_ppg: clean_number(row.ppg_away.as_deref(), DEFAULT_POINTS),
            home_ppg: clean_number(row.ppg_home.as_deref(), DEFAULT_POINTS),
            away_ppga: clean_number(row.ppga_away.as_deref(), DEFAULT_POINTS),
            home_ppga: clean_number(row.ppga_home.as_deref(), DEFAULT_POINTS),
        },
        market_spread: clean_number(row.spread.as_deref(), 0.0),
        market_total: non_blank(row.total).filter(|t| !is_placeholder(t)),
        start_time: non_blank(row.time),
        away_logo: non_blank(row.away_logo),
        home_logo: non_blank(row.home_logo),
    })
}

fn non_blank(cell: Option<String>) -> Option<String> {
    cell.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn is_placeholder(cell: &str) -> bool {
    matches!(
        cell.trim().to_ascii_lowercase().as_str(),
        "" | "---" | "none" | "nan"
    )
}

/// Parse a numeric cell, substituting `default` for blanks, placeholders and
/// anything that is not a finite number.
pub fn clean_number(cell: Option<&str>, default: f64) -> f64 {
    match cell {
        Some(raw) if !is_placeholder(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(default),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SHEET: &str = "\
 Away Team , Home Team ,Rank Away,Rank Home,PPG Away,PPG Home,PPGA Away,PPGA Home,FD Spread,FD Total,Time,Away Logo,Home Logo
Duke,Wake Forest,8,61,81.2,77.0,66.1,71.4,-3.5,151.5,7:00 PM,duke.png,wake.png
Gonzaga,Saint Mary's,---,22,None,,abc,70,PK,---,,,
,,1,2,3,4,5,6,7,8,,,
";

    #[test]
    fn parses_rows_and_trims_headers() {
        let events = parse_schedule_csv(SHEET).unwrap();
        assert_eq!(events.len(), 2);

        let duke = &events[0];
        assert_eq!(duke.away_team, "Duke");
        assert_eq!(duke.home_team, "Wake Forest");
        assert_relative_eq!(duke.market_spread, -3.5, epsilon = 1e-9);
        assert_relative_eq!(duke.inputs.away_rank, 8.0, epsilon = 1e-9);
        assert_relative_eq!(duke.inputs.home_ppga, 71.4, epsilon = 1e-9);
        assert_eq!(duke.market_total.as_deref(), Some("151.5"));
        assert_eq!(duke.start_time.as_deref(), Some("7:00 PM"));
        assert_eq!(duke.home_logo.as_deref(), Some("wake.png"));
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let events = parse_schedule_csv(SHEET).unwrap();
        let zags = &events[1];
        assert_relative_eq!(zags.inputs.away_rank, DEFAULT_RANK, epsilon = 1e-9);
        assert_relative_eq!(zags.inputs.home_rank, 22.0, epsilon = 1e-9);
        assert_relative_eq!(zags.inputs.away_ppg, DEFAULT_POINTS, epsilon = 1e-9);
        assert_relative_eq!(zags.inputs.home_ppg, DEFAULT_POINTS, epsilon = 1e-9);
        assert_relative_eq!(zags.inputs.away_ppga, DEFAULT_POINTS, epsilon = 1e-9);
        assert_relative_eq!(zags.market_spread, 0.0, epsilon = 1e-9);
        assert!(zags.market_total.is_none());
        assert!(zags.start_time.is_none());
    }

    #[test]
    fn missing_columns_use_defaults_and_placeholder_names() {
        let events = parse_schedule_csv("Home Team,FD Spread\nKansas,-9\n").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].away_team, "Away");
        assert_eq!(events[0].home_team, "Kansas");
        assert_eq!(events[0].inputs, MatchupInputs::default());
        assert_relative_eq!(events[0].market_spread, -9.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_body_has_no_rows() {
        assert!(parse_schedule_csv("").unwrap().is_empty());
    }

    #[test]
    fn clean_number_rejects_non_finite() {
        assert_relative_eq!(clean_number(Some("inf"), 1.0), 1.0, epsilon = 1e-9);
        assert_relative_eq!(clean_number(Some(" +2.5 "), 0.0), 2.5, epsilon = 1e-9);
        assert_relative_eq!(clean_number(None, 7.0), 7.0, epsilon = 1e-9);
    }

    #[test]
    fn cache_buster_keeps_existing_query() {
        let sheet = SheetSchedule::new(
            "https://docs.example.com/pub?gid=1&single=true&output=csv",
            Duration::from_secs(1),
        )
        .unwrap();
        let url = sheet.cache_busted_url();
        let keys: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
        assert_eq!(keys, vec!["gid", "single", "output", "cb"]);
    }
}
