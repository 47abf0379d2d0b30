// stats.nba.com client

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use hoop_models::table::{from_rows, has_column, text_column};
use hoop_models::{parse_player_id, PlayerInfo};
use polars::prelude::DataFrame;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://stats.nba.com/stats";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
const SEASON_TYPE: &str = "Regular Season";
const LEAGUE_ID: &str = "00";

/// Source of the raw tables the pipeline starts from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsProvider: Send + Sync {
    /// Players on a current roster for `season`.
    async fn active_players(&self, season: &str) -> Result<Vec<PlayerInfo>>;

    /// Regular-season game log for one player; an empty frame when the
    /// player did not appear that season.
    async fn player_game_log(&self, player_id: i64, season: &str) -> Result<DataFrame>;

    /// League-wide per-game opponent stats, one row per team.
    async fn team_opponent_stats(&self, season: &str) -> Result<DataFrame>;
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "resultSets", alias = "resultSet")]
    result_sets: ResultSets,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResultSets {
    Many(Vec<ResultSet>),
    One(ResultSet),
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    #[serde(default)]
    name: String,
    headers: Vec<String>,
    #[serde(rename = "rowSet")]
    row_set: Vec<Vec<Value>>,
}

impl StatsResponse {
    fn into_first_set(self) -> Result<ResultSet> {
        match self.result_sets {
            ResultSets::One(set) => Ok(set),
            ResultSets::Many(sets) => sets
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("response carried no result sets")),
        }
    }
}

impl ResultSet {
    fn into_frame(self) -> Result<DataFrame> {
        let rows: Vec<Vec<Option<String>>> = self
            .row_set
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        let source = format!("{} result set", self.name);
        Ok(from_rows(&source, &self.headers, &rows)?)
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        other => Some(other.to_string()),
    }
}

pub struct NbaStatsClient {
    client: Client,
    base_url: String,
}

impl NbaStatsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_frame(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<DataFrame> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!("GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .with_context(|| format!("request to {endpoint} failed"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{endpoint} returned HTTP {status}"));
        }

        let body: StatsResponse = response
            .json()
            .await
            .with_context(|| format!("unexpected {endpoint} payload"))?;
        let set = body.into_first_set()?;
        debug!("{} -> {} ({} rows)", endpoint, set.name, set.row_set.len());
        set.into_frame()
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.nba.com/"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.nba.com"));
    headers.insert(
        HeaderName::from_static("x-nba-stats-origin"),
        HeaderValue::from_static("stats"),
    );
    headers.insert(
        HeaderName::from_static("x-nba-stats-token"),
        HeaderValue::from_static("true"),
    );
    headers
}

/// Reads the `commonallplayers` table into directory entries. Rows without
/// a readable id are skipped.
pub fn players_from_frame(frame: &DataFrame) -> Result<Vec<PlayerInfo>> {
    let optional = |name: &str| -> Result<Vec<Option<String>>> {
        if has_column(frame, name) {
            Ok(text_column(frame, name)?)
        } else {
            Ok(vec![None; frame.height()])
        }
    };
    let ids = optional("PERSON_ID")?;
    let names = optional("DISPLAY_FIRST_LAST")?;
    let statuses = optional("ROSTERSTATUS")?;

    Ok(ids
        .into_iter()
        .zip(names)
        .zip(statuses)
        .filter_map(|((id, name), status)| {
            let player_id = parse_player_id(id.as_deref()?)?;
            Some(PlayerInfo {
                player_id,
                full_name: name.unwrap_or_else(|| player_id.to_string()),
                is_active: status.map_or(true, |s| s == "1" || s == "Active"),
            })
        })
        .collect())
}

#[async_trait]
impl StatsProvider for NbaStatsClient {
    async fn active_players(&self, season: &str) -> Result<Vec<PlayerInfo>> {
        let frame = self
            .get_frame(
                "commonallplayers",
                &[
                    ("LeagueID", LEAGUE_ID),
                    ("Season", season),
                    ("IsOnlyCurrentSeason", "1"),
                ],
            )
            .await?;
        Ok(players_from_frame(&frame)?
            .into_iter()
            .filter(|p| p.is_active)
            .collect())
    }

    async fn player_game_log(&self, player_id: i64, season: &str) -> Result<DataFrame> {
        let player_id = player_id.to_string();
        self.get_frame(
            "playergamelog",
            &[
                ("PlayerID", player_id.as_str()),
                ("Season", season),
                ("SeasonType", SEASON_TYPE),
                ("LeagueID", LEAGUE_ID),
                ("DateFrom", ""),
                ("DateTo", ""),
            ],
        )
        .await
    }

    async fn team_opponent_stats(&self, season: &str) -> Result<DataFrame> {
        self.get_frame(
            "leaguedashteamstats",
            &[
                ("MeasureType", "Opponent"),
                ("PerMode", "PerGame"),
                ("Season", season),
                ("SeasonType", SEASON_TYPE),
                ("LeagueID", LEAGUE_ID),
                ("PlusMinus", "N"),
                ("PaceAdjust", "N"),
                ("Rank", "N"),
                ("Month", "0"),
                ("OpponentTeamID", "0"),
                ("Period", "0"),
                ("LastNGames", "0"),
                ("TeamID", "0"),
                ("PORound", "0"),
                ("TwoWay", "0"),
                ("DateFrom", ""),
                ("DateTo", ""),
                ("Outcome", ""),
                ("Location", ""),
                ("SeasonSegment", ""),
                ("VsConference", ""),
                ("VsDivision", ""),
                ("GameSegment", ""),
                ("Conference", ""),
                ("Division", ""),
                ("ShotClockRange", ""),
                ("GameScope", ""),
                ("PlayerExperience", ""),
                ("PlayerPosition", ""),
                ("StarterBench", ""),
            ],
        )
        .await
    }
}
