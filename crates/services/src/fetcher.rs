// Raw table fetchers: one request per entity, paced, failures skipped

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use hoop_models::table::{concat, fill_column, from_rows, write_csv};
use hoop_models::{PlayerInfo, SEASON};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::stats_api::StatsProvider;

pub const DEFAULT_SEASONS: [&str; 3] = ["2022-23", "2023-24", "2024-25"];
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 700;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    pub seasons: Vec<String>,
    pub request_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            seasons: DEFAULT_SEASONS.iter().map(|s| (*s).to_string()).collect(),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FetchSummary {
    pub requests: usize,
    pub succeeded: usize,
    pub empty: usize,
    pub failed: usize,
    pub rows: usize,
    /// `None` when nothing was fetched and no file was written.
    pub written: Option<PathBuf>,
}

/// Accumulates per-entity responses into one table.
#[derive(Default)]
struct Collected {
    frames: Vec<DataFrame>,
    summary: FetchSummary,
}

impl Collected {
    fn record(&mut self, label: &str, result: Result<DataFrame>) {
        self.summary.requests += 1;
        match result {
            Ok(frame) if frame.height() == 0 => {
                self.summary.empty += 1;
                info!("∅ No rows for {}", label);
            }
            Ok(frame) => {
                self.summary.succeeded += 1;
                self.summary.rows += frame.height();
                info!("✅ {} rows for {}", frame.height(), label);
                self.frames.push(frame);
            }
            Err(e) => {
                self.summary.failed += 1;
                warn!("⚠️  Skipping {}: {:#}", label, e);
            }
        }
    }

    fn finish(mut self, output: &Path, what: &str) -> Result<FetchSummary> {
        if self.frames.is_empty() {
            error!("❌ No {} data fetched; nothing written", what);
            return Ok(self.summary);
        }
        let frame = concat(std::mem::take(&mut self.frames))?;
        write_csv(&frame, output)?;
        info!("💾 Saved {} {} rows to {}", frame.height(), what, output.display());
        self.summary.written = Some(output.to_path_buf());
        Ok(self.summary)
    }
}

pub struct RawFetcher<P> {
    provider: P,
    config: FetchConfig,
}

impl<P: StatsProvider> RawFetcher<P> {
    pub fn new(provider: P, config: FetchConfig) -> Self {
        Self { provider, config }
    }

    /// Fetches every active player's regular-season game log for each
    /// configured season. The player directory is written alongside, and
    /// only when the game log file was.
    pub async fn fetch_game_logs(&self, output: &Path, directory_path: &Path) -> Result<FetchSummary> {
        let Some(current_season) = self.config.seasons.last() else {
            bail!("no seasons configured");
        };

        info!("👥 Fetching active players for {}", current_season);
        let players = match self.provider.active_players(current_season).await {
            Ok(players) if !players.is_empty() => players,
            Ok(_) => {
                error!("❌ Active player list is empty");
                bail!("active player list is empty");
            }
            Err(e) => {
                error!("❌ Could not fetch active players: {:#}", e);
                return Err(e.context("fetching active players"));
            }
        };
        info!(
            "📋 {} active players, {} seasons: {:?}",
            players.len(),
            self.config.seasons.len(),
            self.config.seasons
        );

        let mut collected = Collected::default();
        let mut first = true;
        for season in &self.config.seasons {
            for player in &players {
                self.pace(&mut first).await;
                let label = format!("{} ({})", player.display_label(), season);
                let result = self.provider.player_game_log(player.player_id, season).await;
                collected.record(&label, result);
            }
        }
        let summary = collected.finish(output, "game log")?;
        if summary.written.is_some() {
            write_directory(&players, directory_path)?;
        }
        Ok(summary)
    }

    /// Fetches the league-wide opponent table per season, tagging each row
    /// with its season.
    pub async fn fetch_team_defense(&self, output: &Path) -> Result<FetchSummary> {
        let mut collected = Collected::default();
        let mut first = true;
        for season in &self.config.seasons {
            self.pace(&mut first).await;
            info!("🛡️  Fetching team opponent stats for {}", season);
            let result = self
                .provider
                .team_opponent_stats(season)
                .await
                .and_then(|mut frame| {
                    fill_column(&mut frame, SEASON, season)?;
                    Ok(frame)
                });
            collected.record(&format!("season {season}"), result);
        }
        collected.finish(output, "team defense")
    }

    async fn pace(&self, first: &mut bool) {
        if !*first && !self.config.request_delay.is_zero() {
            sleep(self.config.request_delay).await;
        }
        *first = false;
    }
}

/// Writes the directory in the `commonallplayers` column layout so it reads
/// back with [`players_from_frame`](crate::stats_api::players_from_frame).
pub fn write_directory(players: &[PlayerInfo], path: &Path) -> Result<()> {
    let headers = ["PERSON_ID", "DISPLAY_FIRST_LAST", "ROSTERSTATUS"].map(String::from);
    let rows: Vec<Vec<Option<String>>> = players
        .iter()
        .map(|player| {
            vec![
                Some(player.player_id.to_string()),
                Some(player.full_name.clone()),
                Some(if player.is_active { "1" } else { "0" }.to_string()),
            ]
        })
        .collect();
    write_csv(&from_rows("player directory", &headers, &rows)?, path)?;
    info!("💾 Saved player directory ({} players) to {}", players.len(), path.display());
    Ok(())
}
