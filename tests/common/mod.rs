// Synthetic raw tables and a trained workspace shared by the integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use hoop_ml::{FeatureBuilder, ForestConfig, Trainer, TrainingConfig};
use hoop_models::table::{from_rows, write_csv};
use hoop_models::{PlayerInfo, GAME_STAT_COLUMNS};
use polars::prelude::DataFrame;
use hoop_services::{write_directory, PredictorPaths};

pub const PLAYERS: [(i64, &str); 3] = [
    (2544, "LeBron James"),
    (201939, "Stephen Curry"),
    (1628369, "Jayson Tatum"),
];
pub const OPPONENTS: [&str; 5] = ["BOS", "LAL", "NYK", "DEN", "MIA"];
pub const GAMES_PER_PLAYER: usize = 24;

/// Boston appears twice; the first row is the one that should be used.
pub const BOS_OPP_PTS: f64 = 107.2;

pub struct RawInputs {
    pub game_logs: PathBuf,
    pub defense: PathBuf,
    pub processed: PathBuf,
    pub directory: PathBuf,
    pub models: PathBuf,
}

impl RawInputs {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            game_logs: dir.join("raw/nba_player_gamelogs_raw.csv"),
            defense: dir.join("raw/nba_team_defense_stats_raw.csv"),
            processed: dir.join("processed/nba_player_gamelogs_processed.csv"),
            directory: dir.join("raw/nba_players.csv"),
            models: dir.join("models"),
        }
    }

    pub fn predictor_paths(&self) -> PredictorPaths {
        PredictorPaths {
            model_dir: self.models.clone(),
            processed_features: self.processed.clone(),
            player_directory: self.directory.clone(),
        }
    }
}

/// Deterministic box score, in `GAME_STAT_COLUMNS` order.
pub fn game_stats(player_id: i64, game: usize) -> [f64; 16] {
    let k = game as i64 + player_id % 97;
    let pts = 6 + (k * 7) % 25;
    let reb = 2 + (k * 5) % 12;
    let fgm = pts / 2;
    let ftm = k % 6;
    let oreb = reb / 4;
    [
        (20 + k % 18) as f64,
        pts as f64,
        (1 + (k * 3) % 11) as f64,
        reb as f64,
        (k % 5) as f64,
        fgm as f64,
        (fgm * 2 + 1) as f64,
        ftm as f64,
        (ftm + 1) as f64,
        oreb as f64,
        (reb - oreb) as f64,
        (k % 4) as f64,
        (k % 5) as f64,
        ((k % 21) - 10) as f64,
        (k % 3) as f64,
        (k % 2) as f64,
    ]
}

pub fn game_date(game: usize) -> NaiveDate {
    let start = NaiveDate::from_ymd_opt(2023, 10, 25).unwrap();
    // every fourth game follows a back-to-back gap
    let offset: i64 = (1..=game).map(|i| if i % 4 == 0 { 1 } else { 2 }).sum();
    start + Duration::days(offset)
}

pub fn opponent(player_id: i64, game: usize) -> &'static str {
    OPPONENTS[(game + player_id as usize) % OPPONENTS.len()]
}

pub fn is_home(game: usize) -> bool {
    game % 2 == 0
}

pub fn is_win(player_id: i64, game: usize) -> bool {
    (game as i64 + player_id) % 3 == 0
}

fn text_table(headers: &[&str], rows: Vec<Vec<String>>) -> DataFrame {
    let headers: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    let rows: Vec<Vec<Option<String>>> = rows
        .into_iter()
        .map(|row| row.into_iter().map(Some).collect())
        .collect();
    from_rows("test table", &headers, &rows).unwrap()
}

/// Game logs in the API's layout, newest game first per player.
pub fn raw_game_logs() -> DataFrame {
    let mut columns = vec!["SEASON_ID", "Player_ID", "Game_ID", "GAME_DATE", "MATCHUP", "WL"];
    columns.extend(GAME_STAT_COLUMNS);

    let mut rows = Vec::new();
    for (player_id, _) in PLAYERS {
        for game in (0..GAMES_PER_PLAYER).rev() {
            let opp = opponent(player_id, game);
            let matchup = if is_home(game) {
                format!("GSW vs. {opp}")
            } else {
                format!("GSW @ {opp}")
            };
            let mut cells = vec![
                "22023".to_string(),
                player_id.to_string(),
                format!("00223{:05}{game:02}", player_id % 100_000),
                game_date(game).format("%Y-%m-%d").to_string(),
                matchup,
                if is_win(player_id, game) { "W" } else { "L" }.to_string(),
            ];
            cells.extend(game_stats(player_id, game).iter().map(|v| v.to_string()));
            rows.push(cells);
        }
    }
    text_table(&columns, rows)
}

/// Opponent stats as the API names them. Miami is missing on purpose and
/// Utah never appears as an opponent.
pub fn raw_defense() -> DataFrame {
    let teams = [
        ("Boston Celtics", BOS_OPP_PTS),
        ("Los Angeles Lakers", 114.8),
        ("New York Knicks", 108.2),
        ("Denver Nuggets", 109.6),
        ("Utah Jazz", 120.5),
        ("Boston Celtics", 999.0),
    ];
    let rows = teams
        .iter()
        .map(|(team, pts)| {
            [*team, pts.to_string().as_str(), "0.46", "0.355", "25.1", "43.0", "7.2", "4.9", "2023-24"]
                .map(String::from)
                .to_vec()
        })
        .collect();
    text_table(
        &[
            "TEAM_NAME", "OPP_PTS", "OPP_FG_PCT", "OPP_FG3_PCT", "OPP_AST", "OPP_REB", "OPP_STL",
            "OPP_BLK", "Season",
        ],
        rows,
    )
}

pub fn directory() -> Vec<PlayerInfo> {
    PLAYERS
        .iter()
        .map(|(player_id, name)| PlayerInfo {
            player_id: *player_id,
            full_name: (*name).to_string(),
            is_active: true,
        })
        .collect()
}

pub fn write_raw_inputs(dir: &Path) -> RawInputs {
    let inputs = RawInputs::in_dir(dir);
    write_csv(&raw_game_logs(), &inputs.game_logs).unwrap();
    write_csv(&raw_defense(), &inputs.defense).unwrap();
    write_directory(&directory(), &inputs.directory).unwrap();
    inputs
}

pub fn small_training_config() -> TrainingConfig {
    TrainingConfig {
        forest: ForestConfig {
            n_trees: 8,
            min_samples_leaf: 2,
            ..ForestConfig::default()
        },
        ..TrainingConfig::default()
    }
}

/// Raw files, processed table and model artifacts, all under `dir`.
pub fn trained_workspace(dir: &Path) -> RawInputs {
    let inputs = write_raw_inputs(dir);
    FeatureBuilder::new()
        .run(&inputs.game_logs, &inputs.defense, &inputs.processed)
        .unwrap();
    Trainer::new(small_training_config())
        .run(&inputs.processed, &inputs.models)
        .unwrap();
    inputs
}
