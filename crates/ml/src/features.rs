//! Feature engineering: joins raw game logs with opponent defense and derives
//! rolling, rest and streak columns per player.

use std::collections::HashSet;
use std::path::Path;

use chrono::Datelike;
use hoop_models::table::{has_column, missing_columns, numeric_column, read_csv, text_column, write_csv};
use hoop_models::{
    parse_game_date, parse_player_id, rolling_column, season_label, team_abbreviation,
    GameLogRecord, HoopError, Matchup, Result, TeamDefenseRecord, DAYS_REST, DEFAULT_DAYS_REST,
    GAME_DATE, GAME_ID, GAME_STAT_COLUMNS, HOME, IS_B2B, MATCHUP, OPPONENT, PLAYER_ID,
    ROLLING_WINDOWS, SEASON, WIN_LAST_GAME, WL,
};
use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

/// Raw defense stat and the processed column it becomes. The API's opponent
/// view spells the source columns with an `OPP_` prefix; both are accepted.
pub const DEFENSE_COLUMNS: [(&str, &str); 7] = [
    ("PTS", "OPP_PTS_PER_G"),
    ("FG_PCT", "OPP_FG_PCT"),
    ("FG3_PCT", "OPP_FG3_PCT"),
    ("AST", "OPP_AST_PER_G"),
    ("REB", "OPP_REB_PER_G"),
    ("STL", "OPP_STL_PER_G"),
    ("BLK", "OPP_BLK_PER_G"),
];

const REQUIRED_GAME_COLUMNS: [&str; 3] = [PLAYER_ID, GAME_DATE, MATCHUP];
const TEAM_NAME_COLUMNS: [&str; 2] = ["TEAM_NAME", "Team"];

// Working columns, dropped before output.
const DAY_NUMBER: &str = "__day";
const WON: &str = "__won";

#[derive(Debug, Clone, PartialEq)]
struct DefenseColumn {
    source: String,
    output: &'static str,
}

/// The one place where the raw schemas are narrowed to what is actually
/// present. Optional columns that are absent are dropped from the output
/// instead of failing the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaReconciliation {
    pub stat_columns: Vec<&'static str>,
    pub has_game_id: bool,
    pub has_wl: bool,
    pub team_column: String,
    defense_columns: Vec<DefenseColumn>,
    pub dropped_columns: Vec<String>,
}

impl SchemaReconciliation {
    pub fn reconcile(game_logs: &DataFrame, defense: &DataFrame) -> Result<Self> {
        let missing = missing_columns(game_logs, &REQUIRED_GAME_COLUMNS);
        if !missing.is_empty() {
            return Err(HoopError::missing_columns(
                "raw game logs",
                missing.into_iter().map(String::from).collect(),
            ));
        }

        let team_column = TEAM_NAME_COLUMNS
            .iter()
            .find(|c| has_column(defense, c))
            .map(|c| (*c).to_string());
        let Some(team_column) = team_column else {
            return Err(HoopError::missing_columns(
                "raw team defense",
                vec![TEAM_NAME_COLUMNS.join(" or ")],
            ));
        };
        if !has_column(defense, SEASON) {
            return Err(HoopError::missing_columns("raw team defense", vec![SEASON.to_string()]));
        }

        let mut dropped_columns = Vec::new();
        let stat_columns: Vec<&'static str> = GAME_STAT_COLUMNS
            .iter()
            .copied()
            .filter(|c| {
                let present = has_column(game_logs, c);
                if !present {
                    dropped_columns.push((*c).to_string());
                }
                present
            })
            .collect();

        let has_game_id = has_column(game_logs, GAME_ID);
        let has_wl = has_column(game_logs, WL);
        for (present, name) in [(has_game_id, GAME_ID), (has_wl, WL)] {
            if !present {
                dropped_columns.push(name.to_string());
            }
        }

        let mut defense_columns = Vec::new();
        for (source, output) in DEFENSE_COLUMNS {
            let prefixed = format!("OPP_{source}");
            if has_column(defense, source) {
                defense_columns.push(DefenseColumn { source: source.to_string(), output });
            } else if has_column(defense, &prefixed) {
                defense_columns.push(DefenseColumn { source: prefixed, output });
            } else {
                dropped_columns.push(output.to_string());
            }
        }

        if !dropped_columns.is_empty() {
            warn!("⚠️  Optional columns absent, narrowing schema: {:?}", dropped_columns);
        }

        Ok(Self {
            stat_columns,
            has_game_id,
            has_wl,
            team_column,
            defense_columns,
            dropped_columns,
        })
    }

    pub fn defense_outputs(&self) -> Vec<&'static str> {
        self.defense_columns.iter().map(|c| c.output).collect()
    }

    fn rolling_columns(&self) -> Vec<String> {
        ROLLING_WINDOWS
            .iter()
            .flat_map(|&w| self.stat_columns.iter().map(move |s| rolling_column(s, w)))
            .collect()
    }

    /// Output header of the processed table.
    pub fn output_columns(&self) -> Vec<String> {
        let mut columns = vec![PLAYER_ID.to_string()];
        if self.has_game_id {
            columns.push(GAME_ID.to_string());
        }
        columns.push(GAME_DATE.to_string());
        columns.extend(self.stat_columns.iter().map(|s| (*s).to_string()));
        columns.extend([OPPONENT, HOME, SEASON].map(String::from));
        columns.extend(self.defense_outputs().into_iter().map(String::from));
        columns.extend(self.rolling_columns());
        columns.extend([DAYS_REST, IS_B2B, WIN_LAST_GAME].map(String::from));
        columns
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FeatureReport {
    pub input_rows: usize,
    pub output_rows: usize,
    pub players: usize,
    pub malformed_rows: usize,
    pub unknown_opponent_rows: usize,
    pub unmatched_defense_rows: usize,
    pub defense_rows_used: usize,
    pub dropped_columns: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Reads both raw tables, builds the processed table and writes it.
    pub fn run(
        &self,
        raw_gamelog_path: &Path,
        raw_defense_path: &Path,
        output_path: &Path,
    ) -> Result<FeatureReport> {
        info!("🏗️  Starting feature engineering");
        info!("📥 Loading raw game logs from {}", raw_gamelog_path.display());
        let game_logs = read_csv(raw_gamelog_path)?;
        info!("📥 Loading team defense stats from {}", raw_defense_path.display());
        let defense = read_csv(raw_defense_path)?;

        let (processed, report) = self.build(&game_logs, &defense)?;

        write_csv(&processed, output_path)?;
        info!(
            "✅ Features written to {} ({} rows, {} columns)",
            output_path.display(),
            processed.height(),
            processed.width()
        );
        Ok(report)
    }

    pub fn build(&self, game_logs: &DataFrame, defense: &DataFrame) -> Result<(DataFrame, FeatureReport)> {
        let schema = SchemaReconciliation::reconcile(game_logs, defense)?;
        let mut report = FeatureReport {
            input_rows: game_logs.height(),
            dropped_columns: schema.dropped_columns.clone(),
            ..FeatureReport::default()
        };

        let (records, malformed) = parse_game_logs(game_logs, &schema)?;
        report.malformed_rows = malformed;
        if malformed > 0 {
            warn!("⚠️  Skipped {} game rows with an unreadable player id or date", malformed);
        }
        let games = GameTable::from_records(&records);

        let opponents: HashSet<&str> = games.opponents.iter().flatten().map(String::as_str).collect();
        let defense_records = parse_defense(defense, &schema)?;
        let (defense_frame, defense_keys) = defense_table(&schema, &defense_records, &opponents)?;
        report.defense_rows_used = defense_keys.len();
        info!(
            "🛡️  Defense columns selected for merge: {:?} ({} team-seasons)",
            schema.defense_outputs(),
            defense_keys.len()
        );

        report.output_rows = games.player_ids.len();
        report.players = games.player_ids.iter().collect::<HashSet<_>>().len();
        report.unknown_opponent_rows = games.opponents.iter().filter(|o| o.is_none()).count();
        report.unmatched_defense_rows = games
            .opponents
            .iter()
            .zip(&games.seasons)
            .filter(|(opponent, season)| {
                opponent
                    .as_ref()
                    .is_some_and(|o| !defense_keys.contains(&((*season).clone(), o.clone())))
            })
            .count();
        if report.unknown_opponent_rows > 0 {
            warn!(
                "⚠️  {} rows have a MATCHUP without a recognizable opponent; OPPONENT left empty",
                report.unknown_opponent_rows
            );
        }
        if report.unmatched_defense_rows > 0 {
            warn!(
                "⚠️  {} rows found no defense stats for their opponent/season",
                report.unmatched_defense_rows
            );
        }

        info!("📈 Computing rolling averages and rest features");
        let output: Vec<Expr> = schema.output_columns().iter().map(|c| col(c.as_str())).collect();
        let processed = games
            .into_frame(&schema)?
            .lazy()
            .join(
                defense_frame.lazy(),
                [col(SEASON), col(OPPONENT)],
                [col(SEASON), col(OPPONENT)],
                JoinArgs::new(JoinType::Left),
            )
            .sort(
                [PLAYER_ID, DAY_NUMBER],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .with_columns(history_features(&schema))
            .with_column(col(DAYS_REST).eq(lit(0)).cast(DataType::Int32).alias(IS_B2B))
            .select(output)
            .collect()?;

        Ok((processed, report))
    }
}

/// Per-player history columns. Rows must already be ordered by player, then
/// date; every expression looks only at earlier rows of the same player.
fn history_features(schema: &SchemaReconciliation) -> Vec<Expr> {
    let mut exprs = Vec::new();
    for &window in &ROLLING_WINDOWS {
        for stat in &schema.stat_columns {
            let options = RollingOptionsFixedWindow {
                window_size: window,
                min_periods: 1,
                ..Default::default()
            };
            exprs.push(
                col(*stat)
                    .shift(lit(1))
                    .rolling_mean(options)
                    .over([col(PLAYER_ID)])
                    .fill_null(lit(0.0))
                    .alias(rolling_column(stat, window)),
            );
        }
    }
    exprs.push(
        (col(DAY_NUMBER) - col(DAY_NUMBER).shift(lit(1)) - lit(1))
            .over([col(PLAYER_ID)])
            .fill_null(lit(DEFAULT_DAYS_REST))
            .cast(DataType::Int64)
            .alias(DAYS_REST),
    );
    exprs.push(
        col(WON)
            .shift(lit(1))
            .over([col(PLAYER_ID)])
            .fill_null(lit(0))
            .cast(DataType::Int32)
            .alias(WIN_LAST_GAME),
    );
    exprs
}

fn parse_game_logs(frame: &DataFrame, schema: &SchemaReconciliation) -> Result<(Vec<GameLogRecord>, usize)> {
    let player_ids = text_column(frame, PLAYER_ID)?;
    let dates = text_column(frame, GAME_DATE)?;
    let matchups = text_column(frame, MATCHUP)?;
    let game_ids = optional_text(frame, GAME_ID)?;
    let results = optional_text(frame, WL)?;
    let stats = schema
        .stat_columns
        .iter()
        .map(|c| numeric_column(frame, c))
        .collect::<Result<Vec<_>>>()?;

    let mut games = Vec::with_capacity(frame.height());
    let mut malformed = 0;
    for idx in 0..frame.height() {
        let player_id = player_ids[idx].as_deref().and_then(parse_player_id);
        let game_date = dates[idx].as_deref().and_then(parse_game_date);
        let (Some(player_id), Some(game_date)) = (player_id, game_date) else {
            malformed += 1;
            continue;
        };
        games.push(GameLogRecord {
            player_id,
            game_id: game_ids[idx].clone(),
            game_date,
            matchup: matchups[idx].clone().unwrap_or_default(),
            wl: results[idx].clone(),
            stats: stats.iter().map(|column| column[idx]).collect(),
        });
    }
    Ok((games, malformed))
}

/// Text of a column that may be absent; absent reads as all `None`.
fn optional_text(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    if has_column(frame, name) {
        text_column(frame, name)
    } else {
        Ok(vec![None; frame.height()])
    }
}

fn parse_defense(frame: &DataFrame, schema: &SchemaReconciliation) -> Result<Vec<TeamDefenseRecord>> {
    let teams = text_column(frame, &schema.team_column)?;
    let seasons = text_column(frame, SEASON)?;
    let stats = schema
        .defense_columns
        .iter()
        .map(|c| numeric_column(frame, &c.source))
        .collect::<Result<Vec<_>>>()?;

    Ok(teams
        .into_iter()
        .zip(seasons)
        .enumerate()
        .filter_map(|(idx, (team_name, season))| {
            Some(TeamDefenseRecord {
                team_name: team_name?,
                season: season?,
                stats: stats.iter().map(|column| column[idx]).collect(),
            })
        })
        .collect())
}

/// Defense stats keyed by (season, team code), restricted to teams that
/// show up as an opponent. The first row wins on duplicate keys.
fn defense_table(
    schema: &SchemaReconciliation,
    records: &[TeamDefenseRecord],
    opponents: &HashSet<&str>,
) -> Result<(DataFrame, HashSet<(String, String)>)> {
    let mut seasons = Vec::new();
    let mut teams = Vec::new();
    let mut stats: Vec<Vec<Option<f64>>> = vec![Vec::new(); schema.defense_columns.len()];
    for record in records {
        let Some(abbr) = team_abbreviation(&record.team_name) else {
            continue;
        };
        if !opponents.contains(abbr) {
            continue;
        }
        seasons.push(record.season.clone());
        teams.push(abbr.to_string());
        for (column, value) in stats.iter_mut().zip(&record.stats) {
            column.push(*value);
        }
    }

    let mut columns = vec![
        Column::new(SEASON.into(), seasons),
        Column::new(OPPONENT.into(), teams),
    ];
    for (column, values) in schema.defense_columns.iter().zip(stats) {
        columns.push(Column::new(column.output.into(), values));
    }
    let table = DataFrame::new(columns)?
        .lazy()
        .unique_stable(
            Some(vec![SEASON.into(), OPPONENT.into()]),
            UniqueKeepStrategy::First,
        )
        .collect()?;

    let keys = text_column(&table, SEASON)?
        .into_iter()
        .zip(text_column(&table, OPPONENT)?)
        .filter_map(|(season, team)| Some((season?, team?)))
        .collect();
    Ok((table, keys))
}

/// Parsed game rows laid out column-wise, with the matchup, season and
/// result already derived.
struct GameTable<'a> {
    records: &'a [GameLogRecord],
    player_ids: Vec<i64>,
    opponents: Vec<Option<String>>,
    seasons: Vec<String>,
}

impl<'a> GameTable<'a> {
    fn from_records(records: &'a [GameLogRecord]) -> Self {
        Self {
            records,
            player_ids: records.iter().map(|g| g.player_id).collect(),
            opponents: records.iter().map(|g| Matchup::parse(&g.matchup).opponent).collect(),
            seasons: records.iter().map(|g| season_label(g.game_date)).collect(),
        }
    }

    fn into_frame(self, schema: &SchemaReconciliation) -> Result<DataFrame> {
        let records = self.records;
        let mut columns = vec![Column::new(PLAYER_ID.into(), self.player_ids)];
        if schema.has_game_id {
            let ids: Vec<Option<String>> = records.iter().map(|g| g.game_id.clone()).collect();
            columns.push(Column::new(GAME_ID.into(), ids));
        }
        let dates: Vec<String> = records
            .iter()
            .map(|g| g.game_date.format("%Y-%m-%d").to_string())
            .collect();
        columns.push(Column::new(GAME_DATE.into(), dates));
        for (idx, stat) in schema.stat_columns.iter().enumerate() {
            let values: Vec<Option<f64>> = records.iter().map(|g| g.stats[idx]).collect();
            columns.push(Column::new((*stat).into(), values));
        }
        let home: Vec<i32> = records
            .iter()
            .map(|g| i32::from(Matchup::parse(&g.matchup).home))
            .collect();
        columns.push(Column::new(OPPONENT.into(), self.opponents));
        columns.push(Column::new(HOME.into(), home));
        columns.push(Column::new(SEASON.into(), self.seasons));
        let days: Vec<i32> = records.iter().map(|g| g.game_date.num_days_from_ce()).collect();
        columns.push(Column::new(DAY_NUMBER.into(), days));
        let won: Vec<i32> = records.iter().map(|g| i32::from(g.is_win())).collect();
        columns.push(Column::new(WON.into(), won));
        Ok(DataFrame::new(columns)?)
    }
}
