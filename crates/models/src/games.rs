use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// Column names as the stats API emits them.
pub const PLAYER_ID: &str = "Player_ID";
pub const GAME_ID: &str = "Game_ID";
pub const GAME_DATE: &str = "GAME_DATE";
pub const MATCHUP: &str = "MATCHUP";
pub const WL: &str = "WL";

// Derived columns of the processed table.
pub const OPPONENT: &str = "OPPONENT";
pub const HOME: &str = "HOME";
pub const SEASON: &str = "Season";
pub const DAYS_REST: &str = "DAYS_REST";
pub const IS_B2B: &str = "IS_B2B";
pub const WIN_LAST_GAME: &str = "WIN_LAST_GAME";

/// Per-game counting stats kept from the raw game log, in output order.
pub const GAME_STAT_COLUMNS: [&str; 16] = [
    "MIN",
    "PTS",
    "AST",
    "REB",
    "FG3M",
    "FGM",
    "FGA",
    "FTM",
    "FTA",
    "OREB",
    "DREB",
    "TOV",
    "PF",
    "PLUS_MINUS",
    "STL",
    "BLK",
];

/// Trailing window sizes for the rolling-average columns.
pub const ROLLING_WINDOWS: [usize; 2] = [5, 10];

/// Rest assigned to a player's first observed game.
pub const DEFAULT_DAYS_REST: i64 = 7;

/// Name of the rolling-average column for `stat` over `window` games.
pub fn rolling_column(stat: &str, window: usize) -> String {
    format!("{stat}_MA_{window}")
}

/// One row of the raw player game log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLogRecord {
    pub player_id: i64,
    pub game_id: Option<String>,
    pub game_date: NaiveDate,
    pub matchup: String,
    pub wl: Option<String>,
    /// Values aligned with the stat columns present in the source table.
    pub stats: Vec<Option<f64>>,
}

impl GameLogRecord {
    pub fn is_win(&self) -> bool {
        self.wl.as_deref() == Some("W")
    }
}

/// Opponent-allowed per-game averages of one team in one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDefenseRecord {
    pub team_name: String,
    pub season: String,
    /// Values aligned with the defense columns present in the source table.
    pub stats: Vec<Option<f64>>,
}

/// Opponent and venue parsed from a `MATCHUP` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    pub opponent: Option<String>,
    pub home: bool,
}

impl Matchup {
    /// `"BOS vs. LAL"` is a home game against LAL, `"BOS @ LAL"` an away
    /// game. Anything else leaves the opponent unknown.
    pub fn parse(raw: &str) -> Self {
        let home = raw.contains("vs.");
        let opponent = if let Some((_, opp)) = raw.split_once('@') {
            Some(opp)
        } else if let Some((_, opp)) = raw.split_once("vs.") {
            Some(opp)
        } else {
            None
        };
        let opponent = opponent
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string);
        Self { opponent, home }
    }
}

/// Season label for a game date, split at October: `2023-11-05` belongs
/// to `2023-24`, `2023-03-05` to `2022-23`.
pub fn season_label(date: NaiveDate) -> String {
    let start = if date.month() >= 10 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{start}-{:02}", (start + 1).rem_euclid(100))
}

/// Parses the date formats seen in raw and processed files.
pub fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%b %d, %Y", "%m/%d/%Y", "%Y%m%d"];
    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parses a player id, tolerating the `2544.0` spelling pandas writes.
pub fn parse_player_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

/// 1 when at least two of the five categories reach double digits.
pub fn double_double_label(pts: f64, reb: f64, ast: f64, stl: f64, blk: f64) -> u8 {
    let categories = [pts, reb, ast, stl, blk]
        .iter()
        .filter(|&&v| v >= 10.0)
        .count();
    u8::from(categories >= 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_matchup_home_and_away() {
        assert_eq!(
            Matchup::parse("BOS vs. LAL"),
            Matchup { opponent: Some("LAL".into()), home: true }
        );
        assert_eq!(
            Matchup::parse("BOS @ LAL"),
            Matchup { opponent: Some("LAL".into()), home: false }
        );
    }

    #[test]
    fn test_matchup_unknown_format() {
        let parsed = Matchup::parse("BOS - LAL");
        assert_eq!(parsed.opponent, None);
        assert!(!parsed.home);
        assert_eq!(Matchup::parse("BOS @ ").opponent, None);
    }

    #[test]
    fn test_season_label() {
        assert_eq!(season_label(date(2023, 11, 5)), "2023-24");
        assert_eq!(season_label(date(2023, 3, 5)), "2022-23");
        assert_eq!(season_label(date(2023, 10, 1)), "2023-24");
        assert_eq!(season_label(date(2023, 9, 30)), "2022-23");
        assert_eq!(season_label(date(1999, 12, 1)), "1999-00");
    }

    #[test]
    fn test_parse_game_date_formats() {
        let expected = Some(date(2023, 11, 5));
        assert_eq!(parse_game_date("2023-11-05"), expected);
        assert_eq!(parse_game_date("NOV 05, 2023"), expected);
        assert_eq!(parse_game_date("2023-11-05 00:00:00"), expected);
        assert_eq!(parse_game_date("not a date"), None);
    }

    #[test]
    fn test_parse_player_id() {
        assert_eq!(parse_player_id("2544"), Some(2544));
        assert_eq!(parse_player_id("2544.0"), Some(2544));
        assert_eq!(parse_player_id("abc"), None);
    }

    #[test]
    fn test_double_double_boundaries() {
        // exactly two categories
        assert_eq!(double_double_label(10.0, 10.0, 3.0, 1.0, 0.0), 1);
        // exactly one category
        assert_eq!(double_double_label(30.0, 9.0, 9.0, 2.0, 1.0), 0);
        assert_eq!(double_double_label(0.0, 0.0, 0.0, 10.0, 10.0), 1);
        assert_eq!(double_double_label(0.0, 0.0, 0.0, 0.0, 0.0), 0);
    }

    proptest! {
        #[test]
        fn prop_season_contains_game_date(y in 1990i32..2090, m in 1u32..=12, d in 1u32..=28) {
            let label = season_label(date(y, m, d));
            let start: i32 = label[..4].parse().unwrap();
            prop_assert!(start == y || start == y - 1);
            prop_assert_eq!(start == y, m >= 10);
        }

        #[test]
        fn prop_matchup_extracts_opponent(team in "[A-Z]{3}", opp in "[A-Z]{3}", home in any::<bool>()) {
            let raw = if home { format!("{team} vs. {opp}") } else { format!("{team} @ {opp}") };
            let parsed = Matchup::parse(&raw);
            prop_assert_eq!(parsed.opponent, Some(opp));
            prop_assert_eq!(parsed.home, home);
        }
    }
}
