use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Regression targets, in the column order the ridge model is fitted on.
pub const REGRESSION_TARGETS: [&str; 4] = ["PTS", "AST", "REB", "FG3M"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionRequest {
    pub player_id: i64,
    pub opponent: String,
    pub home: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatPrediction {
    pub player_id: i64,
    pub player_name: String,
    pub opponent: String,
    pub home: bool,
    pub points: f64,
    pub assists: f64,
    pub rebounds: f64,
    pub threes_made: f64,
    pub double_double_prob: f64,
    /// Date of the game the feature values were copied from.
    pub based_on_game: Option<NaiveDate>,
    /// Feature values used, excluding the overridden opponent and venue.
    pub features_used: Vec<(String, f64)>,
    pub prediction_timestamp: DateTime<Utc>,
}

impl StatPrediction {
    /// Builds a prediction from the four regression outputs in
    /// [`REGRESSION_TARGETS`] order.
    pub fn new(request: &PredictionRequest, player_name: String, outputs: [f64; 4], double_double_prob: f64) -> Self {
        let [points, assists, rebounds, threes_made] = outputs;
        Self {
            player_id: request.player_id,
            player_name,
            opponent: request.opponent.clone(),
            home: request.home,
            points,
            assists,
            rebounds,
            threes_made,
            double_double_prob: double_double_prob.clamp(0.0, 1.0),
            based_on_game: None,
            features_used: Vec::new(),
            prediction_timestamp: Utc::now(),
        }
    }

    pub fn with_source_game(mut self, game_date: Option<NaiveDate>) -> Self {
        self.based_on_game = game_date;
        self
    }

    pub fn with_features(mut self, features: Vec<(String, f64)>) -> Self {
        self.features_used = features;
        self
    }

    pub fn double_double_percent(&self) -> f64 {
        self.double_double_prob * 100.0
    }
}

/// Entry of the player directory used to label the form's selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerInfo {
    pub player_id: i64,
    pub full_name: String,
    pub is_active: bool,
}

impl PlayerInfo {
    /// `"Name (ID)"` as shown in the selector.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.full_name, self.player_id)
    }
}
