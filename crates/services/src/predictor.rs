// Prediction service: process-scoped model artifacts and feature table

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use hoop_ml::ModelArtifactBundle;
use hoop_models::table::{column_names, missing_columns, numeric_column, read_csv, text_column};
use hoop_models::{
    parse_game_date, parse_player_id, HoopError, PlayerInfo, PredictionRequest, StatPrediction,
    GAME_DATE, HOME, OPPONENT, PLAYER_ID,
};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::stats_api::players_from_frame;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorPaths {
    pub model_dir: PathBuf,
    pub processed_features: PathBuf,
    pub player_directory: PathBuf,
}

/// A player's most recent processed game, with its values for every
/// numeric model input in training order.
#[derive(Debug, Clone, PartialEq)]
struct LatestGame {
    date: Option<NaiveDate>,
    values: Vec<Option<f64>>,
}

/// Everything loaded from disk for serving. Immutable once built; a reload
/// swaps the whole value.
pub struct PredictorAssets {
    bundle: ModelArtifactBundle,
    latest: HashMap<i64, LatestGame>,
    players: Vec<PlayerInfo>,
    opponents: Vec<String>,
}

impl PredictorAssets {
    pub fn load(paths: &PredictorPaths) -> hoop_models::Result<Self> {
        let bundle = ModelArtifactBundle::load(&paths.model_dir)?;
        let features = read_csv(&paths.processed_features)?;
        let directory = match read_csv(&paths.player_directory) {
            Ok(frame) => players_from_frame(&frame).map_err(|e| HoopError::Artifact(format!("{e:#}")))?,
            Err(e) if e.is_missing_input() => {
                warn!(
                    "⚠️  Player directory {} not found; labelling players by id",
                    paths.player_directory.display()
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        Self::from_parts(bundle, &features, &directory)
    }

    pub fn from_parts(
        bundle: ModelArtifactBundle,
        features: &DataFrame,
        directory: &[PlayerInfo],
    ) -> hoop_models::Result<Self> {
        let missing = missing_columns(features, &[PLAYER_ID, GAME_DATE, OPPONENT]);
        if !missing.is_empty() {
            return Err(HoopError::missing_columns(
                "processed features",
                missing.into_iter().map(String::from).collect(),
            ));
        }
        bundle.preprocessor.check_columns(&column_names(features))?;

        let player_ids = text_column(features, PLAYER_ID)?;
        let dates = text_column(features, GAME_DATE)?;
        let opponents: BTreeSet<String> = text_column(features, OPPONENT)?.into_iter().flatten().collect();
        let numeric = bundle
            .preprocessor
            .numeric_columns()
            .iter()
            .map(|c| numeric_column(features, c))
            .collect::<hoop_models::Result<Vec<_>>>()?;

        // latest game per player; ties keep the later row
        let mut latest_rows: HashMap<i64, (Option<NaiveDate>, usize)> = HashMap::new();
        for (idx, (player_id, date)) in player_ids.iter().zip(&dates).enumerate() {
            let Some(player_id) = player_id.as_deref().and_then(parse_player_id) else {
                continue;
            };
            let date = date.as_deref().and_then(parse_game_date);
            latest_rows
                .entry(player_id)
                .and_modify(|entry| {
                    if date >= entry.0 {
                        *entry = (date, idx);
                    }
                })
                .or_insert((date, idx));
        }
        let latest: HashMap<i64, LatestGame> = latest_rows
            .into_iter()
            .map(|(id, (date, idx))| {
                let values = numeric.iter().map(|column| column[idx]).collect();
                (id, LatestGame { date, values })
            })
            .collect();

        let names: HashMap<i64, &PlayerInfo> = directory.iter().map(|p| (p.player_id, p)).collect();
        let mut players: Vec<PlayerInfo> = latest
            .keys()
            .map(|id| match names.get(id) {
                Some(info) => (*info).clone(),
                None => PlayerInfo {
                    player_id: *id,
                    full_name: id.to_string(),
                    is_active: true,
                },
            })
            .collect();
        players.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.player_id.cmp(&b.player_id)));

        info!(
            "📦 Predictor ready: {} players, {} opponents, {} feature rows",
            players.len(),
            opponents.len(),
            features.height()
        );

        Ok(Self {
            bundle,
            latest,
            players,
            opponents: opponents.into_iter().collect(),
        })
    }

    /// Scores the player's most recent game with the requested opponent and
    /// venue substituted in.
    pub fn predict(&self, request: &PredictionRequest) -> hoop_models::Result<StatPrediction> {
        let game = self
            .latest
            .get(&request.player_id)
            .ok_or(HoopError::PlayerNotFound {
                player_id: request.player_id,
            })?;

        let home = if request.home { 1.0 } else { 0.0 };
        let preprocessor = &self.bundle.preprocessor;
        let mut values = game.values.iter();
        let x = preprocessor.transform_one(Some(request.opponent.as_str()), |column| {
            let value = values.next().copied().flatten();
            Ok(if column == HOME { Some(home) } else { value })
        })?;
        let (outputs, probability) = self.bundle.score(&x)?;

        let offset = preprocessor.encoder().width();
        let features_used = preprocessor
            .numeric_columns()
            .iter()
            .enumerate()
            .filter(|(_, column)| column.as_str() != HOME)
            .map(|(i, column)| (column.clone(), x[offset + i]))
            .collect();

        Ok(StatPrediction::new(request, self.player_name(request.player_id), outputs, probability)
            .with_source_game(game.date)
            .with_features(features_used))
    }

    pub fn player_name(&self, player_id: i64) -> String {
        self.players
            .iter()
            .find(|p| p.player_id == player_id)
            .map_or_else(|| player_id.to_string(), |p| p.full_name.clone())
    }

    /// Players with at least one processed row, sorted by name.
    pub fn players(&self) -> &[PlayerInfo] {
        &self.players
    }

    /// Opponent abbreviations seen in the processed table, sorted.
    pub fn opponents(&self) -> &[String] {
        &self.opponents
    }
}

enum AssetState {
    Ready(Arc<PredictorAssets>),
    Unavailable(String),
}

/// Shared handle to the serving assets. Loaded once at startup and replaced
/// wholesale by [`reload`](Self::reload).
pub struct PredictorService {
    paths: PredictorPaths,
    state: RwLock<AssetState>,
}

impl PredictorService {
    /// Loads the assets; a failure is kept as a message so the server can
    /// still start and report it.
    pub async fn load(paths: PredictorPaths) -> Self {
        let state = match Self::read_assets(paths.clone()).await {
            Ok(assets) => AssetState::Ready(Arc::new(assets)),
            Err(e) => {
                error!("❌ Prediction assets unavailable: {:#}", e);
                AssetState::Unavailable(format!("{e:#}"))
            }
        };
        Self {
            paths,
            state: RwLock::new(state),
        }
    }

    pub fn with_assets(paths: PredictorPaths, assets: PredictorAssets) -> Self {
        Self {
            paths,
            state: RwLock::new(AssetState::Ready(Arc::new(assets))),
        }
    }

    /// Re-reads every asset from disk. On failure the previous assets stay
    /// in place.
    pub async fn reload(&self) -> Result<()> {
        info!("🔄 Reloading prediction assets");
        let assets = Self::read_assets(self.paths.clone()).await?;
        *self.state.write().await = AssetState::Ready(Arc::new(assets));
        Ok(())
    }

    pub async fn assets(&self) -> hoop_models::Result<Arc<PredictorAssets>> {
        match &*self.state.read().await {
            AssetState::Ready(assets) => Ok(Arc::clone(assets)),
            AssetState::Unavailable(reason) => Err(HoopError::Artifact(format!(
                "prediction assets are not loaded ({reason}); run the pipeline first"
            ))),
        }
    }

    pub async fn is_ready(&self) -> bool {
        matches!(&*self.state.read().await, AssetState::Ready(_))
    }

    pub async fn predict(&self, request: &PredictionRequest) -> hoop_models::Result<StatPrediction> {
        let assets = self.assets().await?;
        let prediction = assets.predict(request)?;
        info!(
            "🔮 {} vs {} ({}): {:.1} pts, {:.1} ast, {:.1} reb, {:.1} 3pm, {:.1}% double-double",
            prediction.player_name,
            prediction.opponent,
            if prediction.home { "home" } else { "away" },
            prediction.points,
            prediction.assists,
            prediction.rebounds,
            prediction.threes_made,
            prediction.double_double_percent()
        );
        Ok(prediction)
    }

    pub async fn players(&self) -> hoop_models::Result<Vec<PlayerInfo>> {
        Ok(self.assets().await?.players().to_vec())
    }

    pub async fn teams(&self) -> hoop_models::Result<Vec<String>> {
        Ok(self.assets().await?.opponents().to_vec())
    }

    async fn read_assets(paths: PredictorPaths) -> Result<PredictorAssets> {
        tokio::task::spawn_blocking(move || PredictorAssets::load(&paths))
            .await
            .context("asset loading task panicked")?
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoop_ml::{ForestConfig, Trainer, TrainingConfig};

    const FEATURES: &str = "\
Player_ID,GAME_DATE,OPPONENT,HOME,MIN,PTS,AST,REB,FG3M,STL,BLK,DAYS_REST,IS_B2B,WIN_LAST_GAME,PTS_MA_5
1,2024-01-02,BOS,1,30,20,5,6,2,1,0,7,0,0,0
1,2024-01-05,NYK,0,34,28,11,10,3,2,1,2,0,1,20
1,2024-01-03,LAL,1,20,8,2,3,0,0,0,0,1,0,20
2,2024-01-02,LAL,0,25,12,3,12,1,0,2,7,0,0,0
2,2024-01-04,BOS,1,28,15,4,11,1,1,1,1,0,0,12
3,2024-01-04,NYK,1,12,4,1,2,0,0,0,7,0,0,0
";

    fn assets() -> PredictorAssets {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        std::fs::write(&path, FEATURES).unwrap();
        let frame = read_csv(&path).unwrap();
        let trainer = Trainer::new(TrainingConfig {
            forest: ForestConfig {
                n_trees: 5,
                min_samples_leaf: 1,
                ..ForestConfig::default()
            },
            ..TrainingConfig::default()
        });
        let (bundle, _) = trainer.train(&frame).unwrap();
        let directory = vec![PlayerInfo {
            player_id: 2,
            full_name: "Alpha Center".to_string(),
            is_active: true,
        }];
        PredictorAssets::from_parts(bundle, &frame, &directory).unwrap()
    }

    #[test]
    fn test_latest_row_and_directory_fallback() {
        let assets = assets();
        assert_eq!(assets.latest[&1].date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(assets.latest[&2].date, NaiveDate::from_ymd_opt(2024, 1, 4));
        assert_eq!(assets.opponents(), &["BOS", "LAL", "NYK"]);
        assert_eq!(assets.players()[0].full_name, "1");
        assert_eq!(assets.player_name(2), "Alpha Center");
        assert_eq!(assets.player_name(3), "3");
    }

    #[test]
    fn test_predict_known_player() {
        let assets = assets();
        let request = PredictionRequest {
            player_id: 1,
            opponent: "BOS".to_string(),
            home: true,
        };
        let prediction = assets.predict(&request).unwrap();

        assert!((0.0..=1.0).contains(&prediction.double_double_prob));
        assert!(prediction.points.is_finite());
        assert_eq!(prediction.based_on_game, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert!(prediction.features_used.iter().all(|(c, _)| c != HOME && c != OPPONENT));
        assert!(prediction.features_used.contains(&("MIN".to_string(), 34.0)));
    }

    #[test]
    fn test_unseen_opponent_still_predicts() {
        let request = PredictionRequest {
            player_id: 2,
            opponent: "SEA".to_string(),
            home: false,
        };
        assert!(assets().predict(&request).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_player_is_not_found() {
        let paths = PredictorPaths {
            model_dir: PathBuf::from("unused"),
            processed_features: PathBuf::from("unused.csv"),
            player_directory: PathBuf::from("unused.csv"),
        };
        let service = PredictorService::with_assets(paths, assets());
        let request = PredictionRequest {
            player_id: 99,
            opponent: "BOS".to_string(),
            home: true,
        };
        let err = service.predict(&request).await.err().unwrap();
        assert!(matches!(err, HoopError::PlayerNotFound { player_id: 99 }));
    }

    #[tokio::test]
    async fn test_missing_assets_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PredictorPaths {
            model_dir: dir.path().join("models"),
            processed_features: dir.path().join("processed.csv"),
            player_directory: dir.path().join("players.csv"),
        };
        let service = PredictorService::load(paths).await;
        assert!(!service.is_ready().await);
        assert!(service.teams().await.is_err());
        assert!(service.reload().await.is_err());
    }
}
