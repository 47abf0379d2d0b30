use std::path::Path;

use hoop_models::table::{column_names, missing_columns, numeric_column, read_csv, text_column};
use hoop_models::{
    double_double_label, HoopError, Result, DAYS_REST, HOME, IS_B2B, OPPONENT, REGRESSION_TARGETS,
    WIN_LAST_GAME,
};
use ndarray::{Array1, Array2};
use polars::prelude::{BooleanChunked, DataFrame, NamedFrom};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::artifacts::ModelArtifactBundle;
use crate::evaluation::{accuracy, positive_rate, rmse};
use crate::models::{ForestConfig, PredictionModel, RandomForestClassifier, RidgeRegressor};
use crate::preprocess::FeaturePreprocessor;

/// Always-present model inputs; `OPPONENT` is the only categorical one.
pub const BASE_FEATURES: [&str; 6] = ["MIN", HOME, DAYS_REST, IS_B2B, WIN_LAST_GAME, OPPONENT];

/// Extra columns the double-double label needs beyond the regression targets.
const LABEL_ONLY_COLUMNS: [&str; 2] = ["STL", "BLK"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub ridge_alpha: f64,
    pub forest: ForestConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            ridge_alpha: 1.0,
            forest: ForestConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrainingReport {
    pub rows: usize,
    pub skipped_rows: usize,
    pub feature_columns: usize,
    pub encoded_width: usize,
    pub positive_rate: f64,
    pub target_rmse: Vec<(String, f64)>,
    pub classifier_accuracy: f64,
}

/// Model inputs in first-seen order: the base features, then every rolling
/// average column, then every opponent-defense column.
pub fn feature_columns(columns: &[String]) -> Vec<String> {
    let mut selected: Vec<String> = BASE_FEATURES.iter().map(|c| (*c).to_string()).collect();
    let detected = columns
        .iter()
        .filter(|c| c.contains("_MA_"))
        .chain(columns.iter().filter(|c| c.starts_with("OPP_")));
    for column in detected {
        if !selected.contains(column) {
            selected.push(column.clone());
        }
    }
    selected
}

#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, processed_path: &Path, model_dir: &Path) -> Result<TrainingReport> {
        info!("📥 Loading processed features from {}", processed_path.display());
        let frame = read_csv(processed_path)?;
        let (bundle, report) = self.train(&frame)?;
        bundle.save(model_dir)?;
        info!("✅ Training finished: {:?}", report);
        Ok(report)
    }

    pub fn train(&self, frame: &DataFrame) -> Result<(ModelArtifactBundle, TrainingReport)> {
        let mut required: Vec<&str> = REGRESSION_TARGETS.to_vec();
        required.extend(LABEL_ONLY_COLUMNS);
        required.extend(BASE_FEATURES);
        let missing = missing_columns(frame, &required);
        if !missing.is_empty() {
            return Err(HoopError::missing_columns(
                "processed features",
                missing.into_iter().map(String::from).collect(),
            ));
        }

        let features = feature_columns(&column_names(frame));
        let numeric: Vec<String> = features.iter().filter(|c| *c != OPPONENT).cloned().collect();
        info!("🧮 Selected {} feature columns", features.len());

        let (rows, skipped) = usable_rows(frame)?;
        if skipped > 0 {
            warn!(
                "⚠️  Excluded {} rows with no opponent or a missing regression target",
                skipped
            );
        }
        if rows.height() == 0 {
            return Err(HoopError::Model("no usable training rows".to_string()));
        }

        let (y_reg, y_class) = targets(&rows)?;

        info!("🔤 Fitting preprocessor (one-hot on {})", OPPONENT);
        let preprocessor = FeaturePreprocessor::fit(&rows, OPPONENT, numeric)?;
        let x = preprocessor.transform_table(&rows)?;
        info!("📐 Design matrix: {} x {}", x.nrows(), x.ncols());

        info!("📈 Training ridge regressor (alpha = {})", self.config.ridge_alpha);
        let regressor = RidgeRegressor::fit(
            &x,
            &y_reg,
            self.config.ridge_alpha,
            REGRESSION_TARGETS.iter().map(|t| (*t).to_string()).collect(),
        )?;

        info!("🌲 Training random forest ({} trees)", self.config.forest.n_trees);
        let classifier = RandomForestClassifier::fit(&x, &y_class, self.config.forest.clone())?;

        info!("✅ {} and {} fitted", regressor.model_name(), classifier.model_name());

        let fitted = regressor.predict(&x);
        let target_rmse = REGRESSION_TARGETS
            .iter()
            .enumerate()
            .map(|(i, t)| ((*t).to_string(), rmse(fitted.column(i), y_reg.column(i))))
            .collect();
        let report = TrainingReport {
            rows: rows.height(),
            skipped_rows: skipped,
            feature_columns: features.len(),
            encoded_width: x.ncols(),
            positive_rate: positive_rate(&y_class),
            target_rmse,
            classifier_accuracy: accuracy(&classifier.predict(&x), &y_class),
        };

        Ok((
            ModelArtifactBundle {
                preprocessor,
                regressor,
                classifier,
            },
            report,
        ))
    }
}

/// Rows with a known opponent and every regression target present.
fn usable_rows(frame: &DataFrame) -> Result<(DataFrame, usize)> {
    let mut usable: Vec<bool> = text_column(frame, OPPONENT)?.iter().map(Option::is_some).collect();
    for target in REGRESSION_TARGETS {
        for (keep, value) in usable.iter_mut().zip(numeric_column(frame, target)?) {
            *keep &= value.is_some();
        }
    }
    let skipped = usable.iter().filter(|keep| !**keep).count();
    let mask = BooleanChunked::new("usable".into(), usable);
    Ok((frame.filter(&mask)?, skipped))
}

fn targets(frame: &DataFrame) -> Result<(Array2<f64>, Array1<usize>)> {
    let column = |name: &str| -> Result<Vec<f64>> {
        Ok(numeric_column(frame, name)?.into_iter().map(|v| v.unwrap_or(0.0)).collect())
    };

    let mut y_reg = Array2::zeros((frame.height(), REGRESSION_TARGETS.len()));
    for (j, target) in REGRESSION_TARGETS.iter().enumerate() {
        for (i, value) in column(target)?.into_iter().enumerate() {
            y_reg[[i, j]] = value;
        }
    }

    let pts = column("PTS")?;
    let reb = column("REB")?;
    let ast = column("AST")?;
    let stl = column("STL")?;
    let blk = column("BLK")?;
    let y_class = (0..frame.height())
        .map(|i| usize::from(double_double_label(pts[i], reb[i], ast[i], stl[i], blk[i])))
        .collect();
    Ok((y_reg, y_class))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn test_feature_columns_detects_patterns() {
        let columns: Vec<String> = [
            "Player_ID", "MIN", "PTS", "OPPONENT", "HOME", "OPP_PTS_PER_G", "PTS_MA_5",
            "PTS_MA_10", "DAYS_REST",
        ]
        .iter()
        .map(|c| (*c).to_string())
        .collect();

        let features = feature_columns(&columns);
        assert_eq!(
            features,
            vec![
                "MIN", "HOME", "DAYS_REST", "IS_B2B", "WIN_LAST_GAME", "OPPONENT", "PTS_MA_5",
                "PTS_MA_10", "OPP_PTS_PER_G",
            ]
        );
    }

    #[test]
    fn test_missing_required_column_aborts() {
        let frame = df!("PTS" => [1.0], "AST" => [2.0], "REB" => [3.0]).unwrap();
        let err = Trainer::default().train(&frame).err().unwrap();
        let message = err.to_string();
        assert!(message.contains("FG3M"));
        assert!(message.contains("OPPONENT"));
    }

    #[test]
    fn test_targets_label_boundaries() {
        let frame = df!(
            "PTS" => [10.0, 25.0],
            "AST" => [2.0, 9.0],
            "REB" => [10.0, 9.0],
            "FG3M" => [1.0, 3.0],
            "STL" => [0.0, 1.0],
            "BLK" => [0.0, 1.0],
        )
        .unwrap();
        let (y_reg, y_class) = targets(&frame).unwrap();

        assert_eq!(y_reg.row(1).to_vec(), vec![25.0, 9.0, 9.0, 3.0]);
        assert_eq!(y_class.to_vec(), vec![1, 0]);
    }

    #[test]
    fn test_usable_rows_drop_missing_opponent_or_target() {
        let frame = df!(
            "OPPONENT" => [Some("BOS"), None, Some("LAL")],
            "PTS" => [Some(10.0), Some(12.0), None],
            "AST" => [1.0, 2.0, 3.0],
            "REB" => [4.0, 5.0, 6.0],
            "FG3M" => [0.0, 1.0, 2.0],
        )
        .unwrap();
        let (rows, skipped) = usable_rows(&frame).unwrap();
        assert_eq!(skipped, 2);
        assert_eq!(text_column(&rows, OPPONENT).unwrap(), vec![Some("BOS".to_string())]);
    }
}
