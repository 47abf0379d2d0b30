use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use hoop_models::{HoopError, Result};
use ndarray::{Array1, Axis};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::models::{RandomForestClassifier, RidgeRegressor};
use crate::preprocess::FeaturePreprocessor;

pub const PREPROCESSOR_FILE: &str = "preprocessor.bin";
pub const REGRESSOR_FILE: &str = "reg_model_ridge.bin";
pub const CLASSIFIER_FILE: &str = "clf_model_rf.bin";

/// Everything the form needs to score a row. Replaced wholesale by every
/// training run; there is no versioning.
pub struct ModelArtifactBundle {
    pub preprocessor: FeaturePreprocessor,
    pub regressor: RidgeRegressor,
    pub classifier: RandomForestClassifier,
}

impl ModelArtifactBundle {
    pub fn save(&self, model_dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(model_dir)?;
        let paths = vec![
            write_artifact(&model_dir.join(PREPROCESSOR_FILE), &self.preprocessor)?,
            write_artifact(&model_dir.join(REGRESSOR_FILE), &self.regressor)?,
            write_artifact(&model_dir.join(CLASSIFIER_FILE), &self.classifier)?,
        ];
        info!("💾 Saved model artifacts to {}", model_dir.display());
        Ok(paths)
    }

    pub fn load(model_dir: &Path) -> Result<Self> {
        let bundle = Self {
            preprocessor: read_artifact(&model_dir.join(PREPROCESSOR_FILE))?,
            regressor: read_artifact(&model_dir.join(REGRESSOR_FILE))?,
            classifier: read_artifact(&model_dir.join(CLASSIFIER_FILE))?,
        };
        info!("📦 Loaded model artifacts from {}", model_dir.display());
        Ok(bundle)
    }

    /// Regression outputs and positive-class probability for one
    /// already-transformed feature vector.
    pub fn score(&self, features: &Array1<f64>) -> Result<([f64; 4], f64)> {
        if features.len() != self.preprocessor.output_width() {
            return Err(HoopError::Model(format!(
                "expected {} features, got {}",
                self.preprocessor.output_width(),
                features.len()
            )));
        }
        let x = features.clone().insert_axis(Axis(0));
        let regression = self.regressor.predict(&x);
        let outputs: Vec<f64> = regression.row(0).to_vec();
        let outputs: [f64; 4] = outputs
            .try_into()
            .map_err(|v: Vec<f64>| HoopError::Model(format!("regressor returned {} outputs, expected 4", v.len())))?;
        let probability = self.classifier.predict_proba(&x)[0];
        Ok((outputs, probability))
    }
}

fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<PathBuf> {
    let writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(writer, value)
        .map_err(|e| HoopError::Artifact(format!("{}: {e}", path.display())))?;
    Ok(path.to_path_buf())
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(HoopError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let reader = BufReader::new(File::open(path)?);
    bincode::deserialize_from(reader)
        .map_err(|e| HoopError::Artifact(format!("{}: {e}", path.display())))
}
