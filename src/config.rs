use config::{Config, ConfigError, Environment, File};
use hoop_ml::{ForestConfig, TrainingConfig};
use hoop_services::{FetchConfig, PredictorPaths, DEFAULT_BASE_URL, DEFAULT_REQUEST_DELAY_MS, DEFAULT_SEASONS};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub api: ApiConfig,
    pub training: TrainingSettings,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub raw_gamelogs: PathBuf,
    pub raw_defense: PathBuf,
    pub player_directory: PathBuf,
    pub processed_features: PathBuf,
    pub model_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub request_delay_ms: u64,
    pub seasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    pub ridge_alpha: f64,
    pub n_trees: usize,
    /// 0 grows trees without a depth limit.
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default values
            .set_default("paths.raw_gamelogs", "data/raw/nba_player_gamelogs_raw.csv")?
            .set_default("paths.raw_defense", "data/raw/nba_team_defense_stats_raw.csv")?
            .set_default("paths.player_directory", "data/raw/nba_players.csv")?
            .set_default(
                "paths.processed_features",
                "data/processed/nba_player_gamelogs_processed.csv",
            )?
            .set_default("paths.model_dir", "models")?
            .set_default("api.base_url", DEFAULT_BASE_URL)?
            .set_default("api.timeout_secs", 30)?
            .set_default("api.request_delay_ms", DEFAULT_REQUEST_DELAY_MS)?
            .set_default("api.seasons", DEFAULT_SEASONS.to_vec())?
            .set_default("training.ridge_alpha", 1.0)?
            .set_default("training.n_trees", 100)?
            .set_default("training.max_depth", 15)?
            .set_default("training.min_samples_leaf", 5)?
            .set_default("training.seed", 42)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8501)?
            // Add in settings from configuration file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from environment variables, e.g. HOOPCAST_SERVER__PORT
            .add_source(
                Environment::with_prefix("HOOPCAST")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("api.seasons")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            seasons: self.api.seasons.clone(),
            request_delay: Duration::from_millis(self.api.request_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn training_config(&self) -> TrainingConfig {
        let settings = &self.training;
        TrainingConfig {
            ridge_alpha: settings.ridge_alpha,
            forest: ForestConfig {
                n_trees: settings.n_trees,
                max_depth: (settings.max_depth > 0).then_some(settings.max_depth),
                min_samples_leaf: settings.min_samples_leaf,
                seed: settings.seed,
                ..ForestConfig::default()
            },
        }
    }

    pub fn predictor_paths(&self) -> PredictorPaths {
        PredictorPaths {
            model_dir: self.paths.model_dir.clone(),
            processed_features: self.paths.processed_features.clone(),
            player_directory: self.paths.player_directory.clone(),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
