mod config;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::AppConfig;
use hoop_api::{create_app, AppState};
use hoop_ml::{FeatureBuilder, Trainer};
use hoop_services::{NbaStatsClient, PredictorService, RawFetcher};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hoopcast", version, about = "NBA player stat prediction pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch active players' game logs for each season
    FetchPlayers {
        /// Comma-separated seasons, e.g. 2023-24,2024-25
        #[arg(long, value_delimiter = ',')]
        seasons: Option<Vec<String>>,
    },
    /// Fetch per-season team opponent stats
    FetchDefense {
        #[arg(long, value_delimiter = ',')]
        seasons: Option<Vec<String>>,
    },
    /// Build the processed feature table from the raw files
    BuildFeatures,
    /// Train both models and write the artifacts
    Train {
        #[arg(long)]
        alpha: Option<f64>,
        #[arg(long)]
        trees: Option<usize>,
    },
    /// Serve the prediction form
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Fetch, build features and train in one go
    Pipeline {
        /// Reuse the raw files already on disk
        #[arg(long)]
        skip_fetch: bool,
        #[arg(long, value_delimiter = ',')]
        seasons: Option<Vec<String>>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "hoopcast=info,hoop_ml=info,hoop_services=info,hoop_api=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::new().context("failed to load configuration")?;
    info!("✅ Configuration loaded successfully");

    match cli.command {
        Command::FetchPlayers { seasons } => {
            override_seasons(&mut config, seasons);
            fetch_players(&config).await
        }
        Command::FetchDefense { seasons } => {
            override_seasons(&mut config, seasons);
            fetch_defense(&config).await
        }
        Command::BuildFeatures => build_features(&config),
        Command::Train { alpha, trees } => {
            if let Some(alpha) = alpha {
                config.training.ridge_alpha = alpha;
            }
            if let Some(trees) = trees {
                config.training.n_trees = trees;
            }
            train(&config)
        }
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(&config).await
        }
        Command::Pipeline { skip_fetch, seasons } => {
            override_seasons(&mut config, seasons);
            if !skip_fetch {
                fetch_players(&config).await?;
                fetch_defense(&config).await?;
            }
            build_features(&config)?;
            train(&config)?;
            info!("🏁 Pipeline complete; run `hoopcast serve` to open the form");
            Ok(())
        }
    }
}

fn override_seasons(config: &mut AppConfig, seasons: Option<Vec<String>>) {
    if let Some(seasons) = seasons.filter(|s| !s.is_empty()) {
        config.api.seasons = seasons;
    }
}

fn stats_fetcher(config: &AppConfig) -> Result<RawFetcher<NbaStatsClient>> {
    let client = NbaStatsClient::new(config.api.base_url.clone(), config.request_timeout())?;
    Ok(RawFetcher::new(client, config.fetch_config()))
}

async fn fetch_players(config: &AppConfig) -> Result<()> {
    info!("🏀 Fetching player game logs for {:?}", config.api.seasons);
    let summary = stats_fetcher(config)?
        .fetch_game_logs(&config.paths.raw_gamelogs, &config.paths.player_directory)
        .await?;
    info!("📊 Game log fetch: {:?}", summary);
    Ok(())
}

async fn fetch_defense(config: &AppConfig) -> Result<()> {
    info!("🛡️  Fetching team defense stats for {:?}", config.api.seasons);
    let summary = stats_fetcher(config)?
        .fetch_team_defense(&config.paths.raw_defense)
        .await?;
    info!("📊 Team defense fetch: {:?}", summary);
    Ok(())
}

fn build_features(config: &AppConfig) -> Result<()> {
    let report = FeatureBuilder::new().run(
        &config.paths.raw_gamelogs,
        &config.paths.raw_defense,
        &config.paths.processed_features,
    )?;
    info!("📊 Feature build: {:?}", report);
    Ok(())
}

fn train(config: &AppConfig) -> Result<()> {
    Trainer::new(config.training_config()).run(&config.paths.processed_features, &config.paths.model_dir)?;
    Ok(())
}

async fn serve(config: &AppConfig) -> Result<()> {
    let predictor = Arc::new(PredictorService::load(config.predictor_paths()).await);
    let app = create_app(AppState::new(predictor));

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("🌐 Prediction form listening on http://{}", addr);
    info!("⌨️  Press Ctrl+C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("👋 Shutting down gracefully");
        })
        .await?;
    Ok(())
}
