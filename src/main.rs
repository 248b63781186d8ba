use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_recommender::{
    services::{get_recommendations, write_recommendations, JsonFileSource, RecommendationKind},
    Config,
};

/// Batch run of the performer and scene recommendation engine
#[derive(Parser, Debug)]
struct CliArgs {
    /// Catalog snapshot to read. Defaults to SNAPSHOT_PATH.
    #[clap(long)]
    pub snapshot: Option<PathBuf>,

    /// Directory for the result files. Defaults to OUTPUT_DIR.
    #[clap(long)]
    pub output_dir: Option<PathBuf>,

    /// Abort the run after this many seconds. Defaults to RUN_TIMEOUT_SECS.
    #[clap(long)]
    pub timeout_secs: Option<u64>,

    /// Which recommendations to compute.
    #[clap(long, value_enum, default_value = "all")]
    pub kind: RecommendationKind,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    let mut config = Config::from_env()?;
    if let Some(snapshot) = cli_args.snapshot {
        config.snapshot_path = snapshot;
    }
    if let Some(output_dir) = cli_args.output_dir {
        config.output_dir = output_dir;
    }
    if cli_args.timeout_secs.is_some() {
        config.run_timeout_secs = cli_args.timeout_secs;
    }

    info!(
        snapshot = %config.snapshot_path.display(),
        output_dir = %config.output_dir.display(),
        kind = ?cli_args.kind,
        "Starting recommendation run"
    );

    let source = Arc::new(JsonFileSource::new(config.snapshot_path.clone()));
    let output_dir = config.output_dir.clone();
    let recommendations = get_recommendations(source, Arc::new(config), cli_args.kind, Utc::now())
        .await
        .context("Recommendation run failed")?;

    let written = write_recommendations(&output_dir, &recommendations)
        .await
        .with_context(|| format!("Failed to write results to {}", output_dir.display()))?;

    info!(files = written.len(), "Recommendation run finished");
    Ok(())
}
