pub mod catalog;
pub mod db;
pub mod error;
pub mod rating;
pub mod rotation;
pub mod sampling;
pub mod settings;

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::info;
use tokio::io::BufReader;

use catalog::load_catalog;
use db::Database;
use rating::RatingController;
use rotation::IdentityGuard;
use sampling::{ClockEntropy, Sampler};
use settings::Settings;

pub use error::EngineError;

/// Route log output to `log_file` when given, stderr otherwise.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(log::LevelFilter::Info);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create log directory {}", parent.display())
                })?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder
        .try_init()
        .map_err(|err| anyhow!("failed to initialise logging: {err}"))
}

/// Load the catalog, token table and store described by `settings`.
///
/// Fails when the catalog cannot serve a draw; the engine never starts in a
/// state where sampling is guaranteed to fail.
pub fn build_controller(settings: &Settings) -> Result<RatingController> {
    let engine = &settings.engine;

    let catalog = load_catalog(&engine.data_root, &engine.objectives)
        .context("failed to load timeseries catalog")?;
    catalog
        .validate(engine.n_years)
        .context("catalog cannot serve trials")?;

    let guard = IdentityGuard::new(settings.salt.clone(), catalog.all_candidate_models())
        .context("failed to build model token table")?;
    info!(
        "Serving {} objective(s) with {} candidate model(s)",
        catalog.objectives().len(),
        guard.len()
    );

    let database = Database::new(engine.db_path.clone())?;

    Ok(RatingController::new(
        Arc::new(catalog),
        Arc::new(guard),
        Sampler::new(Arc::new(ClockEntropy::new()), engine.n_years),
        Arc::new(database),
        engine.recommended_count,
    ))
}

/// Start the engine and answer JSON-lines requests on stdin until EOF.
pub fn run() -> Result<()> {
    let settings = Settings::from_env()?;
    init_logging(settings.log_file.as_deref())?;

    info!("Rate My Hydrograph starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;

    runtime.block_on(async move {
        let controller = build_controller(&settings)?;
        rating::serve(
            &controller,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
        .await?;
        info!("Input closed, shutting down");
        Ok::<(), anyhow::Error>(())
    })
}
