//! Loads the catalog from the on-disk timeseries store.
//!
//! Layout per objective:
//!
//! ```text
//! <data_root>/<data_dir>/all_gauges.json
//! <data_root>/<data_dir>/model/<model_name>/<one file>.json
//! ```
//!
//! Every file maps basin ids to `[{"date": "YYYY-MM-DD", "value": x}, ...]`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use log::{info, warn};

use super::{BasinSeries, Catalog, CatalogError, Objective};
use crate::settings::ObjectiveSettings;

const OBSERVATIONS_FILE: &str = "all_gauges.json";
const MODELS_DIR: &str = "model";

pub fn load_catalog(
    data_root: &Path,
    objectives: &[ObjectiveSettings],
) -> Result<Catalog, CatalogError> {
    let mut loaded = Vec::with_capacity(objectives.len());
    for settings in objectives {
        loaded.push(load_objective(data_root, settings)?);
    }
    Ok(Catalog::new(loaded))
}

fn load_objective(
    data_root: &Path,
    settings: &ObjectiveSettings,
) -> Result<Objective, CatalogError> {
    let base_dir = data_root.join(settings.data_dir());
    let obs_file = base_dir.join(OBSERVATIONS_FILE);
    if !obs_file.exists() {
        return Err(CatalogError::Configuration(format!(
            "observations file not found at {}",
            obs_file.display()
        )));
    }
    let observations = read_series_file(&obs_file)?;

    let mut models = Vec::new();
    for model_dir in list_model_dirs(&base_dir.join(MODELS_DIR))? {
        let model_name = match model_dir.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => {
                warn!("Skipping model directory with non UTF-8 name: {}", model_dir.display());
                continue;
            }
        };
        let files = list_json_files(&model_dir)?;
        if files.len() != 1 {
            warn!(
                "Found {} files for model {model_name} in objective {}, expected exactly one; excluding it",
                files.len(),
                settings.id
            );
            continue;
        }
        models.push((model_name, read_series_file(&files[0])?));
    }

    let years = settings
        .years()
        .unwrap_or_else(|| observed_years(&observations));
    info!(
        "Loaded objective {} from {} ({} model directories)",
        settings.id,
        base_dir.display(),
        models.len()
    );

    Ok(Objective::new(settings.id.clone(), years, observations, models))
}

fn read_series_file(path: &Path) -> Result<BasinSeries, CatalogError> {
    let contents = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn list_model_dirs(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    if !dir.is_dir() {
        warn!("No model directory at {}", dir.display());
        return Ok(Vec::new());
    }
    let mut dirs: Vec<PathBuf> = read_dir(dir)?
        .into_iter()
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let mut files: Vec<PathBuf> = read_dir(dir)?
        .into_iter()
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

fn read_dir(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        paths.push(entry.map_err(io_err)?.path());
    }
    Ok(paths)
}

/// Calendar years in which any basin has at least one observed value.
fn observed_years(observations: &BasinSeries) -> Vec<i32> {
    let years: BTreeSet<i32> = observations
        .values()
        .flatten()
        .filter(|point| point.value.is_some())
        .map(|point| point.date.year())
        .collect();
    years.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SeriesPoint;
    use chrono::NaiveDate;

    fn point(y: i32, value: Option<f64>) -> SeriesPoint {
        SeriesPoint {
            date: NaiveDate::from_ymd_opt(y, 6, 1).unwrap(),
            value,
        }
    }

    #[test]
    fn observed_years_ignore_missing_values() {
        let mut obs = BasinSeries::new();
        obs.insert(
            "B1".to_string(),
            vec![point(2011, Some(1.0)), point(2012, None), point(2013, Some(2.0))],
        );
        obs.insert("B2".to_string(), vec![point(2014, Some(0.5))]);
        assert_eq!(observed_years(&obs), vec![2011, 2013, 2014]);
    }
}
