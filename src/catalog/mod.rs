//! In-memory dataset catalog.
//!
//! Built once at startup from the timeseries store and shared read-only by
//! every request. Answers which objectives, basins, years and candidate models
//! exist, and serves the hydrograph values for a sampled trial.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub mod loader;

pub use loader::load_catalog;

/// Reserved model id of the observed hydrograph. Never a comparison candidate.
pub const OBSERVATION_SERIES: &str = "Q";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Basin id → ordered daily values.
pub type BasinSeries = BTreeMap<String, Vec<SeriesPoint>>;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("objective '{0}' not found")]
    ObjectiveNotFound(String),
    #[error("model '{model}' not found in objective '{objective}'")]
    ModelNotFound { objective: String, model: String },
    #[error("basin '{basin}' not found for model '{model}' in objective '{objective}'")]
    BasinNotFound {
        objective: String,
        model: String,
        basin: String,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid series file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A named evaluation universe: basins, admissible years and candidate models.
#[derive(Debug)]
pub struct Objective {
    id: String,
    candidates: Vec<String>,
    basins: Vec<String>,
    years: Vec<i32>,
    hydrographs: HashMap<String, BasinSeries>,
}

impl Objective {
    /// Assemble an objective from its observations and per-model series.
    ///
    /// Models that cannot serve every observed basin, or that reuse the
    /// observation id, are logged and left out of the candidates.
    pub fn new(
        id: impl Into<String>,
        years: Vec<i32>,
        observations: BasinSeries,
        models: Vec<(String, BasinSeries)>,
    ) -> Self {
        let id = id.into();
        let basins: Vec<String> = observations.keys().cloned().collect();

        let mut candidates = Vec::new();
        let mut hydrographs = HashMap::new();
        for (model, mut series) in models {
            if model == OBSERVATION_SERIES {
                warn!("Objective {id}: model directory '{model}' shadows the observations, skipping");
                continue;
            }
            if hydrographs.contains_key(&model) {
                warn!("Objective {id}: duplicate model '{model}', skipping");
                continue;
            }
            let missing: Vec<&str> = basins
                .iter()
                .filter(|basin| !series.contains_key(*basin))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                warn!(
                    "Objective {id}: model {model} is incomplete, missing {} basin(s) (e.g. {}), excluding it",
                    missing.len(),
                    missing[0]
                );
                continue;
            }
            for points in series.values_mut() {
                points.sort_by_key(|point| point.date);
            }
            candidates.push(model.clone());
            hydrographs.insert(model, series);
        }

        let mut observations = observations;
        for points in observations.values_mut() {
            points.sort_by_key(|point| point.date);
        }
        hydrographs.insert(OBSERVATION_SERIES.to_string(), observations);

        let mut years = years;
        years.sort_unstable();
        years.dedup();

        Self {
            id,
            candidates,
            basins,
            years,
            hydrographs,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn basins(&self) -> &[String] {
        &self.basins
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Values of `model` at `basin` with `start <= date <= end`.
    pub fn series(
        &self,
        model: &str,
        basin: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SeriesPoint>, CatalogError> {
        let by_basin = self
            .hydrographs
            .get(model)
            .ok_or_else(|| CatalogError::ModelNotFound {
                objective: self.id.clone(),
                model: model.to_string(),
            })?;
        let points = by_basin
            .get(basin)
            .ok_or_else(|| CatalogError::BasinNotFound {
                objective: self.id.clone(),
                model: model.to_string(),
                basin: basin.to_string(),
            })?;

        let from = points.partition_point(|point| point.date < start);
        let to = points.partition_point(|point| point.date <= end);
        Ok(points[from..to.max(from)].to_vec())
    }
}

#[derive(Debug, Default)]
pub struct Catalog {
    objectives: Vec<Objective>,
}

impl Catalog {
    pub fn new(objectives: Vec<Objective>) -> Self {
        for objective in &objectives {
            match (objective.years.first(), objective.years.last()) {
                (Some(first), Some(last)) => info!(
                    "Using years {first}-{last} from {} basins and {} models for objective {}",
                    objective.basins.len(),
                    objective.candidates.len(),
                    objective.id
                ),
                _ => warn!("Objective {} has no admissible years", objective.id),
            }
        }
        Self { objectives }
    }

    pub fn list_objectives(&self) -> Vec<&str> {
        self.objectives.iter().map(|o| o.id.as_str()).collect()
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    pub fn objective(&self, objective: &str) -> Result<&Objective, CatalogError> {
        self.objectives
            .iter()
            .find(|o| o.id == objective)
            .ok_or_else(|| CatalogError::ObjectiveNotFound(objective.to_string()))
    }

    pub fn candidate_models(&self, objective: &str) -> Result<&[String], CatalogError> {
        Ok(self.objective(objective)?.candidates())
    }

    pub fn basins(&self, objective: &str) -> Result<&[String], CatalogError> {
        Ok(self.objective(objective)?.basins())
    }

    pub fn years(&self, objective: &str) -> Result<&[i32], CatalogError> {
        Ok(self.objective(objective)?.years())
    }

    pub fn series(
        &self,
        objective: &str,
        model: &str,
        basin: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SeriesPoint>, CatalogError> {
        self.objective(objective)?.series(model, basin, start, end)
    }

    /// Every candidate model across all objectives, without duplicates.
    pub fn all_candidate_models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = self
            .objectives
            .iter()
            .flat_map(|o| o.candidates.iter().map(String::as_str))
            .collect();
        models.sort_unstable();
        models.dedup();
        models
    }

    /// Startup check that every objective can serve a draw.
    ///
    /// `excluded_final_years` start years are cut from the end of each year
    /// list, so at least one more year than that must exist.
    pub fn validate(&self, excluded_final_years: usize) -> Result<(), CatalogError> {
        if self.objectives.is_empty() {
            return Err(CatalogError::Configuration(
                "no objectives configured".to_string(),
            ));
        }
        for objective in &self.objectives {
            if objective.candidates.len() < 2 {
                return Err(CatalogError::Configuration(format!(
                    "objective '{}' has {} candidate model(s), at least 2 are required",
                    objective.id,
                    objective.candidates.len()
                )));
            }
            if objective.basins.is_empty() {
                return Err(CatalogError::Configuration(format!(
                    "objective '{}' has no basins",
                    objective.id
                )));
            }
            if objective.years.len() <= excluded_final_years {
                return Err(CatalogError::Configuration(format!(
                    "objective '{}' has {} year(s), need more than {excluded_final_years}",
                    objective.id,
                    objective.years.len()
                )));
            }
        }
        Ok(())
    }
}
