use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::rotation::Salt;

const DEFAULT_CONFIG_PATH: &str = "ratemyhydrograph.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectiveSettings {
    pub id: String,
    /// Directory below `data_root`; defaults to the first path segment of `id`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub first_year: Option<i32>,
    #[serde(default)]
    pub last_year: Option<i32>,
}

impl ObjectiveSettings {
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::from(self.id.split('/').next().unwrap_or(&self.id)),
        }
    }

    /// Configured `first_year..=last_year`, if both ends are set.
    pub fn years(&self) -> Option<Vec<i32>> {
        match (self.first_year, self.last_year) {
            (Some(first), Some(last)) if first <= last => Some((first..=last).collect()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub data_root: PathBuf,
    pub db_path: PathBuf,
    pub objectives: Vec<ObjectiveSettings>,
    /// Length of the rated window in years; also the number of final years
    /// that can never be a start year.
    pub n_years: usize,
    pub recommended_count: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let objective = |id: &str| ObjectiveSettings {
            id: id.to_string(),
            data_dir: None,
            first_year: Some(2011),
            last_year: Some(2016),
        };
        Self {
            data_root: PathBuf::from("data"),
            db_path: PathBuf::from("ratemyhydrograph.sqlite3"),
            objectives: vec![
                objective("objective_2/great-lakes/validation-temporal"),
                objective("objective_1/great-lakes/validation-temporal"),
            ],
            n_years: 1,
            recommended_count: 15,
        }
    }
}

impl EngineSettings {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<()> {
        if self.recommended_count == 0 {
            return Err(anyhow!("recommended_count must be greater than zero"));
        }
        if self.n_years == 0 {
            return Err(anyhow!("n_years must be greater than zero"));
        }
        for objective in &self.objectives {
            if let (Some(first), Some(last)) = (objective.first_year, objective.last_year) {
                if first > last {
                    return Err(anyhow!(
                        "objective {}: first_year {first} is after last_year {last}",
                        objective.id
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Everything the process needs at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub engine: EngineSettings,
    pub salt: Salt,
    pub log_file: Option<PathBuf>,
}

impl Settings {
    /// Read `.env`, then resolve settings from the process environment.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine; the variables may be set directly.
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`.
    ///
    /// `SALT` is required. `RMH_CONFIG` points at the JSON settings file,
    /// `RMH_DB_PATH` overrides its database path and `LOG_FILE` enables file
    /// logging.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let salt = lookup("SALT")
            .ok_or_else(|| anyhow!("SALT missing, check the .env file"))
            .and_then(|value| Salt::new(value).map_err(|err| anyhow!(err)))?;

        let config_path = lookup("RMH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut engine = EngineSettings::from_file(&config_path)?;
        if let Some(db_path) = lookup("RMH_DB_PATH") {
            engine.db_path = PathBuf::from(db_path);
        }

        Ok(Self {
            engine,
            salt,
            log_file: lookup("LOG_FILE").map(PathBuf::from),
        })
    }
}
