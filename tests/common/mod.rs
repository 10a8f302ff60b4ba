#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use ratemyhydrograph_lib::catalog::load_catalog;
use ratemyhydrograph_lib::db::Database;
use ratemyhydrograph_lib::rating::{RatingController, RatingStore};
use ratemyhydrograph_lib::rotation::{IdentityGuard, Salt};
use ratemyhydrograph_lib::sampling::{FixedEntropy, Sampler};
use ratemyhydrograph_lib::settings::{EngineSettings, ObjectiveSettings, Settings};

pub const SALT: &str = "integration-pepper";

pub fn salt() -> Salt {
    Salt::new(SALT).unwrap()
}

fn daily_series(basins: &[(&str, f64)], first_year: i32, last_year: i32) -> Value {
    let mut by_basin = Map::new();
    for (basin, base) in basins {
        let mut points = Vec::new();
        let mut date = NaiveDate::from_ymd_opt(first_year, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(last_year, 12, 31).unwrap();
        while date <= end {
            points.push(json!({ "date": date.format("%Y-%m-%d").to_string(), "value": base }));
            date = date.succ_opt().unwrap();
        }
        by_basin.insert(basin.to_string(), Value::Array(points));
    }
    Value::Object(by_basin)
}

fn write_json(path: &Path, value: &Value) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_vec(value).unwrap()).unwrap();
}

/// Writes objective `obj1` under `root`: basins B1/B2 observed 2011..=2017,
/// complete models modelX/Y/Z, plus a model missing B2 and a model with two
/// result files.
pub fn write_obj1(root: &Path) -> PathBuf {
    let base = root.join("obj1");
    let both = [("B1", 1.0), ("B2", 2.0)];
    write_json(&base.join("all_gauges.json"), &daily_series(&both, 2011, 2017));
    for (i, model) in ["modelX", "modelY", "modelZ"].iter().enumerate() {
        write_json(
            &base.join("model").join(model).join("results.json"),
            &daily_series(&[("B1", i as f64), ("B2", i as f64 + 0.5)], 2011, 2017),
        );
    }
    write_json(
        &base.join("model/partial/results.json"),
        &daily_series(&[("B1", 9.0)], 2011, 2017),
    );
    write_json(
        &base.join("model/twofiles/a.json"),
        &daily_series(&both, 2011, 2017),
    );
    write_json(
        &base.join("model/twofiles/b.json"),
        &daily_series(&both, 2011, 2017),
    );
    base
}

pub fn obj1_settings() -> ObjectiveSettings {
    ObjectiveSettings {
        id: "obj1".to_string(),
        data_dir: None,
        first_year: Some(2011),
        last_year: Some(2017),
    }
}

pub fn settings(root: &Path) -> Settings {
    Settings {
        engine: EngineSettings {
            data_root: root.to_path_buf(),
            db_path: root.join("ratings.sqlite3"),
            objectives: vec![obj1_settings()],
            n_years: 1,
            recommended_count: 15,
        },
        salt: salt(),
        log_file: None,
    }
}

/// A controller over the obj1 fixture with a seeded sampler and `store`.
pub fn controller_with_store(
    root: &Path,
    store: Arc<dyn RatingStore>,
    seed: u64,
) -> RatingController {
    write_obj1(root);
    let catalog = load_catalog(root, &[obj1_settings()]).unwrap();
    let guard = IdentityGuard::new(salt(), catalog.all_candidate_models()).unwrap();
    RatingController::new(
        Arc::new(catalog),
        Arc::new(guard),
        Sampler::new(Arc::new(FixedEntropy(seed)), 1),
        store,
        15,
    )
}

pub fn controller(root: &Path, seed: u64) -> (RatingController, Database) {
    let db = Database::new(root.join("ratings.sqlite3")).unwrap();
    let controller = controller_with_store(root, Arc::new(db.clone()), seed);
    (controller, db)
}
