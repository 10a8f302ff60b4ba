mod common;

use std::fs;

use chrono::NaiveDate;
use tempfile::tempdir;

use ratemyhydrograph_lib::build_controller;
use ratemyhydrograph_lib::catalog::{load_catalog, CatalogError, OBSERVATION_SERIES};
use ratemyhydrograph_lib::settings::ObjectiveSettings;

#[test]
fn loads_complete_models_and_excludes_the_rest() {
    let dir = tempdir().unwrap();
    common::write_obj1(dir.path());

    let catalog = load_catalog(dir.path(), &[common::obj1_settings()]).unwrap();
    assert_eq!(catalog.list_objectives(), vec!["obj1"]);
    assert_eq!(
        catalog.candidate_models("obj1").unwrap(),
        &["modelX".to_string(), "modelY".to_string(), "modelZ".to_string()]
    );
    assert_eq!(
        catalog.basins("obj1").unwrap(),
        &["B1".to_string(), "B2".to_string()]
    );
    assert_eq!(
        catalog.years("obj1").unwrap(),
        &(2011..=2017).collect::<Vec<_>>()[..]
    );
    assert!(catalog.validate(1).is_ok());
    assert!(catalog.validate(7).is_err());

    let start = NaiveDate::from_ymd_opt(2013, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2013, 1, 10).unwrap();
    let obs = catalog
        .series("obj1", OBSERVATION_SERIES, "B2", start, end)
        .unwrap();
    assert_eq!(obs.len(), 10);
    assert_eq!(obs[0].value, Some(2.0));

    let model_y = catalog.series("obj1", "modelY", "B2", start, end).unwrap();
    assert_eq!(model_y[9].value, Some(1.5));

    assert!(matches!(
        catalog.series("obj1", "partial", "B1", start, end),
        Err(CatalogError::ModelNotFound { .. })
    ));
    assert!(matches!(
        catalog.series("obj1", "modelX", "B9", start, end),
        Err(CatalogError::BasinNotFound { .. })
    ));
    assert!(matches!(
        catalog.series("obj9", "modelX", "B1", start, end),
        Err(CatalogError::ObjectiveNotFound(_))
    ));
}

#[test]
fn years_default_to_observed_years() {
    let dir = tempdir().unwrap();
    common::write_obj1(dir.path());

    let settings = ObjectiveSettings {
        first_year: None,
        last_year: None,
        ..common::obj1_settings()
    };
    let catalog = load_catalog(dir.path(), &[settings]).unwrap();
    assert_eq!(catalog.years("obj1").unwrap().first(), Some(&2011));
    assert_eq!(catalog.years("obj1").unwrap().last(), Some(&2017));
}

#[test]
fn missing_observations_is_a_configuration_error() {
    let dir = tempdir().unwrap();
    let err = load_catalog(dir.path(), &[common::obj1_settings()]).unwrap_err();
    assert!(matches!(err, CatalogError::Configuration(_)));
}

#[test]
fn malformed_series_file_is_reported_with_its_path() {
    let dir = tempdir().unwrap();
    let base = common::write_obj1(dir.path());
    fs::write(base.join("model/modelZ/results.json"), b"{ not json").unwrap();

    match load_catalog(dir.path(), &[common::obj1_settings()]) {
        Err(CatalogError::Parse { path, .. }) => assert!(path.ends_with("results.json")),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn startup_refuses_an_unservable_catalog() {
    let dir = tempdir().unwrap();
    common::write_obj1(dir.path());

    let mut settings = common::settings(dir.path());
    assert!(build_controller(&settings).is_ok());

    settings.engine.objectives.clear();
    assert!(build_controller(&settings).is_err());

    settings.engine.objectives = vec![common::obj1_settings()];
    settings.engine.n_years = 7;
    assert!(build_controller(&settings).is_err());
}
