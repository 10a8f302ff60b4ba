//! Uniform sampling of comparison trials.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::catalog::Catalog;

pub mod entropy;
pub mod trial;

pub use entropy::{ClockEntropy, EntropySource, FixedEntropy};
pub use trial::{trial_window, Trial};

#[derive(Debug, thiserror::Error)]
pub enum SamplingError {
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Draw objective, basin, start year and two distinct models, each uniformly.
///
/// The final `n_years` years are never a start year so the window stays
/// inside the catalog's range.
pub fn draw_trial<R: Rng + ?Sized>(
    catalog: &Catalog,
    n_years: usize,
    rng: &mut R,
) -> Result<Trial, SamplingError> {
    let objective = catalog
        .objectives()
        .choose(rng)
        .ok_or_else(|| SamplingError::Configuration("no objectives configured".to_string()))?;

    let basin = objective.basins().choose(rng).ok_or_else(|| {
        SamplingError::Configuration(format!("objective '{}' has no basins", objective.id()))
    })?;

    let years = objective.years();
    let start_years = &years[..years.len().saturating_sub(n_years)];
    let start_year = *start_years.choose(rng).ok_or_else(|| {
        SamplingError::Configuration(format!(
            "objective '{}' has {} year(s), need more than {n_years}",
            objective.id(),
            years.len()
        ))
    })?;
    let (start, end) = trial_window(start_year, n_years).ok_or_else(|| {
        SamplingError::Configuration(format!("year {start_year} is out of range"))
    })?;

    let mut pair = objective.candidates().choose_multiple(rng, 2);
    let (model_a, model_b) = match (pair.next(), pair.next()) {
        (Some(a), Some(b)) => (a.clone(), b.clone()),
        _ => {
            return Err(SamplingError::Configuration(format!(
                "objective '{}' has fewer than 2 candidate models",
                objective.id()
            )))
        }
    };

    Ok(Trial {
        objective: objective.id().to_string(),
        basin: basin.clone(),
        start,
        end,
        model_a,
        model_b,
    })
}

/// Draws trials with a fresh generator per call.
#[derive(Clone)]
pub struct Sampler {
    entropy: Arc<dyn EntropySource>,
    n_years: usize,
}

impl Sampler {
    pub fn new(entropy: Arc<dyn EntropySource>, n_years: usize) -> Self {
        Self { entropy, n_years }
    }

    pub fn n_years(&self) -> usize {
        self.n_years
    }

    pub fn draw(&self, catalog: &Catalog) -> Result<Trial, SamplingError> {
        let mut rng = StdRng::seed_from_u64(self.entropy.seed());
        draw_trial(catalog, self.n_years, &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::{Datelike, NaiveDate};

    use super::*;
    use crate::catalog::test_support::{daily, obj1};
    use crate::catalog::{Objective, OBSERVATION_SERIES};

    #[test]
    fn draws_stay_inside_obj1_bounds() {
        let catalog = Catalog::new(vec![obj1()]);
        let candidates: HashSet<&str> = ["modelX", "modelY", "modelZ"].into_iter().collect();

        let mut start_years = HashSet::new();
        let mut pairs = HashSet::new();
        for seed in 0..500 {
            let trial = Sampler::new(Arc::new(FixedEntropy(seed)), 1)
                .draw(&catalog)
                .unwrap();

            assert_eq!(trial.objective, "obj1");
            assert!(trial.basin == "B1" || trial.basin == "B2");
            assert_ne!(trial.model_a, trial.model_b);
            assert_ne!(trial.model_a, OBSERVATION_SERIES);
            assert_ne!(trial.model_b, OBSERVATION_SERIES);
            assert!(candidates.contains(trial.model_a.as_str()));
            assert!(candidates.contains(trial.model_b.as_str()));

            let start_year = trial.start.year();
            assert!((2011..=2016).contains(&start_year), "start {start_year}");
            assert_eq!(
                trial.end,
                NaiveDate::from_ymd_opt(start_year + 1, 12, 31).unwrap()
            );

            start_years.insert(start_year);
            let mut pair = [trial.model_a.clone(), trial.model_b.clone()];
            pair.sort();
            pairs.insert(pair);
        }

        assert_eq!(start_years.len(), 6, "2017 excluded, all others reachable");
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn same_seed_reproduces_the_draw() {
        let catalog = Catalog::new(vec![obj1()]);
        let sampler = Sampler::new(Arc::new(FixedEntropy(42)), 1);
        assert_eq!(sampler.draw(&catalog).unwrap(), sampler.draw(&catalog).unwrap());
    }

    #[test]
    fn unservable_objective_is_a_configuration_error() {
        let basins = [("B1", 1.0)];
        let single = Objective::new(
            "single",
            vec![2011, 2012, 2013],
            daily(&basins, 2011, 2013),
            vec![("only".to_string(), daily(&basins, 2011, 2013))],
        );
        let catalog = Catalog::new(vec![single]);
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            draw_trial(&catalog, 1, &mut rng),
            Err(SamplingError::Configuration(_))
        ));

        let mut rng = StdRng::seed_from_u64(7);
        assert!(draw_trial(&Catalog::default(), 1, &mut rng).is_err());

        let catalog = Catalog::new(vec![obj1()]);
        let mut rng = StdRng::seed_from_u64(7);
        assert!(draw_trial(&catalog, 7, &mut rng).is_err());
    }
}
