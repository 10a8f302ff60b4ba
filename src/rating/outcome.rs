use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Button pressed for a trial.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    AWins,
    BWins,
    EqualGood,
    EqualBad,
    Skip,
}

/// Column projection of an outcome; at most one field is 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub a_wins: u8,
    pub b_wins: u8,
    pub equal_good: u8,
    pub equal_bad: u8,
    pub skip: u8,
}

impl OutcomeCounts {
    pub fn total(&self) -> u32 {
        [self.a_wins, self.b_wins, self.equal_good, self.equal_bad, self.skip]
            .iter()
            .map(|v| u32::from(*v))
            .sum()
    }
}

impl Outcome {
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        match self {
            Outcome::AWins => counts.a_wins = 1,
            Outcome::BWins => counts.b_wins = 1,
            Outcome::EqualGood => counts.equal_good = 1,
            Outcome::EqualBad => counts.equal_bad = 1,
            Outcome::Skip => counts.skip = 1,
        }
        counts
    }

    /// Inverse of [`Outcome::counts`]. An all-zero row reads back as `None`.
    pub fn from_counts(counts: OutcomeCounts) -> Result<Option<Self>> {
        if counts.total() > 1 {
            bail!("rating has {} outcome counters set", counts.total());
        }
        let outcome = if counts.a_wins == 1 {
            Some(Outcome::AWins)
        } else if counts.b_wins == 1 {
            Some(Outcome::BWins)
        } else if counts.equal_good == 1 {
            Some(Outcome::EqualGood)
        } else if counts.equal_bad == 1 {
            Some(Outcome::EqualBad)
        } else if counts.skip == 1 {
            Some(Outcome::Skip)
        } else {
            None
        };
        Ok(outcome)
    }

    /// Log phrase describing the verdict between model A and model B.
    pub fn verdict(&self, model_a: &str, model_b: &str) -> String {
        match self {
            Outcome::AWins => format!("{model_a} > {model_b}"),
            Outcome::BWins => format!("{model_a} < {model_b}"),
            Outcome::EqualGood => format!("{model_a} is equally good as {model_b}"),
            Outcome::EqualBad => format!("{model_a} is equally bad as {model_b}"),
            Outcome::Skip => format!("neither {model_a} nor {model_b} could be judged"),
        }
    }
}
