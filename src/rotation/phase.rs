use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Number of consecutive ratings spent in each focus phase.
pub const PHASE_LENGTH: u64 = 5;

/// Full rotation period: overall, then high-flow, then low-flow.
pub const PHASE_CYCLE: u64 = 3 * PHASE_LENGTH;

/// What the participant is asked to concentrate on when comparing hydrographs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FocusPhase {
    Overall,
    HighFlow,
    LowFlow,
}

impl FocusPhase {
    /// Phase for a rating counter. Depends only on `counter mod 15`.
    pub fn for_counter(counter: u64) -> Self {
        match counter % PHASE_CYCLE {
            0..=4 => FocusPhase::Overall,
            5..=9 => FocusPhase::HighFlow,
            _ => FocusPhase::LowFlow,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FocusPhase::Overall => "overall",
            FocusPhase::HighFlow => "high-flow",
            FocusPhase::LowFlow => "low-flow",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "overall" => Ok(FocusPhase::Overall),
            "high-flow" => Ok(FocusPhase::HighFlow),
            "low-flow" => Ok(FocusPhase::LowFlow),
            other => Err(anyhow!("unknown focus phase '{other}'")),
        }
    }

    /// Question shown above the rating buttons.
    pub fn task_description(&self) -> String {
        format!(
            "Which hydrograph is better in terms of {} performance?",
            self.as_str()
        )
    }

    fn focus_phrase(&self) -> &'static str {
        match self {
            FocusPhase::Overall => "overall flow",
            FocusPhase::HighFlow => "high flows",
            FocusPhase::LowFlow => "low flows",
        }
    }
}

/// One-time banner announcing the phase of the upcoming trial.
///
/// Empty unless the phase changes between the trial just rated and the next
/// one. The first trial of a session (`previous == None`) always announces.
pub fn phase_message(previous: Option<FocusPhase>, next: FocusPhase) -> String {
    if previous == Some(next) {
        return String::new();
    }
    format!(
        "For the next {PHASE_LENGTH} hydrographs, please concentrate on the {}.",
        next.focus_phrase()
    )
}
