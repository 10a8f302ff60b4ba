use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One sampled comparison: a basin and window of an objective plus two models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trial {
    pub objective: String,
    pub basin: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub model_a: String,
    pub model_b: String,
}

/// Displayed window for a start year: 1 January of `start_year` through
/// 31 December of `start_year + n_years`.
pub fn trial_window(start_year: i32, n_years: usize) -> Option<(NaiveDate, NaiveDate)> {
    let end_year = start_year.checked_add(i32::try_from(n_years).ok()?)?;
    Some((
        NaiveDate::from_ymd_opt(start_year, 1, 1)?,
        NaiveDate::from_ymd_opt(end_year, 12, 31)?,
    ))
}
