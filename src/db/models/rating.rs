use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::rating::{AxisScale, Outcome};
use crate::rotation::FocusPhase;

/// Every rating recorded by this engine is a pairwise winner decision.
pub const RATING_STYLE_WINNER: &str = "winner";

/// A rating ready to be committed. The task phase is filled in inside the
/// commit transaction from the counter read there.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingDraft {
    pub user_id: String,
    /// Counter the rated trial was issued at. When set, the commit only goes
    /// through if the stored counter still equals it.
    pub expected_counter: Option<u64>,
    pub objective: String,
    pub basin: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub model_a: String,
    pub model_b: String,
    pub outcome: Outcome,
    pub rating_duration_ms: u64,
    pub x_zoomed: bool,
    pub y_zoomed: bool,
    pub x_range_start: Option<String>,
    pub x_range_end: Option<String>,
    pub y_range_start: Option<f64>,
    pub y_range_end: Option<f64>,
    pub y_scale: AxisScale,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingEvent {
    pub id: i64,
    pub user_id: String,
    pub objective: String,
    pub basin: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub model_a: String,
    pub model_b: String,
    pub outcome: Outcome,
    pub rating_style: String,
    pub task: FocusPhase,
    pub rating_duration_ms: u64,
    pub x_zoomed: bool,
    pub y_zoomed: bool,
    pub x_range_start: Option<String>,
    pub x_range_end: Option<String>,
    pub y_range_start: Option<f64>,
    pub y_range_end: Option<f64>,
    pub y_scale: AxisScale,
    pub last_modified: DateTime<Utc>,
}

/// Result of the atomic insert-and-increment.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedRating {
    pub event: RatingEvent,
    /// The user's counter after the increment.
    pub rated_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed(CommittedRating),
    /// No such user; nothing was written.
    UnknownUser,
    /// The stored counter moved past the draft's expected counter; nothing
    /// was written.
    Stale { counter: u64 },
}

impl CommitOutcome {
    pub fn into_committed(self) -> Option<CommittedRating> {
        match self {
            CommitOutcome::Committed(committed) => Some(committed),
            CommitOutcome::UnknownUser | CommitOutcome::Stale { .. } => None,
        }
    }
}
