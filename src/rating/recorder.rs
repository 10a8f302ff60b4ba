use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::db::{CommitOutcome, CommittedRating, Database, LeaderboardStanding, RatingDraft, User};
use crate::error::EngineError;
use crate::rotation::IdentityGuard;

use super::outcome::Outcome;
use super::signals::{AxisSnapshot, SessionSignals};
use super::ticket::TrialTicket;

/// Persistence seam used by the recorder and controller.
#[async_trait]
pub trait RatingStore: Send + Sync {
    async fn create_user(&self) -> Result<User>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    /// Atomically insert the rating and increment the user's counter.
    async fn commit_rating(&self, draft: RatingDraft) -> Result<CommitOutcome>;

    async fn leaderboard_position(&self, user_id: &str) -> Result<Option<LeaderboardStanding>>;
}

#[async_trait]
impl RatingStore for Database {
    async fn create_user(&self) -> Result<User> {
        Database::create_user(self).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        Database::get_user(self, user_id).await
    }

    async fn commit_rating(&self, draft: RatingDraft) -> Result<CommitOutcome> {
        Database::commit_rating(self, draft).await
    }

    async fn leaderboard_position(&self, user_id: &str) -> Result<Option<LeaderboardStanding>> {
        Database::leaderboard_position(self, user_id).await
    }
}

/// What the client sends back for the trial it was shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub ticket: String,
    #[serde(default)]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub axes: AxisSnapshot,
    /// Client clock when the plot finished rendering, epoch ms.
    #[serde(default)]
    pub rendered_at_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Committed(CommittedRating),
    /// The ticket was not recognised, belongs to another user or was already
    /// rated; nothing was written.
    Discarded,
    /// No outcome button was pressed; nothing was written.
    NotARating,
}

/// Milliseconds the trial was on screen.
///
/// The server issue time is the baseline. A client render time is trusted
/// only when it falls between issue time and now.
pub fn rating_duration_ms(issued_at_ms: i64, rendered_at_ms: Option<i64>, now_ms: i64) -> u64 {
    let shown_at = match rendered_at_ms {
        Some(rendered) if (issued_at_ms..=now_ms).contains(&rendered) => rendered,
        _ => issued_at_ms,
    };
    u64::try_from(now_ms.saturating_sub(shown_at)).unwrap_or(0)
}

/// Turn a submission into a committed rating.
pub async fn record_rating(
    store: &dyn RatingStore,
    guard: &IdentityGuard,
    user_id: &str,
    submission: &Submission,
    now: DateTime<Utc>,
) -> Result<Recorded, EngineError> {
    let Some(outcome) = submission.outcome else {
        return Ok(Recorded::NotARating);
    };

    let ticket = match TrialTicket::open(&submission.ticket, guard.salt()) {
        Ok(ticket) => ticket,
        Err(err) => {
            warn!("Discarding submission from user {user_id}: {err}");
            return Ok(Recorded::Discarded);
        }
    };
    if ticket.user_id != user_id {
        warn!(
            "Discarding submission from user {user_id}: ticket was issued to {}",
            ticket.user_id
        );
        return Ok(Recorded::Discarded);
    }

    let (model_a, model_b) = match (guard.resolve(&ticket.model_a), guard.resolve(&ticket.model_b)) {
        (Ok(a), Ok(b)) => (a.to_string(), b.to_string()),
        _ => {
            warn!(
                "Discarding submission from user {user_id}: {}",
                EngineError::UnknownToken
            );
            return Ok(Recorded::Discarded);
        }
    };

    let signals = SessionSignals::derive(&submission.axes, ticket.start, ticket.end);
    let draft = RatingDraft {
        user_id: user_id.to_string(),
        expected_counter: Some(ticket.counter),
        objective: ticket.objective,
        basin: ticket.basin,
        start_date: ticket.start,
        end_date: ticket.end,
        model_a,
        model_b,
        outcome,
        rating_duration_ms: rating_duration_ms(
            ticket.issued_at_ms,
            submission.rendered_at_ms,
            now.timestamp_millis(),
        ),
        x_zoomed: signals.x_zoomed,
        y_zoomed: signals.y_zoomed,
        x_range_start: signals.x_range_start,
        x_range_end: signals.x_range_end,
        y_range_start: signals.y_range_start,
        y_range_end: signals.y_range_end,
        y_scale: signals.y_scale,
        submitted_at: now,
    };

    let expected = ticket.counter;
    let committed = match store.commit_rating(draft).await.map_err(|err| {
        error!("Failed to save rating for user {user_id}: {err:#}");
        EngineError::Database(err)
    })? {
        CommitOutcome::Committed(committed) => committed,
        CommitOutcome::UnknownUser => return Err(EngineError::UnknownUser(user_id.to_string())),
        CommitOutcome::Stale { counter } => {
            warn!(
                "Discarding submission from user {user_id}: trial issued at rating {expected}, user is at {counter}"
            );
            return Ok(Recorded::Discarded);
        }
    };

    let event = &committed.event;
    info!(
        "User {user_id} said that {} for {}",
        event.outcome.verdict(&event.model_a, &event.model_b),
        event.task.as_str()
    );

    Ok(Recorded::Committed(committed))
}

/// Completion towards the recommended number of ratings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub percent: f64,
    pub label: String,
}

impl Progress {
    pub fn new(rated: u64, recommended: u64) -> Self {
        let percent = if recommended == 0 {
            100.0
        } else {
            (rated as f64 / recommended as f64 * 100.0).min(100.0)
        };
        let label = if percent < 100.0 {
            format!("{} more hydrographs", recommended - rated)
        } else {
            "Keep rating as many hydrographs as you like!".to_string()
        };
        Self { percent, label }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_caps_at_one_hundred() {
        let p = Progress::new(0, 15);
        assert_eq!(p.percent, 0.0);
        assert_eq!(p.label, "15 more hydrographs");

        let p = Progress::new(6, 15);
        assert!((p.percent - 40.0).abs() < 1e-9);
        assert_eq!(p.label, "9 more hydrographs");

        for rated in [15, 16, 400] {
            let p = Progress::new(rated, 15);
            assert_eq!(p.percent, 100.0);
            assert_eq!(p.label, "Keep rating as many hydrographs as you like!");
        }
    }

    #[test]
    fn duration_prefers_plausible_render_time() {
        assert_eq!(rating_duration_ms(1_000, None, 5_000), 4_000);
        assert_eq!(rating_duration_ms(1_000, Some(2_500), 5_000), 2_500);
        // Outside [issued, now]: ignored.
        assert_eq!(rating_duration_ms(1_000, Some(500), 5_000), 4_000);
        assert_eq!(rating_duration_ms(1_000, Some(9_000), 5_000), 4_000);
        // Clock skew never yields a negative duration.
        assert_eq!(rating_duration_ms(6_000, None, 5_000), 0);
    }

    #[test]
    fn submission_without_outcome_deserializes() {
        let submission: Submission = serde_json::from_str(r#"{"ticket": "abc"}"#).unwrap();
        assert_eq!(submission.outcome, None);
        assert_eq!(submission.axes, AxisSnapshot::default());
        assert_eq!(submission.rendered_at_ms, None);
    }
}
