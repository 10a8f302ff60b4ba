use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, SeriesPoint, OBSERVATION_SERIES};
use crate::db::{LeaderboardStanding, User};
use crate::error::EngineError;
use crate::rotation::{phase_message, FocusPhase, IdentityGuard, ModelToken};
use crate::sampling::{Sampler, Trial};

use super::recorder::{record_rating, Progress, RatingStore, Recorded, Submission};
use super::ticket::TrialTicket;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialSeries {
    pub observed: Vec<SeriesPoint>,
    pub model_a: Vec<SeriesPoint>,
    pub model_b: Vec<SeriesPoint>,
}

/// Everything the client needs to show one trial. Model names never appear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialPayload {
    pub objective: String,
    pub basin: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub model_a: ModelToken,
    pub model_b: ModelToken,
    pub phase: FocusPhase,
    pub task_description: String,
    /// Empty unless the phase changed.
    pub phase_message: String,
    pub progress: Progress,
    pub rated: u64,
    pub ticket: String,
    pub series: TrialSeries,
}

/// A drawn trial with its tokens and series resolved, waiting for a ticket.
struct PreparedTrial {
    trial: Trial,
    model_a: ModelToken,
    model_b: ModelToken,
    series: TrialSeries,
}

/// Runs one turn of the rating loop for a user.
pub struct RatingController {
    catalog: Arc<Catalog>,
    guard: Arc<IdentityGuard>,
    sampler: Sampler,
    store: Arc<dyn RatingStore>,
    recommended_count: u64,
}

impl RatingController {
    pub fn new(
        catalog: Arc<Catalog>,
        guard: Arc<IdentityGuard>,
        sampler: Sampler,
        store: Arc<dyn RatingStore>,
        recommended_count: u64,
    ) -> Self {
        Self {
            catalog,
            guard,
            sampler,
            store,
            recommended_count,
        }
    }

    pub async fn register(&self) -> Result<User, EngineError> {
        let user = self.store.create_user().await.map_err(EngineError::Database)?;
        debug!("Registered user {}", user.id);
        Ok(user)
    }

    pub async fn leaderboard(&self, user_id: &str) -> Result<LeaderboardStanding, EngineError> {
        self.store
            .leaderboard_position(user_id)
            .await
            .map_err(EngineError::Database)?
            .ok_or_else(|| EngineError::UnknownUser(user_id.to_string()))
    }

    pub async fn next_trial(
        &self,
        user_id: &str,
        submission: Option<&Submission>,
    ) -> Result<TrialPayload, EngineError> {
        self.next_trial_at(user_id, submission, Utc::now()).await
    }

    /// Draw the next trial, record `submission` if it is a rating, then issue
    /// the drawn trial at the resulting counter.
    pub async fn next_trial_at(
        &self,
        user_id: &str,
        submission: Option<&Submission>,
        now: DateTime<Utc>,
    ) -> Result<TrialPayload, EngineError> {
        let user = self
            .store
            .get_user(user_id)
            .await
            .map_err(EngineError::Database)?
            .ok_or_else(|| EngineError::UnknownUser(user_id.to_string()))?;

        let prepared = self.prepare(self.sampler.draw(&self.catalog)?)?;

        let mut counter = user.n_rated_hydrographs;
        let mut previous_phase = None;
        if let Some(submission) = submission {
            previous_phase = TrialTicket::open(&submission.ticket, self.guard.salt())
                .ok()
                .filter(|ticket| ticket.user_id == user_id)
                .map(|ticket| ticket.phase);
            match record_rating(self.store.as_ref(), &self.guard, user_id, submission, now).await? {
                Recorded::Committed(committed) => counter = committed.rated_count,
                Recorded::Discarded | Recorded::NotARating => {}
            }
        }

        let phase = FocusPhase::for_counter(counter);
        self.issue(user_id, prepared, phase, previous_phase, counter, now)
    }

    fn prepare(&self, trial: Trial) -> Result<PreparedTrial, EngineError> {
        let model_a = self.guard.token_for(&trial.model_a)?.clone();
        let model_b = self.guard.token_for(&trial.model_b)?.clone();

        let objective = self.catalog.objective(&trial.objective)?;
        let series = TrialSeries {
            observed: objective.series(OBSERVATION_SERIES, &trial.basin, trial.start, trial.end)?,
            model_a: objective.series(&trial.model_a, &trial.basin, trial.start, trial.end)?,
            model_b: objective.series(&trial.model_b, &trial.basin, trial.start, trial.end)?,
        };

        Ok(PreparedTrial {
            trial,
            model_a,
            model_b,
            series,
        })
    }

    fn issue(
        &self,
        user_id: &str,
        prepared: PreparedTrial,
        phase: FocusPhase,
        previous_phase: Option<FocusPhase>,
        counter: u64,
        now: DateTime<Utc>,
    ) -> Result<TrialPayload, EngineError> {
        let PreparedTrial {
            trial,
            model_a,
            model_b,
            series,
        } = prepared;

        let ticket = TrialTicket {
            user_id: user_id.to_string(),
            objective: trial.objective.clone(),
            basin: trial.basin.clone(),
            start: trial.start,
            end: trial.end,
            model_a: model_a.clone(),
            model_b: model_b.clone(),
            phase,
            counter,
            issued_at_ms: now.timestamp_millis(),
        }
        .seal(self.guard.salt())
        .map_err(|err| EngineError::Configuration(err.to_string()))?;

        Ok(TrialPayload {
            objective: trial.objective,
            basin: trial.basin,
            start: trial.start,
            end: trial.end,
            model_a,
            model_b,
            phase,
            task_description: phase.task_description(),
            phase_message: phase_message(previous_phase, phase),
            progress: Progress::new(counter, self.recommended_count),
            rated: counter,
            ticket,
            series,
        })
    }
}
