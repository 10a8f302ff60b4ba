use anyhow::{anyhow, Result};
use rusqlite::{params, Row, TransactionBehavior};

use crate::db::{
    helpers::{parse_date, parse_datetime, parse_phase, parse_scale, to_i64, to_u64, to_u8},
    models::{CommitOutcome, CommittedRating, RatingDraft, RatingEvent, RATING_STYLE_WINNER},
    Database,
};
use crate::rating::{Outcome, OutcomeCounts};
use crate::rotation::FocusPhase;

use super::users::select_user;

const RATING_COLUMNS: &str = "id, user_id, objective, basin, start_date, end_date, model_a, model_b,
     num_a_wins, num_b_wins, num_equal_good, num_equal_bad, num_skip, rating_style, task,
     rating_duration, x_zoomed, y_zoomed, x_range_start, x_range_end, y_range_start, y_range_end,
     y_scale, last_modified";

fn row_to_rating(row: &Row) -> Result<RatingEvent> {
    let id: i64 = row.get("id")?;
    let start_date: String = row.get("start_date")?;
    let end_date: String = row.get("end_date")?;
    let task: String = row.get("task")?;
    let rating_duration: i64 = row.get("rating_duration")?;
    let y_scale: String = row.get("y_scale")?;
    let last_modified: String = row.get("last_modified")?;

    let counts = OutcomeCounts {
        a_wins: to_u8(row.get("num_a_wins")?, "num_a_wins")?,
        b_wins: to_u8(row.get("num_b_wins")?, "num_b_wins")?,
        equal_good: to_u8(row.get("num_equal_good")?, "num_equal_good")?,
        equal_bad: to_u8(row.get("num_equal_bad")?, "num_equal_bad")?,
        skip: to_u8(row.get("num_skip")?, "num_skip")?,
    };
    let outcome =
        Outcome::from_counts(counts)?.ok_or_else(|| anyhow!("rating {id} has no outcome"))?;

    Ok(RatingEvent {
        id,
        user_id: row.get("user_id")?,
        objective: row.get("objective")?,
        basin: row.get("basin")?,
        start_date: parse_date(&start_date, "start_date")?,
        end_date: parse_date(&end_date, "end_date")?,
        model_a: row.get("model_a")?,
        model_b: row.get("model_b")?,
        outcome,
        rating_style: row.get("rating_style")?,
        task: parse_phase(&task)?,
        rating_duration_ms: to_u64(rating_duration, "rating_duration")?,
        x_zoomed: row.get("x_zoomed")?,
        y_zoomed: row.get("y_zoomed")?,
        x_range_start: row.get("x_range_start")?,
        x_range_end: row.get("x_range_end")?,
        y_range_start: row.get("y_range_start")?,
        y_range_end: row.get("y_range_end")?,
        y_scale: parse_scale(&y_scale)?,
        last_modified: parse_datetime(&last_modified, "last_modified")?,
    })
}

impl Database {
    /// Insert the rating and bump the user's counter in one transaction.
    ///
    /// The stored task is the phase of the counter as read inside the
    /// transaction. Nothing is written when the user is unknown or the
    /// counter no longer matches `draft.expected_counter`.
    pub async fn commit_rating(&self, draft: RatingDraft) -> Result<CommitOutcome> {
        self.execute(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let Some(user) = select_user(&tx, &draft.user_id)? else {
                return Ok(CommitOutcome::UnknownUser);
            };
            let counter = user.n_rated_hydrographs;
            if draft.expected_counter.is_some_and(|expected| expected != counter) {
                return Ok(CommitOutcome::Stale { counter });
            }
            let task = FocusPhase::for_counter(counter);
            let counts = draft.outcome.counts();

            tx.execute(
                "INSERT INTO ratings (user_id, objective, basin, start_date, end_date, model_a, model_b,
                     num_a_wins, num_b_wins, num_equal_good, num_equal_bad, num_skip, rating_style, task,
                     rating_duration, x_zoomed, y_zoomed, x_range_start, x_range_end, y_range_start,
                     y_range_end, y_scale, last_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                     ?18, ?19, ?20, ?21, ?22, ?23)",
                params![
                    draft.user_id,
                    draft.objective,
                    draft.basin,
                    draft.start_date.format("%Y-%m-%d").to_string(),
                    draft.end_date.format("%Y-%m-%d").to_string(),
                    draft.model_a,
                    draft.model_b,
                    counts.a_wins,
                    counts.b_wins,
                    counts.equal_good,
                    counts.equal_bad,
                    counts.skip,
                    RATING_STYLE_WINNER,
                    task.as_str(),
                    to_i64(draft.rating_duration_ms)?,
                    draft.x_zoomed,
                    draft.y_zoomed,
                    draft.x_range_start,
                    draft.x_range_end,
                    draft.y_range_start,
                    draft.y_range_end,
                    draft.y_scale.as_str(),
                    draft.submitted_at.to_rfc3339(),
                ],
            )?;
            let id = tx.last_insert_rowid();

            let updated = tx.execute(
                "UPDATE users
                 SET n_rated_hydrographs = n_rated_hydrographs + 1
                 WHERE id = ?1",
                params![draft.user_id],
            )?;
            if updated != 1 {
                return Err(anyhow!(
                    "expected to update one user row for {}, updated {updated}",
                    draft.user_id
                ));
            }

            tx.commit()?;

            let event = RatingEvent {
                id,
                user_id: draft.user_id,
                objective: draft.objective,
                basin: draft.basin,
                start_date: draft.start_date,
                end_date: draft.end_date,
                model_a: draft.model_a,
                model_b: draft.model_b,
                outcome: draft.outcome,
                rating_style: RATING_STYLE_WINNER.to_string(),
                task,
                rating_duration_ms: draft.rating_duration_ms,
                x_zoomed: draft.x_zoomed,
                y_zoomed: draft.y_zoomed,
                x_range_start: draft.x_range_start,
                x_range_end: draft.x_range_end,
                y_range_start: draft.y_range_start,
                y_range_end: draft.y_range_end,
                y_scale: draft.y_scale,
                last_modified: draft.submitted_at,
            };

            Ok(CommitOutcome::Committed(CommittedRating {
                event,
                rated_count: counter + 1,
            }))
        })
        .await
    }

    pub async fn list_ratings_for_user(&self, user_id: &str) -> Result<Vec<RatingEvent>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RATING_COLUMNS}
                 FROM ratings
                 WHERE user_id = ?1
                 ORDER BY id ASC"
            ))?;

            let mut rows = stmt.query(params![user_id])?;
            let mut ratings = Vec::new();
            while let Some(row) = rows.next()? {
                ratings.push(row_to_rating(row)?);
            }
            Ok(ratings)
        })
        .await
    }

    pub async fn count_ratings(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM ratings", [], |row| row.get(0))?;
            to_u64(count, "rating count")
        })
        .await
    }
}
