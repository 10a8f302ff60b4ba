use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    helpers::{parse_datetime, to_i64, to_u64},
    models::{LeaderboardStanding, User},
    Database,
};

fn row_to_user(row: &Row) -> Result<User> {
    let n_rated: i64 = row.get("n_rated_hydrographs")?;
    let creation_time: String = row.get("creation_time")?;

    Ok(User {
        id: row.get("id")?,
        n_rated_hydrographs: to_u64(n_rated, "n_rated_hydrographs")?,
        creation_time: parse_datetime(&creation_time, "creation_time")?,
    })
}

pub(crate) fn select_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, n_rated_hydrographs, creation_time
         FROM users
         WHERE id = ?1",
    )?;
    let mut rows = stmt.query(params![user_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_user(row)?)),
        None => Ok(None),
    }
}

impl Database {
    /// Register a new participant with a zero counter.
    pub async fn create_user(&self) -> Result<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            n_rated_hydrographs: 0,
            creation_time: Utc::now(),
        };
        let record = user.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO users (id, n_rated_hydrographs, creation_time)
                 VALUES (?1, ?2, ?3)",
                params![
                    record.id,
                    to_i64(record.n_rated_hydrographs)?,
                    record.creation_time.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await?;
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| select_user(conn, &user_id)).await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            to_u64(count, "user count")
        })
        .await
    }

    /// `None` when the user does not exist.
    pub async fn leaderboard_position(&self, user_id: &str) -> Result<Option<LeaderboardStanding>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let n_rated: Option<i64> = conn
                .query_row(
                    "SELECT n_rated_hydrographs FROM users WHERE id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(n_rated) = n_rated else {
                return Ok(None);
            };

            let (n_users, n_ahead): (i64, i64) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN n_rated_hydrographs > ?1 THEN 1 ELSE 0 END), 0)
                 FROM users",
                params![n_rated],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let n_users = to_u64(n_users, "user count")?;
            let n_ahead = to_u64(n_ahead, "users ahead")?;
            if n_users == 0 {
                return Err(anyhow!("user {user_id} exists but user table is empty"));
            }

            Ok(Some(LeaderboardStanding {
                n_rated: to_u64(n_rated, "n_rated_hydrographs")?,
                position: n_ahead + 1,
                n_users,
                percentile: (n_users - n_ahead) as f64 / n_users as f64 * 100.0,
            }))
        })
        .await
    }
}
