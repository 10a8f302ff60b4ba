use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub n_rated_hydrographs: u64,
    pub creation_time: DateTime<Utc>,
}

/// Where a user stands relative to everybody else.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardStanding {
    pub n_rated: u64,
    /// 1 + number of users with strictly more ratings.
    pub position: u64,
    pub n_users: u64,
    /// Share of users this user is not behind, in percent.
    pub percentile: f64,
}

impl LeaderboardStanding {
    pub fn is_leader(&self) -> bool {
        self.position == 1
    }

    pub fn text(&self) -> String {
        format!(
            "You rated {} hydrographs, this puts you in leaderboard position {}.",
            self.n_rated, self.position
        )
    }
}
