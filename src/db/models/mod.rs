pub mod rating;
pub mod user;

pub use rating::{CommitOutcome, CommittedRating, RatingDraft, RatingEvent, RATING_STYLE_WINNER};
pub use user::{LeaderboardStanding, User};
