//! Rating loop: record a submission, then issue the next trial.

pub mod commands;
pub mod controller;
pub mod outcome;
pub mod recorder;
pub mod signals;
pub mod ticket;

pub use commands::{dispatch, handle_line, serve, Command, Response};
pub use controller::{RatingController, TrialPayload, TrialSeries};
pub use outcome::{Outcome, OutcomeCounts};
pub use recorder::{rating_duration_ms, record_rating, Progress, RatingStore, Recorded, Submission};
pub use signals::{AxisScale, AxisSnapshot, SessionSignals};
pub use ticket::{TicketError, TrialTicket};
