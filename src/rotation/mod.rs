pub mod identity;
pub mod phase;

pub use identity::{tokenize, IdentityError, IdentityGuard, ModelToken, Salt};
pub use phase::{phase_message, FocusPhase, PHASE_CYCLE, PHASE_LENGTH};
