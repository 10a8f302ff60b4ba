//! Client-held record of the trial on screen.
//!
//! The server keeps no per-session state between turns. Each trial payload
//! carries a sealed ticket; the next submission hands it back and the
//! recorder rebuilds the previous trial from it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

use crate::rotation::{FocusPhase, ModelToken, Salt};

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("ticket is malformed: {0}")]
    Malformed(String),
    #[error("ticket seal does not verify")]
    BadSeal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialTicket {
    /// The user the trial was shown to.
    pub user_id: String,
    pub objective: String,
    pub basin: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub model_a: ModelToken,
    pub model_b: ModelToken,
    pub phase: FocusPhase,
    /// Rating counter when the trial was shown.
    pub counter: u64,
    pub issued_at_ms: i64,
}

fn seal_of(body: &[u8], salt: &Salt) -> String {
    let mut hasher = Sha512::new();
    hasher.update(salt.as_bytes());
    hasher.update(body);
    hex::encode(hasher.finalize())
}

fn same_seal(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

impl TrialTicket {
    /// `base64url(json) "." hex(sha512(salt ‖ json))`
    pub fn seal(&self, salt: &Salt) -> Result<String, TicketError> {
        let body = serde_json::to_vec(self).map_err(|err| TicketError::Malformed(err.to_string()))?;
        Ok(format!("{}.{}", URL_SAFE_NO_PAD.encode(&body), seal_of(&body, salt)))
    }

    pub fn open(sealed: &str, salt: &Salt) -> Result<Self, TicketError> {
        let (encoded, seal) = sealed
            .trim()
            .split_once('.')
            .ok_or_else(|| TicketError::Malformed("missing seal".to_string()))?;
        let body = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|err| TicketError::Malformed(err.to_string()))?;

        if !same_seal(&seal_of(&body, salt), &seal.to_ascii_lowercase()) {
            return Err(TicketError::BadSeal);
        }

        serde_json::from_slice(&body).map_err(|err| TicketError::Malformed(err.to_string()))
    }
}
