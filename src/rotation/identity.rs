//! Opaque model tokens.
//!
//! The client only ever sees `hex(sha512(salt ‖ model_name))`. The guard holds
//! the reverse table for every candidate model, built once at startup, so a
//! submitted token can be mapped back to the real model name.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("salt must not be empty")]
    EmptySalt,
    #[error("token collision between models '{first}' and '{second}'")]
    Collision { first: String, second: String },
    #[error("unknown model token")]
    UnknownToken,
    #[error("model '{0}' has no token")]
    UnknownModel(String),
}

/// Server-side secret mixed into every token and ticket seal.
#[derive(Clone)]
pub struct Salt(String);

impl Salt {
    pub fn new(value: impl Into<String>) -> Result<Self, IdentityError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(IdentityError::EmptySalt);
        }
        Ok(Self(value))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelToken(String);

impl ModelToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ModelToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ModelToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ModelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One-way token for a model name under `salt`.
pub fn tokenize(model_name: &str, salt: &Salt) -> ModelToken {
    let mut hasher = Sha512::new();
    hasher.update(salt.as_bytes());
    hasher.update(model_name.as_bytes());
    ModelToken(hex::encode(hasher.finalize()))
}

/// Token ↔ model name table, immutable after construction.
#[derive(Debug)]
pub struct IdentityGuard {
    salt: Salt,
    by_token: HashMap<ModelToken, String>,
    by_name: HashMap<String, ModelToken>,
}

impl IdentityGuard {
    pub fn new<I, S>(salt: Salt, models: I) -> Result<Self, IdentityError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut by_token: HashMap<ModelToken, String> = HashMap::new();
        let mut by_name = HashMap::new();

        for model in models {
            let model = model.as_ref();
            if by_name.contains_key(model) {
                // Same model listed under several objectives.
                continue;
            }
            let token = tokenize(model, &salt);
            if let Some(existing) = by_token.get(&token) {
                return Err(IdentityError::Collision {
                    first: existing.clone(),
                    second: model.to_string(),
                });
            }
            by_token.insert(token.clone(), model.to_string());
            by_name.insert(model.to_string(), token);
        }

        Ok(Self {
            salt,
            by_token,
            by_name,
        })
    }

    pub fn token_for(&self, model_name: &str) -> Result<&ModelToken, IdentityError> {
        self.by_name
            .get(model_name)
            .ok_or_else(|| IdentityError::UnknownModel(model_name.to_string()))
    }

    pub fn resolve(&self, token: &ModelToken) -> Result<&str, IdentityError> {
        self.by_token
            .get(token)
            .map(String::as_str)
            .ok_or(IdentityError::UnknownToken)
    }

    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}
