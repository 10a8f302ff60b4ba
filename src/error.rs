use crate::catalog::CatalogError;
use crate::rotation::IdentityError;
use crate::sampling::SamplingError;

/// Path the client is sent to when it has no registered user.
pub const ONBOARDING_PATH: &str = "/questionnaire";

/// Errors surfaced by the engine to its callers.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("unknown user '{0}'")]
    UnknownUser(String),
    #[error("unknown model token")]
    UnknownToken,
    #[error("database error: {0:#}")]
    Database(anyhow::Error),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Sampling(#[from] SamplingError),
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Configuration(_) => "configuration",
            EngineError::UnknownUser(_) => "unknownUser",
            EngineError::UnknownToken => "unknownToken",
            EngineError::Database(_) => "database",
            EngineError::Catalog(_) => "catalog",
            EngineError::Sampling(_) => "sampling",
        }
    }

    /// A failed write can be resent unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Database(_))
    }

    pub fn redirect(&self) -> Option<&'static str> {
        match self {
            EngineError::UnknownUser(_) => Some(ONBOARDING_PATH),
            _ => None,
        }
    }
}

impl From<IdentityError> for EngineError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UnknownToken => EngineError::UnknownToken,
            other => EngineError::Configuration(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unknown_user_redirects() {
        let err = EngineError::UnknownUser("u1".to_string());
        assert_eq!(err.redirect(), Some("/questionnaire"));
        assert_eq!(err.kind(), "unknownUser");
        assert!(!err.is_retryable());

        let err = EngineError::Database(anyhow::anyhow!("disk I/O error"));
        assert_eq!(err.redirect(), None);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("disk I/O error"));
    }

    #[test]
    fn identity_errors_map_onto_engine_errors() {
        assert!(matches!(
            EngineError::from(IdentityError::UnknownToken),
            EngineError::UnknownToken
        ));
        assert!(matches!(
            EngineError::from(IdentityError::EmptySalt),
            EngineError::Configuration(_)
        ));
    }
}
