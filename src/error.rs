use reqwest::StatusCode;

use crate::validation::rule::ValidationRuleError;

/// Coarse classification of every failure the token subsystem can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Local setup is wrong (identity material, signing key). Needs an operator.
    Configuration,
    /// Connection, timeout or non-success status.
    Transport,
    /// Authority answered with something unusable.
    Protocol,
    /// Key set fetched but the expected key id is not in it.
    KeyNotFound,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Configuration => "configuration",
            FaultKind::Transport => "transport",
            FaultKind::Protocol => "protocol",
            FaultKind::KeyNotFound => "key_not_found",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DapsError {
    #[error("connector certificate is missing extension: {0}")]
    MissingCertExtension(String),
    #[error("DAPS connection failed: {0}")]
    Connection(String),
    #[error("DAPS returned no token: {0}")]
    EmptyResponse(String),
    #[error("could not retrieve DAPS verification key: {0}")]
    KeyRetrieval(#[from] KeyRetrievalError),
    /// The DAPS issued a token that does not verify against its own key set.
    #[error("DAPS issued a token that cannot be verified: {0}")]
    UnverifiableDat(#[source] jsonwebtoken::errors::Error),
    /// An inbound token that does not decode or verify.
    #[error("token could not be decoded or verified: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("client assertion could not be signed: {0}")]
    ClientAssertion(#[source] jsonwebtoken::errors::Error),
    #[error(transparent)]
    RuleExecution(#[from] ValidationRuleError),
}

impl DapsError {
    pub fn kind(&self) -> FaultKind {
        match self {
            DapsError::MissingCertExtension(_) | DapsError::ClientAssertion(_) => {
                FaultKind::Configuration
            }
            DapsError::Connection(_) => FaultKind::Transport,
            DapsError::EmptyResponse(_)
            | DapsError::UnverifiableDat(_)
            | DapsError::InvalidToken(_)
            | DapsError::RuleExecution(_) => FaultKind::Protocol,
            DapsError::KeyRetrieval(e) => e.kind(),
        }
    }

    /// Whether a caller may retry the operation without operator intervention.
    ///
    /// A rejected inbound token gives the same answer on every attempt, so
    /// neither it nor a rule that cannot run is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            DapsError::InvalidToken(_) | DapsError::RuleExecution(_) => false,
            _ => self.kind() != FaultKind::Configuration,
        }
    }
}

impl From<reqwest::Error> for DapsError {
    fn from(err: reqwest::Error) -> Self {
        DapsError::Connection(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeyRetrievalError {
    #[error("failed to fetch key set: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("key set endpoint returned status {0}")]
    Status(StatusCode),
    #[error("malformed key set: {0}")]
    MalformedKeySet(String),
    #[error("key {0:?} not found in key set")]
    KeyNotFound(String),
    #[error("unsupported key {kid:?}: {reason}")]
    UnsupportedKey { kid: String, reason: String },
}

impl KeyRetrievalError {
    pub fn kind(&self) -> FaultKind {
        match self {
            KeyRetrievalError::Transport(_) | KeyRetrievalError::Status(_) => FaultKind::Transport,
            KeyRetrievalError::MalformedKeySet(_) | KeyRetrievalError::UnsupportedKey { .. } => {
                FaultKind::Protocol
            }
            KeyRetrievalError::KeyNotFound(_) => FaultKind::KeyNotFound,
        }
    }
}
