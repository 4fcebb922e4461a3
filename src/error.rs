use aether_dsl::DslError;
use serde_json::Value;
use thiserror::Error;

/// Underlying cause of a request that never produced a usable response.
#[derive(Error, Debug)]
pub enum NetworkCause {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AetherError {
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: NetworkCause,
    },

    #[error("API error {status}: {status_text}")]
    Api {
        status: u16,
        status_text: String,
        /// Decoded error payload, or the raw text when it is not JSON
        body: Value,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// Coarse tag for matching on an [`AetherError`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Api,
    Validation,
    Cancelled,
}

pub type AetherResult<T> = Result<T, AetherError>;

impl AetherError {
    pub fn network(message: impl Into<String>, source: impl Into<NetworkCause>) -> Self {
        AetherError::Network {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AetherError::Network { .. } => ErrorKind::Network,
            AetherError::Api { .. } => ErrorKind::Api,
            AetherError::Validation(_) => ErrorKind::Validation,
            AetherError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Network failures and 503/504 responses are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            AetherError::Network { .. } => true,
            AetherError::Api { status, .. } => matches!(status, 503 | 504),
            AetherError::Validation(_) | AetherError::Cancelled => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AetherError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<DslError> for AetherError {
    fn from(err: DslError) -> Self {
        match err {
            DslError::Validation(msg) => AetherError::Validation(msg),
            other => AetherError::Validation(other.to_string()),
        }
    }
}

impl serde::Serialize for AetherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
