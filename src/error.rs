use thiserror::Error;

use crate::model::ProviderId;

/// Coarse classification of a [`GatewayError`].
///
/// `InvalidInput` and `UnsupportedModel` are raised locally and never reach the
/// network layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedModel,
    UpstreamFailure,
    MalformedUpstreamResponse,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model '{model}' is not supported by {provider}")]
    UnsupportedModel { provider: ProviderId, model: String },

    #[error("{provider} request failed: {message}")]
    UpstreamFailure {
        provider: ProviderId,
        status: Option<u16>,
        message: String,
    },

    #[error("{provider} returned an unreadable response: {message}")]
    MalformedUpstreamResponse { provider: ProviderId, message: String },
}

impl GatewayError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        GatewayError::InvalidInput(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::InvalidInput(_) => ErrorKind::InvalidInput,
            GatewayError::UnsupportedModel { .. } => ErrorKind::UnsupportedModel,
            GatewayError::UpstreamFailure { .. } => ErrorKind::UpstreamFailure,
            GatewayError::MalformedUpstreamResponse { .. } => ErrorKind::MalformedUpstreamResponse,
        }
    }

    /// True when the error was detected before any network call was made.
    pub fn is_local(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidInput | ErrorKind::UnsupportedModel
        )
    }

    /// Maps a transport error from reqwest onto the taxonomy.
    pub(crate) fn from_transport(provider: ProviderId, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            format!("could not connect: {}", err)
        } else {
            err.to_string()
        };
        GatewayError::UpstreamFailure {
            provider,
            status: err.status().map(|s| s.as_u16()),
            message,
        }
    }
}
