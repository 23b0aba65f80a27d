//! Handshake error types.

use thiserror::Error;

use crate::builder::BuildError;
use crate::credential::CredentialError;

/// Result type for handshake operations.
pub type HandshakeResult<T> = Result<T, HandshakeError>;

/// Failure of a handshake operation.
///
/// The first two variants and the last are operator problems; the session
/// variants are ordinary user situations such as an expired login attempt.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The named identity provider is not in the directory.
    #[error("unknown identity provider: {0}")]
    UnknownProvider(String),

    /// No usable signing credential is configured.
    #[error("signing credential unavailable: {0}")]
    SigningCredentialUnavailable(#[source] CredentialError),

    /// The request builder rejected its input or could not sign.
    #[error("request construction failed: {0}")]
    RequestConstructionFailed(#[source] BuildError),

    /// The correlation carrier is absent, expired or unreadable.
    #[error("no correlation record: the session has expired or was never started")]
    MissingSession,

    /// The correlation record lacks fields required for logout.
    #[error("correlation record is missing {}", .missing.join(", "))]
    IncompleteSession {
        /// Wire names of the blank fields.
        missing: Vec<&'static str>,
    },
}

impl HandshakeError {
    /// Returns true if the user can fix this by starting over.
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(self, Self::MissingSession | Self::IncompleteSession { .. })
    }

    /// Returns a message that is safe to show to the end user.
    ///
    /// Operator errors get a generic text so configuration details stay in
    /// the logs.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::UnknownProvider(_) => "The selected identity provider is not available.",
            Self::MissingSession => "Your session has expired. Please sign in again.",
            Self::IncompleteSession { .. } => {
                "No active SPID session was found. Please sign in again."
            }
            Self::SigningCredentialUnavailable(_) | Self::RequestConstructionFailed(_) => {
                "The service is temporarily unable to contact the identity provider."
            }
        }
    }

    /// Returns the HTTP status code that best describes this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::UnknownProvider(_) => 400,
            Self::MissingSession | Self::IncompleteSession { .. } => 401,
            Self::SigningCredentialUnavailable(_) | Self::RequestConstructionFailed(_) => 500,
        }
    }
}
