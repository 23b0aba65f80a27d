//! Cryptographic error types.

use thiserror::Error;

/// Error type for cryptographic operations.
///
/// Messages describe what failed, never the key bytes involved.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The supplied key could not be parsed.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification failed.
    #[error("signature verification failed")]
    Verification,

    /// Key material for an HMAC was empty.
    #[error("HMAC key must not be empty")]
    EmptyHmacKey,
}
