//! Hash and MAC functions.

use std::fmt;

use aws_lc_rs::{digest, hmac};

use crate::error::CryptoError;

/// Computes a SHA-256 hash of the input data.
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

/// HMAC-SHA256 key.
///
/// The key is checked once at construction, so tagging afterwards is
/// infallible.
#[derive(Clone)]
pub struct HmacKey {
    key: hmac::Key,
}

impl HmacKey {
    /// Creates a key from raw secret bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EmptyHmacKey`] if `secret` is empty.
    pub fn new(secret: &[u8]) -> Result<Self, CryptoError> {
        if secret.is_empty() {
            return Err(CryptoError::EmptyHmacKey);
        }
        Ok(Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
        })
    }

    /// Computes the tag over `data`.
    #[must_use]
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        hmac::sign(&self.key, data).as_ref().to_vec()
    }

    /// Verifies a tag in constant time.
    ///
    /// Returns `false` for a wrong or truncated tag.
    #[must_use]
    pub fn verify(&self, data: &[u8], tag: &[u8]) -> bool {
        hmac::verify(&self.key, data, tag).is_ok()
    }
}

impl fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HmacKey(..)")
    }
}
