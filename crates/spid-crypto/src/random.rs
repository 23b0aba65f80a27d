//! Cryptographically secure random generation.
//!
//! Request identifiers must never repeat while correlation state referencing
//! them is still valid, so they are drawn from the operating system CSPRNG
//! (UUID v4, 122 random bits) rather than from any counter.

use rand::Rng;

/// Generates a cryptographically secure random byte array.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates a fresh protocol request identifier.
///
/// SAML `ID` attributes are `xs:ID` values and must not start with a digit,
/// hence the leading underscore.
#[must_use]
pub fn generate_request_id() -> String {
    format!("_{}", uuid::Uuid::new_v4())
}
