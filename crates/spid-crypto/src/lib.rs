//! # spid-crypto
//!
//! Cryptographic primitives for the SPID service provider using aws-lc-rs.
//!
//! SPID mandates RSA-SHA256 signatures with SHA-256 digests, so unlike a
//! general purpose key service this crate exposes SHA-256 based operations as
//! the default rather than as a legacy path.
//!
//! - [`hash`] - SHA-256 digests and HMAC-SHA256 tags
//! - [`pem`] - PEM armor decoding for keys and certificates
//! - [`random`] - request identifiers and random secrets
//! - [`rsa`] - RSA PKCS#1 v1.5 signing and verification

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod hash;
pub mod pem;
pub mod random;
pub mod rsa;

pub use error::CryptoError;
pub use hash::{sha256, HmacKey};
pub use pem::pem_to_der;
pub use random::{generate_request_id, random_bytes};
pub use rsa::{rsa_public_key, rsa_sign, rsa_verify, RsaAlgorithm};

#[cfg(any(test, feature = "test-util"))]
pub use rsa::test_util;
