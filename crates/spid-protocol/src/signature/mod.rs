//! XML Signature support for SPID requests.
//!
//! Outgoing requests carry an enveloped XML-DSig signature placed right after
//! the `Issuer` element, with the SP certificate in `KeyInfo`.
//!
//! # Signing Algorithms
//!
//! - RSA-SHA256 (SPID baseline)
//! - RSA-SHA384
//! - RSA-SHA512
//!
//! References are always digested with SHA-256.

mod signer;

pub use signer::*;

use spid_crypto::RsaAlgorithm;

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// RSA with SHA-256.
    #[default]
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
}

impl SignatureAlgorithm {
    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        self.rsa().xml_dsig_uri()
    }

    /// Returns the underlying RSA algorithm.
    #[must_use]
    pub const fn rsa(&self) -> RsaAlgorithm {
        match self {
            Self::RsaSha256 => RsaAlgorithm::Rs256,
            Self::RsaSha384 => RsaAlgorithm::Rs384,
            Self::RsaSha512 => RsaAlgorithm::Rs512,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        [Self::RsaSha256, Self::RsaSha384, Self::RsaSha512]
            .into_iter()
            .find(|alg| alg.uri() == uri)
    }
}

/// Configuration for signature creation.
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    /// The signature algorithm to use.
    pub algorithm: SignatureAlgorithm,
    /// Whether to include the X.509 certificate in the signature.
    pub include_certificate: bool,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::RsaSha256,
            include_certificate: true,
        }
    }
}

impl SignatureConfig {
    /// Creates a new signature configuration with the given algorithm.
    #[must_use]
    pub const fn with_algorithm(algorithm: SignatureAlgorithm) -> Self {
        Self {
            algorithm,
            include_certificate: true,
        }
    }
}
