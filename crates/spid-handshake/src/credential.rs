//! Signing credential providers.
//!
//! The service provider signs every request with the key registered in the
//! SPID federation. Credentials are loaded from PEM files and can be swapped
//! atomically at runtime; requests already being signed keep the credential
//! they started with.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use thiserror::Error;
use x509_parser::oid_registry::OID_PKCS1_RSAENCRYPTION;
use x509_parser::prelude::{FromDer, X509Certificate};

/// Errors raised while obtaining the signing credential.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// No credential has been loaded yet.
    #[error("no signing credential loaded")]
    NotLoaded,

    /// A credential file could not be read.
    #[error("failed to read credential: {0}")]
    Io(String),

    /// The certificate could not be parsed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The private key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidKey(String),
}

/// Certificate and private key used to sign outgoing requests.
#[derive(Clone)]
pub struct SigningCredential {
    certificate_der: Vec<u8>,
    private_key_der: Vec<u8>,
    subject: String,
    not_after: Option<DateTime<Utc>>,
}

impl SigningCredential {
    /// Builds a credential from DER encoded material.
    ///
    /// The certificate must carry the RSA public key of `private_key_der`,
    /// since IdPs verify the signature with the key embedded in `KeyInfo`.
    /// The validity period is recorded but not enforced: SPID identity
    /// providers trust the key published in federation metadata, so an
    /// expired certificate still produces acceptable signatures.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate or the RSA key cannot be parsed,
    /// or if they do not belong together.
    pub fn from_der(
        certificate_der: Vec<u8>,
        private_key_der: Vec<u8>,
    ) -> Result<Self, CredentialError> {
        let public_key = spid_crypto::rsa_public_key(&private_key_der)
            .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;

        let (subject, not_after) = {
            let (_, cert) = X509Certificate::from_der(&certificate_der)
                .map_err(|e| CredentialError::InvalidCertificate(e.to_string()))?;
            let spki = cert.public_key();
            if spki.algorithm.algorithm != OID_PKCS1_RSAENCRYPTION {
                return Err(CredentialError::InvalidKey(format!(
                    "certificate key algorithm {} is not RSA",
                    spki.algorithm.algorithm
                )));
            }
            if spki.subject_public_key.data.as_ref() != public_key.as_slice() {
                return Err(CredentialError::InvalidKey(
                    "private key does not match the certificate".to_string(),
                ));
            }
            let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0);
            (cert.subject().to_string(), not_after)
        };

        Ok(Self {
            certificate_der,
            private_key_der,
            subject,
            not_after,
        })
    }

    /// Builds a credential from PEM text.
    ///
    /// The key may be PKCS#8 (`PRIVATE KEY`) or PKCS#1 (`RSA PRIVATE KEY`).
    pub fn from_pem(
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> Result<Self, CredentialError> {
        let certificate_der = spid_crypto::pem_to_der(certificate_pem, "CERTIFICATE")
            .ok_or_else(|| {
                CredentialError::InvalidCertificate("no CERTIFICATE PEM block".to_string())
            })?;
        let private_key_der = spid_crypto::pem_to_der(private_key_pem, "PRIVATE KEY")
            .or_else(|| spid_crypto::pem_to_der(private_key_pem, "RSA PRIVATE KEY"))
            .ok_or_else(|| CredentialError::InvalidKey("no PRIVATE KEY PEM block".to_string()))?;
        Self::from_der(certificate_der, private_key_der)
    }

    /// Returns the certificate in DER format.
    #[must_use]
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// Returns the private key in DER format.
    #[must_use]
    pub fn private_key_der(&self) -> &[u8] {
        &self.private_key_der
    }

    /// Returns the certificate subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the end of the certificate validity period.
    #[must_use]
    pub const fn not_after(&self) -> Option<DateTime<Utc>> {
        self.not_after
    }

    /// Returns true if the certificate has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.not_after.is_some_and(|not_after| not_after < now)
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("subject", &self.subject)
            .field("not_after", &self.not_after)
            .field("private_key_der", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Source of the current signing credential.
pub trait SigningKeyProvider: Send + Sync + 'static {
    /// Returns the credential to sign with.
    fn current_credential(&self) -> Result<Arc<SigningCredential>, CredentialError>;
}

/// Provider that always returns the same credential.
#[derive(Debug, Clone)]
pub struct StaticKeyProvider {
    credential: Arc<SigningCredential>,
}

impl StaticKeyProvider {
    /// Wraps a credential.
    #[must_use]
    pub fn new(credential: SigningCredential) -> Self {
        Self {
            credential: Arc::new(credential),
        }
    }
}

impl SigningKeyProvider for StaticKeyProvider {
    fn current_credential(&self) -> Result<Arc<SigningCredential>, CredentialError> {
        Ok(Arc::clone(&self.credential))
    }
}

/// Provider reading a certificate and key from PEM files.
///
/// [`FileKeyProvider::reload`] re-reads both files and swaps the credential
/// in one step. A failed reload keeps serving the previous credential.
pub struct FileKeyProvider {
    certificate_path: PathBuf,
    private_key_path: PathBuf,
    current: ArcSwapOption<SigningCredential>,
}

impl FileKeyProvider {
    /// Creates a provider and performs the initial load.
    ///
    /// # Errors
    ///
    /// Returns an error if either file is unreadable or malformed.
    pub fn load(
        certificate_path: impl Into<PathBuf>,
        private_key_path: impl Into<PathBuf>,
    ) -> Result<Self, CredentialError> {
        let provider = Self::unloaded(certificate_path, private_key_path);
        provider.reload()?;
        Ok(provider)
    }

    /// Creates a provider without reading the files.
    ///
    /// [`SigningKeyProvider::current_credential`] fails with
    /// [`CredentialError::NotLoaded`] until a reload succeeds.
    #[must_use]
    pub fn unloaded(
        certificate_path: impl Into<PathBuf>,
        private_key_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            certificate_path: certificate_path.into(),
            private_key_path: private_key_path.into(),
            current: ArcSwapOption::empty(),
        }
    }

    /// Re-reads the credential files and publishes the result.
    pub fn reload(&self) -> Result<Arc<SigningCredential>, CredentialError> {
        let certificate_pem = read_pem(&self.certificate_path)?;
        let private_key_pem = read_pem(&self.private_key_path)?;
        let credential = SigningCredential::from_pem(&certificate_pem, &private_key_pem)?;
        let credential = Arc::new(credential);

        if credential.is_expired_at(Utc::now()) {
            tracing::warn!(
                subject = credential.subject(),
                not_after = ?credential.not_after(),
                "signing certificate has expired; requests will still be signed with it"
            );
        }
        tracing::info!(
            path = %self.certificate_path.display(),
            subject = credential.subject(),
            "loaded signing credential"
        );

        self.current.store(Some(Arc::clone(&credential)));
        Ok(credential)
    }
}

impl fmt::Debug for FileKeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileKeyProvider")
            .field("certificate_path", &self.certificate_path)
            .field("private_key_path", &self.private_key_path)
            .field("loaded", &self.current.load().is_some())
            .finish()
    }
}

impl SigningKeyProvider for FileKeyProvider {
    fn current_credential(&self) -> Result<Arc<SigningCredential>, CredentialError> {
        self.current.load_full().ok_or(CredentialError::NotLoaded)
    }
}

fn read_pem(path: &Path) -> Result<String, CredentialError> {
    std::fs::read_to_string(path)
        .map_err(|e| CredentialError::Io(format!("{}: {e}", path.display())))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::SigningCredential;

    /// PEM encoded self-signed certificate and RSA key.
    pub struct PemPair {
        pub certificate_pem: String,
        pub private_key_pem: String,
    }

    pub fn pem_pair() -> PemPair {
        let key = spid_crypto::test_util::generate_rsa_key();
        PemPair {
            certificate_pem: key.certificate_pem("sp.example.it"),
            private_key_pem: key.private_key_pem(),
        }
    }

    pub fn credential() -> SigningCredential {
        let pair = pem_pair();
        SigningCredential::from_pem(&pair.certificate_pem, &pair.private_key_pem).unwrap()
    }
}
