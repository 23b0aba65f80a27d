//! Handshake orchestration.
//!
//! Both operations follow the same path: resolve the IdP, fetch the signing
//! credential, build the request and replace the correlation record with
//! one naming the new request. Logout first reads the record written at
//! login to learn whom to log out, and always discards it.

use std::sync::Arc;

use spid_crypto::generate_request_id;
use spid_protocol::{Environment, SecurityLevel};

use crate::builder::{MessageSpec, ProtocolRequest, RequestBuilder, RequestInput};
use crate::correlation::{CorrelationCarrier, CorrelationRecord, CorrelationStore};
use crate::credential::SigningKeyProvider;
use crate::directory::{IdentityProvider, IdentityProviderDirectory};
use crate::error::{HandshakeError, HandshakeResult};

/// Parameters of [`HandshakeOrchestrator::begin_authentication`].
#[derive(Debug, Clone, Copy)]
pub struct BeginAuthentication<'a> {
    /// Short name of the identity provider the user picked.
    pub provider_name: &'a str,
    /// Requested SPID level.
    pub security_level: SecurityLevel,
    /// Where the IdP should deliver its response.
    pub reply_to: &'a str,
    /// Deployment environment.
    pub environment: Environment,
}

/// Subject and session of a completed login.
struct EstablishedSession {
    idp_name: String,
    subject_id: String,
    session_index: String,
}

/// Starts authentication and logout handshakes.
pub struct HandshakeOrchestrator<D, K, B> {
    directory: Arc<D>,
    keys: Arc<K>,
    builder: B,
    store: CorrelationStore,
}

impl<D, K, B> HandshakeOrchestrator<D, K, B>
where
    D: IdentityProviderDirectory,
    K: SigningKeyProvider,
    B: RequestBuilder,
{
    /// Creates an orchestrator.
    pub fn new(
        directory: Arc<D>,
        keys: Arc<K>,
        builder: B,
        store: CorrelationStore,
    ) -> Self {
        Self {
            directory,
            keys,
            builder,
            store,
        }
    }

    /// Returns the identity provider directory.
    #[must_use]
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Returns the signing key provider.
    #[must_use]
    pub fn keys(&self) -> &K {
        &self.keys
    }

    /// Returns the correlation store.
    #[must_use]
    pub const fn store(&self) -> &CorrelationStore {
        &self.store
    }

    /// Starts authentication with the named identity provider.
    ///
    /// On success the carrier is set to a fresh record naming the provider
    /// and the new request ID. On failure the carrier is left untouched.
    pub fn begin_authentication(
        &self,
        carrier: &mut CorrelationCarrier,
        params: &BeginAuthentication<'_>,
    ) -> HandshakeResult<ProtocolRequest> {
        let result = self.resolve(params.provider_name).and_then(|provider| {
            self.issue(
                carrier,
                &provider,
                &provider.authn_endpoint,
                MessageSpec::Authn {
                    reply_to: params.reply_to,
                    security_level: params.security_level,
                    environment: params.environment,
                },
            )
        });
        log_outcome("authn", Some(params.provider_name), &result);
        result
    }

    /// Starts single logout of the session recorded in the carrier.
    ///
    /// Any carrier the client presented is cleared before the record is
    /// checked, so a failed logout never leaves a stale record behind. On
    /// success the carrier is set to a record naming the logout request.
    pub fn begin_logout(
        &self,
        carrier: &mut CorrelationCarrier,
    ) -> HandshakeResult<ProtocolRequest> {
        let session = self
            .take_session(carrier)
            .inspect_err(|e| log_failure("logout", None, e))?;

        let result = self.resolve(&session.idp_name).and_then(|provider| {
            self.issue(
                carrier,
                &provider,
                &provider.logout_endpoint,
                MessageSpec::Logout {
                    subject_id: &session.subject_id,
                    session_index: &session.session_index,
                },
            )
        });
        log_outcome("logout", Some(session.idp_name.as_str()), &result);
        result
    }

    /// Reads and clears the login record.
    fn take_session(
        &self,
        carrier: &mut CorrelationCarrier,
    ) -> HandshakeResult<EstablishedSession> {
        if carrier.incoming().is_none() {
            return Err(HandshakeError::MissingSession);
        }
        let record = self.store.read(carrier);
        self.store.destroy(carrier);
        let record = record.ok_or(HandshakeError::MissingSession)?;

        let missing = record.missing_logout_fields();
        match (record.idp_name, record.subject_id, record.session_index) {
            (Some(idp_name), Some(subject_id), Some(session_index)) if missing.is_empty() => {
                Ok(EstablishedSession {
                    idp_name,
                    subject_id,
                    session_index,
                })
            }
            _ => Err(HandshakeError::IncompleteSession { missing }),
        }
    }

    fn resolve(&self, name: &str) -> HandshakeResult<Arc<IdentityProvider>> {
        self.directory
            .resolve(name)
            .map_err(|_| HandshakeError::UnknownProvider(name.to_string()))
    }

    fn issue(
        &self,
        carrier: &mut CorrelationCarrier,
        provider: &IdentityProvider,
        destination: &str,
        message: MessageSpec<'_>,
    ) -> HandshakeResult<ProtocolRequest> {
        let credential = self
            .keys
            .current_credential()
            .map_err(HandshakeError::SigningCredentialUnavailable)?;

        let request_id = generate_request_id();
        let request = self
            .builder
            .build(&RequestInput {
                request_id: &request_id,
                destination,
                provider,
                credential: &credential,
                message,
            })
            .map_err(HandshakeError::RequestConstructionFailed)?;

        self.store
            .write(carrier, &CorrelationRecord::pending(&provider.name, &request.request_id));
        Ok(request)
    }
}

fn log_outcome(
    operation: &str,
    provider: Option<&str>,
    result: &HandshakeResult<ProtocolRequest>,
) {
    match result {
        Ok(request) => tracing::info!(
            operation,
            idp = provider,
            request_id = %request.request_id,
            destination = %request.destination,
            "handshake request issued"
        ),
        Err(e) => log_failure(operation, provider, e),
    }
}

fn log_failure(operation: &str, provider: Option<&str>, error: &HandshakeError) {
    if error.is_user_recoverable() {
        tracing::warn!(operation, idp = provider, error = %error, "handshake not started");
    } else {
        tracing::error!(operation, idp = provider, error = %error, "handshake failed");
    }
}
