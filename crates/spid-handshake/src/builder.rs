//! Request construction.
//!
//! A [`RequestBuilder`] turns the resolved provider, the signing credential
//! and the message parameters into a signed, transport-ready request. The
//! orchestrator only depends on the trait; [`SpidRequestBuilder`] renders the
//! SPID SAML profile.

use chrono::Utc;
use spid_protocol::bindings::HttpPostBinding;
use spid_protocol::signature::{SignatureConfig, XmlSigner};
use spid_protocol::{
    AssertionConsumer, AuthnRequest, Environment, LogoutRequest, NameId, SamlBinding, SamlError,
    SecurityLevel,
};
use thiserror::Error;

use crate::credential::SigningCredential;
use crate::directory::IdentityProvider;

/// Kind of protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Authentication request.
    Authn,
    /// Single logout request.
    Logout,
}

impl RequestKind {
    /// Returns a short label for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Authn => "authn",
            Self::Logout => "logout",
        }
    }
}

/// Message specific parameters.
#[derive(Debug, Clone, Copy)]
pub enum MessageSpec<'a> {
    /// Start authentication.
    Authn {
        /// Where the IdP should deliver its response.
        reply_to: &'a str,
        /// Requested SPID level.
        security_level: SecurityLevel,
        /// Deployment environment.
        environment: Environment,
    },
    /// Terminate an established session.
    Logout {
        /// Subject name identifier returned by the IdP at login.
        subject_id: &'a str,
        /// Session index returned by the IdP at login.
        session_index: &'a str,
    },
}

impl MessageSpec<'_> {
    /// Returns the kind of message these parameters describe.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::Authn { .. } => RequestKind::Authn,
            Self::Logout { .. } => RequestKind::Logout,
        }
    }
}

/// Input to a [`RequestBuilder`].
#[derive(Debug, Clone, Copy)]
pub struct RequestInput<'a> {
    /// Identifier the request must carry.
    pub request_id: &'a str,
    /// Endpoint the request is addressed to.
    pub destination: &'a str,
    /// Provider the request is addressed to.
    pub provider: &'a IdentityProvider,
    /// Credential to sign with.
    pub credential: &'a SigningCredential,
    /// Message specific parameters.
    pub message: MessageSpec<'a>,
}

/// A signed request ready to be delivered to an identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolRequest {
    /// Identifier carried by the request.
    pub request_id: String,
    /// Message kind.
    pub kind: RequestKind,
    /// Endpoint the body must be posted to.
    pub destination: String,
    /// Base64 encoded signed XML, the `SAMLRequest` form value.
    pub body: String,
}

impl ProtocolRequest {
    /// Renders the auto-submitting HTML form that delivers this request.
    #[must_use]
    pub fn post_form(&self, relay_state: Option<&str>) -> String {
        HttpPostBinding::request_form(&self.body, &self.destination, relay_state)
    }
}

/// Failure to build or sign a request.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Provider metadata is unusable.
    #[error("invalid provider metadata: {0}")]
    InvalidMetadata(String),

    /// The assembled request failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(#[from] SamlError),
}

/// Produces signed protocol requests.
pub trait RequestBuilder: Send + Sync + 'static {
    /// Builds and signs a request.
    ///
    /// The returned request carries `input.request_id` unchanged.
    fn build(&self, input: &RequestInput<'_>) -> Result<ProtocolRequest, BuildError>;
}

/// Builder for SPID profiled SAML requests.
#[derive(Debug, Clone)]
pub struct SpidRequestBuilder {
    entity_id: String,
    assertion_consumer_service_index: u32,
    attribute_consuming_service_index: Option<u32>,
    signature: SignatureConfig,
}

impl SpidRequestBuilder {
    /// Creates a builder issuing requests as `entity_id`.
    #[must_use]
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            assertion_consumer_service_index: 0,
            attribute_consuming_service_index: None,
            signature: SignatureConfig::default(),
        }
    }

    /// Sets the assertion consumer index used in production.
    #[must_use]
    pub const fn with_assertion_consumer_index(mut self, index: u32) -> Self {
        self.assertion_consumer_service_index = index;
        self
    }

    /// Requests the attribute set registered under `index`.
    #[must_use]
    pub const fn with_attribute_consuming_index(mut self, index: u32) -> Self {
        self.attribute_consuming_service_index = Some(index);
        self
    }

    /// Sets the signature configuration.
    #[must_use]
    pub fn with_signature_config(mut self, config: SignatureConfig) -> Self {
        self.signature = config;
        self
    }

    /// Returns the service provider entity ID.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn authn_xml(
        &self,
        input: &RequestInput<'_>,
        reply_to: &str,
        security_level: SecurityLevel,
        environment: Environment,
    ) -> Result<String, BuildError> {
        let consumer = match environment {
            Environment::Prod => AssertionConsumer::Index(self.assertion_consumer_service_index),
            Environment::Dev => {
                if reply_to.trim().is_empty() {
                    return Err(BuildError::InvalidRequest(
                        "a reply-to URL is required outside production".to_string(),
                    ));
                }
                AssertionConsumer::Url {
                    url: reply_to.to_string(),
                    binding: SamlBinding::HttpPost,
                }
            }
        };

        let mut request = AuthnRequest::with_id(input.request_id, &self.entity_id)
            .with_destination(input.destination)
            .issued_at(Utc::now() - input.provider.issue_instant_skew())
            .with_assertion_consumer(consumer)
            .with_security_level(security_level);
        if let Some(index) = self.attribute_consuming_service_index {
            request = request.with_attribute_consuming_service(index);
        }

        request
            .validate()
            .map_err(|e| BuildError::InvalidRequest(e.to_string()))?;
        Ok(request.to_xml())
    }

    fn logout_xml(
        &self,
        input: &RequestInput<'_>,
        subject_id: &str,
        session_index: &str,
    ) -> Result<String, BuildError> {
        let name_id = NameId::transient(subject_id).with_name_qualifier(&input.provider.entity_id);
        let request = LogoutRequest::with_id(input.request_id, &self.entity_id, name_id)
            .with_destination(input.destination)
            .issued_at(Utc::now() - input.provider.issue_instant_skew())
            .with_session_index(session_index);

        request
            .validate()
            .map_err(|e| BuildError::InvalidRequest(e.to_string()))?;
        Ok(request.to_xml())
    }
}

impl RequestBuilder for SpidRequestBuilder {
    fn build(&self, input: &RequestInput<'_>) -> Result<ProtocolRequest, BuildError> {
        if input.destination.trim().is_empty() {
            return Err(BuildError::InvalidMetadata(format!(
                "no {} endpoint for '{}'",
                input.message.kind().as_str(),
                input.provider.name
            )));
        }

        let xml = match input.message {
            MessageSpec::Authn {
                reply_to,
                security_level,
                environment,
            } => self.authn_xml(input, reply_to, security_level, environment)?,
            MessageSpec::Logout {
                subject_id,
                session_index,
            } => self.logout_xml(input, subject_id, session_index)?,
        };

        let signed = XmlSigner::new(
            input.credential.private_key_der(),
            Some(input.credential.certificate_der()),
        )
        .with_config(self.signature.clone())
        .sign(&xml, input.request_id)?;

        Ok(ProtocolRequest {
            request_id: input.request_id.to_string(),
            kind: input.message.kind(),
            destination: input.destination.to_string(),
            body: HttpPostBinding::encode_message(&signed),
        })
    }
}
