//! # spid-handshake
//!
//! Outbound half of a SPID service provider: starts authentication and
//! single logout with an Italian public digital identity provider.
//!
//! Each operation resolves the IdP, obtains the signing credential, has a
//! [`RequestBuilder`] produce a signed protocol message and rotates the
//! correlation record the client carries between legs of the handshake.
//!
//! - [`directory`] - identity provider lookup by short name
//! - [`credential`] - signing credential providers with hot reload
//! - [`builder`] - SPID request construction and signing
//! - [`correlation`] - tamper-evident correlation carrier
//! - [`orchestrator`] - the two handshake operations
//!
//! # Example
//!
//! ```rust,ignore
//! let orchestrator = HandshakeOrchestrator::new(directory, keys, builder, store);
//! let mut carrier = CorrelationCarrier::new(cookie_value);
//! let request = orchestrator.begin_authentication(
//!     &mut carrier,
//!     &BeginAuthentication {
//!         provider_name: "TestIdP",
//!         security_level: SecurityLevel::L2,
//!         reply_to: "https://sp.example.it/spid/acs",
//!         environment: Environment::Dev,
//!     },
//! )?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod builder;
pub mod correlation;
pub mod credential;
pub mod directory;
pub mod error;
pub mod orchestrator;

pub use builder::{
    BuildError, MessageSpec, ProtocolRequest, RequestBuilder, RequestInput, RequestKind,
    SpidRequestBuilder,
};
pub use correlation::{CarrierWrite, CorrelationCarrier, CorrelationRecord, CorrelationStore};
pub use credential::{
    CredentialError, FileKeyProvider, SigningCredential, SigningKeyProvider, StaticKeyProvider,
};
pub use directory::{DirectoryError, IdentityProvider, IdentityProviderDirectory, StaticDirectory};
pub use error::{HandshakeError, HandshakeResult};
pub use orchestrator::{BeginAuthentication, HandshakeOrchestrator};
