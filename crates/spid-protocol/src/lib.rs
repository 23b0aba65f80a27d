//! SPID SAML 2.0 request-side protocol support.
//!
//! This crate builds the messages a SPID service provider sends to an
//! identity provider:
//!
//! - **AuthnRequest construction** - SPID-profiled authentication requests
//! - **LogoutRequest construction** - single logout for an established session
//! - **XML signature** - enveloped RSA signatures over the request element
//! - **POST binding** - auto-submitting HTML forms carrying `SAMLRequest`
//!
//! Response and assertion processing are not part of this crate.
//!
//! # Architecture
//!
//! - [`types`] - request types, constants and XML rendering
//! - [`signature`] - XML-DSig signing
//! - [`bindings`] - HTTP-POST binding
//! - [`error`] - error types for protocol operations
//!
//! # Example
//!
//! ```rust,ignore
//! use spid_protocol::{AuthnRequest, SecurityLevel};
//! use spid_protocol::signature::XmlSigner;
//!
//! let request = AuthnRequest::with_id(request_id, "https://sp.example.it")
//!     .with_destination("https://idp.example.it/sso")
//!     .with_security_level(SecurityLevel::L2);
//! let signed = XmlSigner::new(&key_der, Some(&cert_der)).sign(&request.to_xml(), &request.id)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bindings;
pub mod error;
pub mod signature;
pub mod types;

pub use error::{SamlError, SamlResult};
pub use types::*;
