//! SAML bindings implementation.
//!
//! SPID requests travel over the HTTP-POST binding: the signed message is
//! base64-encoded and delivered by an auto-submitting HTML form.
//!
//! # Usage
//!
//! ```rust,ignore
//! use spid_protocol::bindings::HttpPostBinding;
//!
//! let body = HttpPostBinding::encode_message(&signed_xml);
//! let html = HttpPostBinding::request_form(&body, "https://idp.example.it/sso", None);
//! ```

mod post;

pub use post::*;

/// Form parameter carrying a SAML request.
pub const SAML_REQUEST_PARAM: &str = "SAMLRequest";

/// Form parameter carrying opaque relay state.
pub const RELAY_STATE_PARAM: &str = "RelayState";
