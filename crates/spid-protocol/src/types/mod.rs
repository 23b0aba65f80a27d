//! SAML 2.0 request types and data structures.
//!
//! This module contains the messages a SPID service provider sends and the
//! constants used to render them.

mod authn_request;
mod constants;
mod logout;
mod name_id;
mod xml;

pub use authn_request::*;
pub use constants::*;
pub use logout::*;
pub use name_id::*;
