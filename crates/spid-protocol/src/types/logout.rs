//! SAML Logout types.
//!
//! Single Logout (SLO) request sent by the service provider to terminate the
//! session an IdP established for a subject.

use chrono::{DateTime, Utc};

use super::xml::{escape, format_instant};
use crate::error::{SamlError, SamlResult};
use super::{NameId, NameIdFormat, SAMLP_NS, SAML_NS};

/// SAML Logout Request.
#[derive(Debug, Clone)]
pub struct LogoutRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the requester.
    pub issuer: String,

    /// The URL where this request is sent.
    pub destination: Option<String>,

    /// The name identifier of the principal to log out.
    pub name_id: NameId,

    /// Session indexes to terminate.
    pub session_indexes: Vec<String>,
}

impl LogoutRequest {
    /// Creates a new logout request with the given ID.
    #[must_use]
    pub fn with_id(id: impl Into<String>, issuer: impl Into<String>, name_id: NameId) -> Self {
        Self {
            id: id.into(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            destination: None,
            name_id,
            session_indexes: Vec::new(),
        }
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the issue instant.
    #[must_use]
    pub const fn issued_at(mut self, instant: DateTime<Utc>) -> Self {
        self.issue_instant = instant;
        self
    }

    /// Adds a session index to terminate.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_indexes.push(index.into());
        self
    }

    /// Validates the basic structure of this request.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MissingElement`] naming the first absent part, or
    /// [`SamlError::InvalidRequest`] for a blank session index.
    pub fn validate(&self) -> SamlResult<()> {
        if self.id.is_empty() {
            return Err(SamlError::MissingElement("ID".to_string()));
        }
        if self.issuer.is_empty() {
            return Err(SamlError::MissingElement("Issuer".to_string()));
        }
        if self.name_id.value.trim().is_empty() {
            return Err(SamlError::MissingElement("NameID".to_string()));
        }
        if self.session_indexes.is_empty() {
            return Err(SamlError::MissingElement("SessionIndex".to_string()));
        }
        if self.session_indexes.iter().any(|index| index.trim().is_empty()) {
            return Err(SamlError::InvalidRequest("blank SessionIndex".to_string()));
        }
        Ok(())
    }

    /// Renders this request as an unsigned XML document.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let destination = self
            .destination
            .as_deref()
            .map(|d| format!(r#" Destination="{}""#, escape(d)))
            .unwrap_or_default();
        let session_indexes: String = self
            .session_indexes
            .iter()
            .map(|index| format!("<samlp:SessionIndex>{}</samlp:SessionIndex>", escape(index)))
            .collect();

        format!(
            concat!(
                r#"<samlp:LogoutRequest xmlns:samlp="{samlp}" ID="{id}" Version="2.0" "#,
                r#"IssueInstant="{instant}"{destination}>"#,
                r#"<saml:Issuer xmlns:saml="{saml}" Format="{entity}" NameQualifier="{issuer}">"#,
                r#"{issuer}</saml:Issuer>"#,
                r#"{name_id}{session_indexes}</samlp:LogoutRequest>"#,
            ),
            samlp = SAMLP_NS,
            saml = SAML_NS,
            id = escape(&self.id),
            instant = format_instant(self.issue_instant),
            destination = destination,
            entity = NameIdFormat::Entity.uri(),
            issuer = escape(&self.issuer),
            name_id = self.name_id.to_xml(),
            session_indexes = session_indexes,
        )
    }
}
