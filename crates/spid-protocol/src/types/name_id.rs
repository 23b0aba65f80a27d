//! SAML Name ID types.

use super::xml::escape;
use super::{NameIdFormat, SAML_NS};

/// SAML Name ID.
///
/// Identifies the subject of a logout request. SPID IdPs issue transient
/// identifiers qualified by their own entity ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameId {
    /// The actual identifier value.
    pub value: String,

    /// The format of the name identifier.
    pub format: NameIdFormat,

    /// The security or administrative domain that qualifies the name.
    pub name_qualifier: Option<String>,
}

impl NameId {
    /// Creates a new transient name ID.
    #[must_use]
    pub fn transient(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: NameIdFormat::Transient,
            name_qualifier: None,
        }
    }

    /// Sets the name qualifier.
    #[must_use]
    pub fn with_name_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.name_qualifier = Some(qualifier.into());
        self
    }

    /// Renders this name ID as a `<saml:NameID>` element.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let qualifier = self
            .name_qualifier
            .as_deref()
            .map(|q| format!(r#" NameQualifier="{}""#, escape(q)))
            .unwrap_or_default();
        format!(
            r#"<saml:NameID xmlns:saml="{}" Format="{}"{}>{}</saml:NameID>"#,
            SAML_NS,
            self.format.uri(),
            qualifier,
            escape(&self.value)
        )
    }
}

/// Name ID policy for authentication requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameIdPolicy {
    /// The requested name ID format.
    pub format: NameIdFormat,
}

impl NameIdPolicy {
    /// Renders this policy as a `<samlp:NameIDPolicy>` element.
    ///
    /// SPID forbids the `AllowCreate` attribute, so it is never emitted.
    #[must_use]
    pub fn to_xml(&self) -> String {
        format!(r#"<samlp:NameIDPolicy Format="{}"/>"#, self.format.uri())
    }
}
