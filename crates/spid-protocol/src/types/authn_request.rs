//! SAML AuthnRequest types.
//!
//! Authentication request message sent by the SPID service provider to an
//! identity provider.

use chrono::{DateTime, Utc};

use super::xml::{escape, format_instant};
use crate::error::{SamlError, SamlResult};
use super::{NameIdFormat, NameIdPolicy, SamlBinding, SecurityLevel, SAMLP_NS, SAML_NS};

/// How the IdP should locate the service provider's assertion consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionConsumer {
    /// Index into the endpoints published in the SP metadata.
    Index(u32),
    /// Explicit URL and response binding.
    Url {
        /// Assertion consumer service URL.
        url: String,
        /// Binding the IdP must use for the response.
        binding: SamlBinding,
    },
}

/// SAML Authentication Request.
#[derive(Debug, Clone)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the service provider issuing the request.
    pub issuer: String,

    /// The IdP endpoint this request is addressed to.
    pub destination: Option<String>,

    /// Where the IdP should deliver its response.
    pub assertion_consumer: Option<AssertionConsumer>,

    /// Index into the SP's attribute consuming service list.
    pub attribute_consuming_service_index: Option<u32>,

    /// Name ID policy constraints.
    pub name_id_policy: NameIdPolicy,

    /// Requested SPID level.
    pub security_level: SecurityLevel,

    /// Whether the IdP must authenticate the user directly.
    pub force_authn: bool,
}

impl AuthnRequest {
    /// Creates a new authentication request with the given ID.
    #[must_use]
    pub fn with_id(id: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            destination: None,
            assertion_consumer: None,
            attribute_consuming_service_index: None,
            name_id_policy: NameIdPolicy::default(),
            security_level: SecurityLevel::L1,
            force_authn: false,
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

    /// Sets the assertion consumer reference.
    #[must_use]
    pub fn with_assertion_consumer(mut self, consumer: AssertionConsumer) -> Self {
        self.assertion_consumer = Some(consumer);
        self
    }

    /// Sets the attribute consuming service index.
    #[must_use]
    pub const fn with_attribute_consuming_service(mut self, index: u32) -> Self {
        self.attribute_consuming_service_index = Some(index);
        self
    }

    /// Sets the requested SPID level, forcing authentication above level 1.
    #[must_use]
    pub const fn with_security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = level;
        self.force_authn = level.requires_force_authn();
        self
    }

    /// Validates the basic structure of this request.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MissingElement`] naming the first absent part.
    pub fn validate(&self) -> SamlResult<()> {
        if self.id.is_empty() {
            return Err(SamlError::MissingElement("ID".to_string()));
        }
        if self.issuer.is_empty() {
            return Err(SamlError::MissingElement("Issuer".to_string()));
        }
        if self.destination.as_deref().is_none_or(str::is_empty) {
            return Err(SamlError::MissingElement("Destination".to_string()));
        }
        if self.assertion_consumer.is_none() {
            return Err(SamlError::MissingElement("AssertionConsumerService".to_string()));
        }
        Ok(())
    }

    /// Renders this request as an unsigned XML document.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut attrs = format!(
            r#"ID="{}" Version="2.0" IssueInstant="{}""#,
            escape(&self.id),
            format_instant(self.issue_instant)
        );
        if let Some(destination) = &self.destination {
            attrs.push_str(&format!(r#" Destination="{}""#, escape(destination)));
        }
        if self.force_authn {
            attrs.push_str(r#" ForceAuthn="true""#);
        }
        match &self.assertion_consumer {
            Some(AssertionConsumer::Index(index)) => {
                attrs.push_str(&format!(r#" AssertionConsumerServiceIndex="{index}""#));
            }
            Some(AssertionConsumer::Url { url, binding }) => {
                attrs.push_str(&format!(
                    r#" AssertionConsumerServiceURL="{}" ProtocolBinding="{}""#,
                    escape(url),
                    binding.uri()
                ));
            }
            None => {}
        }
        if let Some(index) = self.attribute_consuming_service_index {
            attrs.push_str(&format!(r#" AttributeConsumingServiceIndex="{index}""#));
        }

        // Each namespace is declared on the outermost element using it, which
        // keeps inclusive and exclusive canonicalization identical.
        format!(
            concat!(
                r#"<samlp:AuthnRequest xmlns:samlp="{samlp}" {attrs}>"#,
                r#"<saml:Issuer xmlns:saml="{saml}" Format="{entity}" NameQualifier="{issuer}">"#,
                r#"{issuer}</saml:Issuer>"#,
                r#"{policy}"#,
                r#"<samlp:RequestedAuthnContext Comparison="minimum">"#,
                r#"<saml:AuthnContextClassRef xmlns:saml="{saml}">"#,
                r#"{level}</saml:AuthnContextClassRef>"#,
                r#"</samlp:RequestedAuthnContext>"#,
                r#"</samlp:AuthnRequest>"#,
            ),
            samlp = SAMLP_NS,
            saml = SAML_NS,
            attrs = attrs,
            entity = NameIdFormat::Entity.uri(),
            issuer = escape(&self.issuer),
            policy = self.name_id_policy.to_xml(),
            level = self.security_level.uri(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> AuthnRequest {
        AuthnRequest::with_id("_req1", "https://sp.example.it")
            .with_destination("https://idp.example.it/sso")
            .issued_at(Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap())
    }

    #[test]
    fn authn_request_creation() {
        let request = request()
            .with_assertion_consumer(AssertionConsumer::Index(0))
            .with_security_level(SecurityLevel::L2);

        assert_eq!(request.id, "_req1");
        assert!(request.force_authn);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn authn_request_validation() {
        let valid = request().with_assertion_consumer(AssertionConsumer::Index(0));
        assert!(valid.validate().is_ok());

        let mut invalid = valid.clone();
        invalid.id = String::new();
        assert!(invalid.validate().is_err());

        let mut invalid = valid.clone();
        invalid.destination = None;
        assert!(matches!(
            invalid.validate(),
            Err(SamlError::MissingElement(ref name)) if name == "Destination"
        ));

        assert!(request().validate().is_err());
    }

    #[test]
    fn production_xml_uses_indexes() {
        let xml = request()
            .with_assertion_consumer(AssertionConsumer::Index(0))
            .with_attribute_consuming_service(1)
            .to_xml();

        assert!(xml.starts_with("<samlp:AuthnRequest "));
        assert!(xml.contains(r#"ID="_req1""#));
        assert!(xml.contains(r#"IssueInstant="2026-10-19T09:00:00Z""#));
        assert!(xml.contains(r#"Destination="https://idp.example.it/sso""#));
        assert!(xml.contains(r#"AssertionConsumerServiceIndex="0""#));
        assert!(xml.contains(r#"AttributeConsumingServiceIndex="1""#));
        assert!(!xml.contains("AssertionConsumerServiceURL"));
        assert!(!xml.contains("ForceAuthn"));
        assert!(xml.contains("https://www.spid.gov.it/SpidL1"));
        assert!(xml.contains(r#"Comparison="minimum""#));
    }

    #[test]
    fn development_xml_spells_out_the_consumer() {
        let xml = request()
            .with_assertion_consumer(AssertionConsumer::Url {
                url: "https://sp.example.it/acs?a=1&b=2".to_string(),
                binding: SamlBinding::HttpPost,
            })
            .with_security_level(SecurityLevel::L3)
            .to_xml();

        assert!(xml.contains(
            r#"AssertionConsumerServiceURL="https://sp.example.it/acs?a=1&amp;b=2""#
        ));
        assert!(xml.contains(SamlBinding::HttpPost.uri()));
        assert!(xml.contains(r#"ForceAuthn="true""#));
        assert!(xml.contains("https://www.spid.gov.it/SpidL3"));
    }

    #[test]
    fn namespaces_are_declared_where_used() {
        let xml = request().with_assertion_consumer(AssertionConsumer::Index(0)).to_xml();
        let root = &xml[..xml.find('>').unwrap()];
        assert!(root.contains(&format!(r#"xmlns:samlp="{SAMLP_NS}""#)));
        assert!(!root.contains("xmlns:saml="));
        assert!(xml.contains(&format!(r#"<saml:Issuer xmlns:saml="{SAML_NS}""#)));
        assert!(xml.contains(&format!(r#"<saml:AuthnContextClassRef xmlns:saml="{SAML_NS}">"#)));
    }

    #[test]
    fn issuer_precedes_policy() {
        let xml = request().to_xml();
        let issuer = xml.find("</saml:Issuer>").unwrap();
        let policy = xml.find("<samlp:NameIDPolicy").unwrap();
        assert!(issuer < policy);
    }
}
