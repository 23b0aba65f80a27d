//! XML Signature creation.
//!
//! Signs SPID request documents using XML-DSig enveloped signatures.
//!
//! Both the referenced element and `SignedInfo` are canonicalized before
//! hashing. The canonicalizer implements inclusive C14N while the signature
//! advertises exclusive C14N; the two agree because request documents
//! declare every namespace on the outermost element that uses it, and
//! `SignedInfo` only uses the `ds` namespace it declares itself.

use base64::Engine;
use xml_canonicalization::Canonicalizer;

use crate::error::{SamlError, SamlResult};
use crate::types::{canonicalization_algorithms, digest_algorithms, XMLDSIG_NS};

use super::SignatureConfig;

/// XML document signer.
///
/// Borrows the key material for the duration of a single signing operation;
/// nothing is copied or retained.
pub struct XmlSigner<'a> {
    /// The private key in DER format.
    private_key_der: &'a [u8],
    /// The X.509 certificate in DER format (optional).
    certificate_der: Option<&'a [u8]>,
    /// Signature configuration.
    config: SignatureConfig,
}

impl<'a> XmlSigner<'a> {
    /// Creates a new signer with an RSA private key.
    ///
    /// # Arguments
    ///
    /// * `private_key_der` - The private key in DER format (PKCS#1 or PKCS#8)
    /// * `certificate_der` - Optional X.509 certificate in DER format
    #[must_use]
    pub fn new(private_key_der: &'a [u8], certificate_der: Option<&'a [u8]>) -> Self {
        Self {
            private_key_der,
            certificate_der,
            config: SignatureConfig::default(),
        }
    }

    /// Sets the signature configuration.
    #[must_use]
    pub fn with_config(mut self, config: SignatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Signs an XML document.
    ///
    /// # Arguments
    ///
    /// * `xml` - The XML document to sign
    /// * `reference_id` - The ID of the element to sign (without the '#' prefix)
    ///
    /// # Returns
    ///
    /// The signed XML document with the `<ds:Signature>` element inserted.
    pub fn sign(&self, xml: &str, reference_id: &str) -> SamlResult<String> {
        let (element_start, insert_position) =
            find_element_and_insert_position(xml, reference_id)?;

        let canonical_element = canonicalize(extract_element(xml, element_start)?)?;
        let digest = spid_crypto::sha256(canonical_element.as_bytes());
        let digest_b64 = base64::engine::general_purpose::STANDARD.encode(&digest);

        let signed_info =
            canonicalize(&build_signed_info(reference_id, &digest_b64, &self.config))?;
        let signature_value = spid_crypto::rsa_sign(
            self.private_key_der,
            signed_info.as_bytes(),
            self.config.algorithm.rsa(),
        )
        .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(&signature_value);

        let signature_element = build_signature_element(
            &signed_info,
            &signature_b64,
            self.certificate_der,
            &self.config,
        );

        tracing::debug!(
            reference_id,
            algorithm = self.config.algorithm.uri(),
            "signed XML element"
        );

        Ok(insert_signature(xml, insert_position, &signature_element))
    }
}

/// Canonicalizes an XML fragment without comments.
fn canonicalize(xml: &str) -> SamlResult<String> {
    let mut output = Vec::new();
    Canonicalizer::read_from_str(xml)
        .write_to_writer(&mut output)
        .canonicalize(false)
        .map_err(|e| SamlError::SignatureCreation(format!("XML canonicalization failed: {e}")))?;

    String::from_utf8(output).map_err(|e| {
        SamlError::SignatureCreation(format!("canonical XML is not valid UTF-8: {e}"))
    })
}

/// Finds the element to sign and determines where to insert the signature.
fn find_element_and_insert_position(xml: &str, reference_id: &str) -> SamlResult<(usize, usize)> {
    let id_pattern = format!("ID=\"{reference_id}\"");

    let element_start = xml.find(&id_pattern).ok_or_else(|| {
        SamlError::SignatureCreation(format!("Element with ID '{reference_id}' not found"))
    })?;

    let tag_start = xml[..element_start]
        .rfind('<')
        .ok_or_else(|| SamlError::SignatureCreation("Malformed XML element".to_string()))?;

    let tag_end = xml[element_start..]
        .find('>')
        .map(|pos| element_start + pos + 1)
        .ok_or_else(|| SamlError::SignatureCreation("Malformed XML element".to_string()))?;

    // SAML schema places the signature immediately after Issuer
    let insert_pos = find_issuer_end(xml, tag_end).unwrap_or(tag_end);

    Ok((tag_start, insert_pos))
}

/// Finds the end of the Issuer element after the given position.
fn find_issuer_end(xml: &str, after: usize) -> Option<usize> {
    let search_area = &xml[after..];

    for pattern in &["</saml:Issuer>", "</Issuer>", "</saml2:Issuer>"] {
        if let Some(pos) = search_area.find(pattern) {
            return Some(after + pos + pattern.len());
        }
    }
    None
}

/// Extracts a complete XML element starting at the given position.
fn extract_element(xml: &str, start: usize) -> SamlResult<&str> {
    let name_end = xml[start + 1..]
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .map(|pos| start + 1 + pos)
        .ok_or_else(|| SamlError::SignatureCreation("Malformed XML element".to_string()))?;

    let full_tag_name = &xml[start + 1..name_end];
    let close_pattern = format!("</{full_tag_name}>");

    let close_pos = xml[start..].rfind(&close_pattern).ok_or_else(|| {
        SamlError::SignatureCreation(format!("Unclosed XML element '{full_tag_name}'"))
    })?;

    Ok(&xml[start..start + close_pos + close_pattern.len()])
}

/// Builds the SignedInfo element.
fn build_signed_info(reference_id: &str, digest_b64: &str, config: &SignatureConfig) -> String {
    format!(
        concat!(
            r#"<ds:SignedInfo xmlns:ds="{ns}">"#,
            r#"<ds:CanonicalizationMethod Algorithm="{c14n}"/>"#,
            r#"<ds:SignatureMethod Algorithm="{alg}"/>"#,
            r##"<ds:Reference URI="#{id}">"##,
            r#"<ds:Transforms>"#,
            r#"<ds:Transform Algorithm="{enveloped}"/>"#,
            r#"<ds:Transform Algorithm="{c14n}"/>"#,
            r#"</ds:Transforms>"#,
            r#"<ds:DigestMethod Algorithm="{digest_alg}"/>"#,
            r#"<ds:DigestValue>{digest}</ds:DigestValue>"#,
            r#"</ds:Reference>"#,
            r#"</ds:SignedInfo>"#,
        ),
        ns = XMLDSIG_NS,
        c14n = canonicalization_algorithms::EXCLUSIVE_C14N,
        alg = config.algorithm.uri(),
        id = reference_id,
        enveloped = canonicalization_algorithms::ENVELOPED_SIGNATURE,
        digest_alg = digest_algorithms::SHA256,
        digest = digest_b64,
    )
}

/// Builds the complete Signature element.
fn build_signature_element(
    signed_info: &str,
    signature_value: &str,
    certificate_der: Option<&[u8]>,
    config: &SignatureConfig,
) -> String {
    let mut signature = format!(
        concat!(
            r#"<ds:Signature xmlns:ds="{}">{}"#,
            "<ds:SignatureValue>{}</ds:SignatureValue>",
        ),
        XMLDSIG_NS, signed_info, signature_value,
    );

    if config.include_certificate {
        if let Some(cert) = certificate_der {
            let cert_b64 = base64::engine::general_purpose::STANDARD.encode(cert);
            signature.push_str(&format!(
                concat!(
                    "<ds:KeyInfo><ds:X509Data>",
                    "<ds:X509Certificate>{}</ds:X509Certificate>",
                    "</ds:X509Data></ds:KeyInfo>",
                ),
                cert_b64
            ));
        }
    }

    signature.push_str("</ds:Signature>");
    signature
}

/// Inserts the signature into the XML document.
fn insert_signature(xml: &str, position: usize, signature: &str) -> String {
    format!("{}{}{}", &xml[..position], signature, &xml[position..])
}
