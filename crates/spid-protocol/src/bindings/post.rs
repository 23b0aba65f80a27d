//! HTTP-POST Binding implementation.

use base64::Engine;
use quick_xml::escape::escape;

use super::{RELAY_STATE_PARAM, SAML_REQUEST_PARAM};

/// HTTP-POST binding encoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Base64-encodes a signed XML message for the `SAMLRequest` parameter.
    #[must_use]
    pub fn encode_message(xml: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(xml)
    }

    /// Renders an HTML form that auto-submits an encoded request.
    ///
    /// # Arguments
    ///
    /// * `encoded_request` - The base64 `SAMLRequest` value
    /// * `destination` - The IdP endpoint the form posts to
    /// * `relay_state` - Optional opaque state echoed back by the IdP
    #[must_use]
    pub fn request_form(
        encoded_request: &str,
        destination: &str,
        relay_state: Option<&str>,
    ) -> String {
        let relay_state_input = relay_state
            .map(|rs| {
                format!(
                    r#"<input type="hidden" name="{RELAY_STATE_PARAM}" value="{}"/>"#,
                    escape(rs)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SPID</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="{SAML_REQUEST_PARAM}" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
            escape(destination),
            escape(encoded_request),
            relay_state_input
        )
    }
}
