//! SPID handshake endpoint integration tests.

use chrono::Utc;

use crate::common::{cookie_value, saml_request, set_cookie, TestEnv};

/// Tests the full login, response and logout cycle over HTTP.
#[tokio::test]
async fn test_login_then_logout() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.get("/spid/login?idp=TestIdP", None).await?;
    assert_eq!(response.status().as_u16(), 200);
    let cookie = set_cookie(&response).expect("login sets the correlation cookie");
    let html = response.text().await?;

    let authn = saml_request(&html);
    assert!(authn.starts_with("<samlp:AuthnRequest"));
    assert!(authn.contains(r#"AssertionConsumerServiceURL="https://sp.example.it/spid/acs""#));
    assert!(authn.contains(r#"ForceAuthn="true""#));

    // Stand in for the assertion consumer recording the IdP's answer.
    let (record, expires_at) = env.store.decode(&cookie_value(&cookie)).expect("valid carrier");
    let request_id = record.pending_request_id.clone().expect("pending request id");
    assert!(authn.contains(&format!(r#"ID="{request_id}""#)));
    let logged_in = env
        .store
        .encode(&record.with_session("SPID-0001", "_sess-1"), expires_at);

    let response = env.get("/spid/logout", Some(&logged_in)).await?;
    assert_eq!(response.status().as_u16(), 200);
    let rotated = set_cookie(&response).expect("logout rotates the correlation cookie");
    let html = response.text().await?;

    let logout = saml_request(&html);
    assert!(logout.starts_with("<samlp:LogoutRequest"));
    assert!(logout.contains("<samlp:SessionIndex>_sess-1</samlp:SessionIndex>"));
    assert!(html.contains(r#"action="https://idp.test.it/slo""#));

    let (record, _) = env.store.decode(&cookie_value(&rotated)).expect("valid carrier");
    assert_ne!(record.pending_request_id, Some(request_id));
    assert_eq!(record.subject_id, None);

    Ok(())
}

/// Tests that an expired carrier is treated as a missing session.
#[tokio::test]
async fn test_logout_with_expired_cookie() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let record = spid_handshake::CorrelationRecord::pending("TestIdP", "_r").with_session("S", "I");
    let expired = env.store.encode(&record, Utc::now() - chrono::Duration::seconds(5));

    let response = env.get("/spid/logout", Some(&expired)).await?;
    assert_eq!(response.status().as_u16(), 401);
    let cleared = set_cookie(&response).expect("unusable carrier is cleared");
    assert!(cleared.contains("Max-Age=0"));

    Ok(())
}

/// Tests that a forged carrier is rejected.
#[tokio::test]
async fn test_logout_with_forged_cookie() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.get("/spid/logout", Some("SWRQTmFtZT1UZXN0SWRQ.AAAA")).await?;
    assert_eq!(response.status().as_u16(), 401);

    Ok(())
}

/// Tests that the request digest and signature verify over canonical XML.
#[tokio::test]
async fn test_login_request_is_signed() -> anyhow::Result<()> {
    use base64::Engine;

    let engine = base64::engine::general_purpose::STANDARD;
    let env = TestEnv::new().await?;
    let html = env.get("/spid/login?idp=TestIdP", None).await?.text().await?;
    let xml = saml_request(&html);

    let between = |open: &str, close: &str| -> String {
        let start = xml.find(open).expect("open tag") + open.len();
        let end = start + xml[start..].find(close).expect("close tag");
        xml[start..end].to_string()
    };
    let c14n = |fragment: &str| -> anyhow::Result<Vec<u8>> {
        let mut output = Vec::new();
        xml_canonicalization::Canonicalizer::read_from_str(fragment)
            .write_to_writer(&mut output)
            .canonicalize(false)?;
        Ok(output)
    };

    let start = xml.find("<ds:Signature ").expect("signature");
    let end = xml.find("</ds:Signature>").expect("signature end") + "</ds:Signature>".len();
    let unsigned = format!("{}{}", &xml[..start], &xml[end..]);
    let digest = engine.encode(spid_crypto::sha256(&c14n(&unsigned)?));
    assert_eq!(between("<ds:DigestValue>", "</ds:DigestValue>"), digest);

    let signed_info = format!(
        "<ds:SignedInfo{}</ds:SignedInfo>",
        between("<ds:SignedInfo", "</ds:SignedInfo>")
    );
    let signature = engine.decode(between("<ds:SignatureValue>", "</ds:SignatureValue>"))?;
    assert!(spid_crypto::rsa_verify(
        &env.public_key_der,
        &c14n(&signed_info)?,
        &signature,
        spid_crypto::RsaAlgorithm::Rs256,
    )?);

    Ok(())
}

/// Tests that an unknown provider renders the error page.
#[tokio::test]
async fn test_login_unknown_provider() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env.get("/spid/login?idp=NoSuchIdP", None).await?;
    assert_eq!(response.status().as_u16(), 400);
    assert!(set_cookie(&response).is_none());
    assert!(response.text().await?.contains("not available"));

    Ok(())
}
