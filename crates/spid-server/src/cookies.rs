//! Correlation cookie handling.
//!
//! The IdP answers with a cross-site POST, so over HTTPS the cookie is sent
//! with `SameSite=None; Secure`. Plain HTTP deployments (local test IdPs)
//! fall back to `SameSite=Lax`.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};
use spid_handshake::{CarrierWrite, CorrelationCarrier};

/// Builds the carrier slot from the request's `Cookie` headers.
pub fn carrier_from_headers(headers: &HeaderMap, name: &str) -> CorrelationCarrier {
    CorrelationCarrier::new(find_cookie(headers, name))
}

fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .find_map(|part| part.trim().strip_prefix(&prefix).map(str::to_string))
}

/// Renders the `Set-Cookie` value for a carrier write.
#[must_use]
pub fn set_cookie_value(
    name: &str,
    write: &CarrierWrite,
    secure: bool,
    now: DateTime<Utc>,
) -> String {
    let attributes = if secure {
        "Path=/; HttpOnly; Secure; SameSite=None"
    } else {
        "Path=/; HttpOnly; SameSite=Lax"
    };
    match write {
        CarrierWrite::Set { value, expires_at } => {
            let max_age = (*expires_at - now).num_seconds().max(0);
            format!(
                "{name}={value}; {attributes}; Max-Age={max_age}; Expires={}",
                expires_at.format("%a, %d %b %Y %H:%M:%S GMT")
            )
        }
        CarrierWrite::Clear => {
            format!("{name}=; {attributes}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT")
        }
    }
}

/// Appends the carrier's pending write, if any, to response headers.
pub fn apply_carrier(
    headers: &mut HeaderMap,
    name: &str,
    carrier: CorrelationCarrier,
    secure: bool,
) {
    let Some(write) = carrier.into_outgoing() else {
        return;
    };
    match HeaderValue::from_str(&set_cookie_value(name, &write, secure, Utc::now())) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, cookie = name, "invalid Set-Cookie header"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn finds_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; SPID_COOKIE=abc.def"));
        headers.append(COOKIE, HeaderValue::from_static("other=1"));

        let carrier = carrier_from_headers(&headers, "SPID_COOKIE");
        assert_eq!(carrier.incoming(), Some("abc.def"));
        assert!(carrier_from_headers(&headers, "SPID").incoming().is_none());
    }

    #[test]
    fn empty_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("SPID_COOKIE="));
        assert!(carrier_from_headers(&headers, "SPID_COOKIE").incoming().is_none());
    }

    #[test]
    fn set_value_carries_expiry() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
        let write = CarrierWrite::Set {
            value: "abc.def".to_string(),
            expires_at: now + Duration::minutes(20),
        };
        let cookie = set_cookie_value("SPID_COOKIE", &write, true, now);
        assert_eq!(
            cookie,
            concat!(
                "SPID_COOKIE=abc.def; Path=/; HttpOnly; Secure; SameSite=None; ",
                "Max-Age=1200; Expires=Mon, 19 Oct 2026 09:20:00 GMT"
            )
        );
    }

    #[test]
    fn clear_value_expires_immediately() {
        let cookie = set_cookie_value("SPID_COOKIE", &CarrierWrite::Clear, false, Utc::now());
        assert!(cookie.starts_with("SPID_COOKIE=; "));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn nothing_is_applied_without_a_write() {
        let mut headers = HeaderMap::new();
        apply_carrier(&mut headers, "SPID_COOKIE", CorrelationCarrier::new(None), true);
        assert!(headers.get(SET_COOKIE).is_none());
    }
}
