//! Correlation between the legs of a handshake.
//!
//! Between sending a request to the IdP and receiving its answer the service
//! provider keeps no server-side state. Instead the client carries a small
//! record naming the IdP and the pending request ID, plus the subject and
//! session index once login has completed.
//!
//! # Wire format
//!
//! ```text
//! base64url(payload) "." base64url(HMAC-SHA256(payload))
//! payload = IdPName=..&PendingRequestId=..&SubjectNameId=..
//!           &AuthnStatementSessionIndex=..&Expires=<unix secs>
//! ```
//!
//! Values are percent-encoded and absent fields are omitted. A carrier that
//! is expired, tampered with or malformed reads as absent.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use spid_crypto::{CryptoError, HmacKey};

use crate::error::{HandshakeError, HandshakeResult};

/// Wire names of the record fields.
pub mod fields {
    /// Short name of the identity provider.
    pub const IDP_NAME: &str = "IdPName";
    /// ID of the most recent request sent to the IdP.
    pub const PENDING_REQUEST_ID: &str = "PendingRequestId";
    /// Subject name identifier from the authentication response.
    pub const SUBJECT_NAME_ID: &str = "SubjectNameId";
    /// Session index from the authentication response.
    pub const SESSION_INDEX: &str = "AuthnStatementSessionIndex";
    /// Expiry as Unix seconds.
    pub const EXPIRES: &str = "Expires";
}

/// Data carried by the client between handshake legs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationRecord {
    /// Short name of the identity provider.
    pub idp_name: Option<String>,
    /// ID of the request awaiting an answer.
    pub pending_request_id: Option<String>,
    /// Subject name identifier, set once login completed.
    pub subject_id: Option<String>,
    /// Session index, set once login completed.
    pub session_index: Option<String>,
}

impl CorrelationRecord {
    /// Record for a freshly sent request.
    #[must_use]
    pub fn pending(idp_name: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            idp_name: Some(idp_name.into()),
            pending_request_id: Some(request_id.into()),
            subject_id: None,
            session_index: None,
        }
    }

    /// Adds the subject and session established by a successful login.
    #[must_use]
    pub fn with_session(
        mut self,
        subject_id: impl Into<String>,
        session_index: impl Into<String>,
    ) -> Self {
        self.subject_id = Some(subject_id.into());
        self.session_index = Some(session_index.into());
        self
    }

    /// Returns the wire names of the fields logout needs but are blank.
    #[must_use]
    pub fn missing_logout_fields(&self) -> Vec<&'static str> {
        [
            (fields::IDP_NAME, &self.idp_name),
            (fields::SUBJECT_NAME_ID, &self.subject_id),
            (fields::SESSION_INDEX, &self.session_index),
        ]
        .into_iter()
        .filter(|(_, value)| is_blank(value.as_deref()))
        .map(|(name, _)| name)
        .collect()
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Change to apply to the client's carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarrierWrite {
    /// Replace the carrier with `value`, valid until `expires_at`.
    Set {
        /// Encoded record.
        value: String,
        /// Expiry embedded in the value.
        expires_at: DateTime<Utc>,
    },
    /// Remove the carrier.
    Clear,
}

/// Carrier slot for a single client request.
///
/// Holds the value the client sent and the change to send back. Only the
/// last write of a request is kept.
#[derive(Debug, Clone, Default)]
pub struct CorrelationCarrier {
    incoming: Option<String>,
    outgoing: Option<CarrierWrite>,
}

impl CorrelationCarrier {
    /// Wraps the value the client presented, if any.
    #[must_use]
    pub fn new(incoming: Option<String>) -> Self {
        Self {
            incoming: incoming.filter(|v| !v.is_empty()),
            outgoing: None,
        }
    }

    /// Returns the value the client presented.
    #[must_use]
    pub fn incoming(&self) -> Option<&str> {
        self.incoming.as_deref()
    }

    /// Returns the pending change, if any.
    #[must_use]
    pub const fn outgoing(&self) -> Option<&CarrierWrite> {
        self.outgoing.as_ref()
    }

    /// Consumes the slot, returning the pending change.
    #[must_use]
    pub fn into_outgoing(self) -> Option<CarrierWrite> {
        self.outgoing
    }
}

/// Encodes, verifies and rotates correlation records.
#[derive(Debug, Clone)]
pub struct CorrelationStore {
    key: HmacKey,
    ttl: Duration,
}

impl CorrelationStore {
    /// Lifetime of a freshly written record.
    pub const DEFAULT_TTL_MINUTES: i64 = 20;

    /// Creates a store tagging records with `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EmptyHmacKey`] if `secret` is empty.
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, CryptoError> {
        Ok(Self {
            key: HmacKey::new(secret)?,
            ttl,
        })
    }

    /// Returns the lifetime of written records.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Encodes a record that expires at `expires_at`.
    #[must_use]
    pub fn encode(&self, record: &CorrelationRecord, expires_at: DateTime<Utc>) -> String {
        let mut pairs = Vec::with_capacity(5);
        for (name, value) in [
            (fields::IDP_NAME, &record.idp_name),
            (fields::PENDING_REQUEST_ID, &record.pending_request_id),
            (fields::SUBJECT_NAME_ID, &record.subject_id),
            (fields::SESSION_INDEX, &record.session_index),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                pairs.push(format!("{name}={}", urlencoding::encode(value)));
            }
        }
        pairs.push(format!("{}={}", fields::EXPIRES, expires_at.timestamp()));

        let payload = pairs.join("&");
        let tag = self.key.sign(payload.as_bytes());
        format!("{}.{}", URL_SAFE_NO_PAD.encode(payload), URL_SAFE_NO_PAD.encode(tag))
    }

    /// Decodes a carrier value as of `now`.
    ///
    /// Returns the record and its expiry, or `None` if the value is expired,
    /// tampered with or malformed.
    #[must_use]
    pub fn decode_at(
        &self,
        value: &str,
        now: DateTime<Utc>,
    ) -> Option<(CorrelationRecord, DateTime<Utc>)> {
        match self.try_decode(value, now) {
            Ok(decoded) => Some(decoded),
            Err(reason) => {
                tracing::debug!(reason, "discarding correlation carrier");
                None
            }
        }
    }

    /// Decodes a carrier value as of now.
    #[must_use]
    pub fn decode(&self, value: &str) -> Option<(CorrelationRecord, DateTime<Utc>)> {
        self.decode_at(value, Utc::now())
    }

    fn try_decode(
        &self,
        value: &str,
        now: DateTime<Utc>,
    ) -> Result<(CorrelationRecord, DateTime<Utc>), &'static str> {
        let (payload_b64, tag_b64) = value.split_once('.').ok_or("missing tag")?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| "payload is not base64url")?;
        let tag = URL_SAFE_NO_PAD.decode(tag_b64).map_err(|_| "tag is not base64url")?;
        if !self.key.verify(&payload, &tag) {
            return Err("tag mismatch");
        }
        let payload = String::from_utf8(payload).map_err(|_| "payload is not UTF-8")?;

        let mut record = CorrelationRecord::default();
        let mut expires_at = None;
        for pair in payload.split('&').filter(|p| !p.is_empty()) {
            let (name, raw) = pair.split_once('=').ok_or("field without value")?;
            let decoded =
                urlencoding::decode(raw).map_err(|_| "field is not percent-encoded UTF-8")?;
            let value = (!decoded.is_empty()).then(|| decoded.into_owned());
            match name {
                fields::IDP_NAME => record.idp_name = value,
                fields::PENDING_REQUEST_ID => record.pending_request_id = value,
                fields::SUBJECT_NAME_ID => record.subject_id = value,
                fields::SESSION_INDEX => record.session_index = value,
                fields::EXPIRES => {
                    expires_at = value
                        .and_then(|v| v.parse::<i64>().ok())
                        .and_then(|secs| DateTime::from_timestamp(secs, 0));
                }
                _ => {}
            }
        }

        let expires_at = expires_at.ok_or("missing expiry")?;
        if expires_at <= now {
            return Err("expired");
        }
        Ok((record, expires_at))
    }

    /// Reads the record the client presented.
    #[must_use]
    pub fn read(&self, carrier: &CorrelationCarrier) -> Option<CorrelationRecord> {
        carrier
            .incoming()
            .and_then(|value| self.decode(value))
            .map(|(record, _)| record)
    }

    /// Queues `record` with a fresh lifetime, replacing any earlier write.
    pub fn write(&self, carrier: &mut CorrelationCarrier, record: &CorrelationRecord) {
        let expires_at = Utc::now() + self.ttl;
        carrier.outgoing = Some(CarrierWrite::Set {
            value: self.encode(record, expires_at),
            expires_at,
        });
    }

    /// Queues removal of the client's carrier.
    pub fn destroy(&self, carrier: &mut CorrelationCarrier) {
        carrier.outgoing = Some(CarrierWrite::Clear);
    }

    /// Records the subject and session established by a login response.
    ///
    /// The record keeps its original expiry.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::MissingSession`] if the carrier is absent
    /// or unreadable.
    pub fn attach_session(
        &self,
        carrier: &mut CorrelationCarrier,
        subject_id: &str,
        session_index: &str,
    ) -> HandshakeResult<CorrelationRecord> {
        let (record, expires_at) = carrier
            .incoming()
            .and_then(|value| self.decode(value))
            .ok_or(HandshakeError::MissingSession)?;

        let record = record.with_session(subject_id, session_index);
        carrier.outgoing = Some(CarrierWrite::Set {
            value: self.encode(&record, expires_at),
            expires_at,
        });
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CorrelationStore {
        CorrelationStore::new(b"correlation-secret", Duration::minutes(20)).unwrap()
    }

    fn complete() -> CorrelationRecord {
        CorrelationRecord::pending("TestIdP", "_req-1").with_session("SPID-0001", "_sess&=.1")
    }

    fn set_value(carrier: &CorrelationCarrier) -> String {
        match carrier.outgoing() {
            Some(CarrierWrite::Set { value, .. }) => value.clone(),
            other => panic!("expected a Set write, got {other:?}"),
        }
    }

    #[test]
    fn record_roundtrip_with_reserved_characters() {
        let store = store();
        let expires = Utc::now() + Duration::minutes(5);
        let value = store.encode(&complete(), expires);

        let (record, decoded_expiry) = store.decode(&value).unwrap();
        assert_eq!(record, complete());
        assert_eq!(decoded_expiry.timestamp(), expires.timestamp());
    }

    #[test]
    fn empty_fields_read_as_unset() {
        let store = store();
        let mut record = CorrelationRecord::pending("TestIdP", "_req-1");
        record.subject_id = Some(String::new());
        let value = store.encode(&record, Utc::now() + Duration::minutes(1));

        let (decoded, _) = store.decode(&value).unwrap();
        assert_eq!(decoded.subject_id, None);
        assert_eq!(decoded.idp_name.as_deref(), Some("TestIdP"));
    }

    #[test]
    fn expired_carrier_reads_as_absent() {
        let store = store();
        let issued = Utc::now();
        let value = store.encode(&complete(), issued + Duration::minutes(20));

        assert!(store.decode_at(&value, issued + Duration::minutes(19)).is_some());
        assert!(store.decode_at(&value, issued + Duration::minutes(20)).is_none());
        assert!(store.decode_at(&value, issued + Duration::minutes(21)).is_none());
    }

    #[test]
    fn tampered_carrier_reads_as_absent() {
        let store = store();
        let value = store.encode(&complete(), Utc::now() + Duration::minutes(5));
        let (payload, tag) = value.split_once('.').unwrap();

        let forged_payload = URL_SAFE_NO_PAD.encode(
            concat!(
                "IdPName=OtherIdP&SubjectNameId=SPID-0001",
                "&AuthnStatementSessionIndex=s&Expires=99999999999"
            ),
        );
        assert!(store.decode(&format!("{forged_payload}.{tag}")).is_none());

        let mut flipped = tag.to_string().into_bytes();
        flipped[0] = if flipped[0] == b'A' { b'B' } else { b'A' };
        let flipped = String::from_utf8(flipped).unwrap();
        assert!(store.decode(&format!("{payload}.{flipped}")).is_none());
    }

    #[test]
    fn carrier_from_another_key_reads_as_absent() {
        let other = CorrelationStore::new(b"another-secret", Duration::minutes(20)).unwrap();
        let value = other.encode(&complete(), Utc::now() + Duration::minutes(5));
        assert!(store().decode(&value).is_none());
    }

    #[test]
    fn malformed_carriers_read_as_absent() {
        let store = store();
        for value in ["", "no-dot", "!!!.???", "abc.def", "."] {
            assert!(store.decode(value).is_none(), "{value:?} should not decode");
        }
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(
            CorrelationStore::new(b"", Duration::minutes(20)),
            Err(CryptoError::EmptyHmacKey)
        ));
    }

    #[test]
    fn missing_logout_fields() {
        assert!(complete().missing_logout_fields().is_empty());
        assert_eq!(
            CorrelationRecord::pending("TestIdP", "_r").missing_logout_fields(),
            vec![fields::SUBJECT_NAME_ID, fields::SESSION_INDEX]
        );

        let mut blank = complete();
        blank.idp_name = Some("   ".to_string());
        assert_eq!(blank.missing_logout_fields(), vec![fields::IDP_NAME]);
    }

    #[test]
    fn write_then_read_through_carrier() {
        let store = store();
        let mut first = CorrelationCarrier::new(None);
        assert!(store.read(&first).is_none());

        store.write(&mut first, &complete());
        let second = CorrelationCarrier::new(Some(set_value(&first)));
        assert_eq!(store.read(&second), Some(complete()));
    }

    #[test]
    fn last_write_wins() {
        let store = store();
        let mut carrier = CorrelationCarrier::new(None);
        store.destroy(&mut carrier);
        store.write(&mut carrier, &complete());
        assert!(matches!(carrier.outgoing(), Some(CarrierWrite::Set { .. })));

        store.destroy(&mut carrier);
        assert_eq!(carrier.into_outgoing(), Some(CarrierWrite::Clear));
    }

    #[test]
    fn attach_session_keeps_expiry() {
        let store = store();
        let expires = Utc::now() + Duration::minutes(3);
        let pending = store.encode(&CorrelationRecord::pending("TestIdP", "_req-1"), expires);

        let mut carrier = CorrelationCarrier::new(Some(pending));
        let record = store.attach_session(&mut carrier, "SPID-0001", "_sess-1").unwrap();
        assert!(record.missing_logout_fields().is_empty());

        match carrier.outgoing() {
            Some(CarrierWrite::Set { value, expires_at }) => {
                assert_eq!(expires_at.timestamp(), expires.timestamp());
                let (decoded, _) = store.decode(value).unwrap();
                assert_eq!(decoded.pending_request_id.as_deref(), Some("_req-1"));
                assert_eq!(decoded.session_index.as_deref(), Some("_sess-1"));
            }
            other => panic!("expected a Set write, got {other:?}"),
        }
    }

    #[test]
    fn attach_session_without_carrier_is_missing_session() {
        let mut carrier = CorrelationCarrier::new(None);
        assert!(matches!(
            store().attach_session(&mut carrier, "s", "i"),
            Err(HandshakeError::MissingSession)
        ));
        assert!(carrier.outgoing().is_none());
    }

    #[test]
    fn empty_incoming_value_is_absent() {
        assert!(CorrelationCarrier::new(Some(String::new())).incoming().is_none());
    }
}
