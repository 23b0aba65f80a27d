//! XML rendering helpers shared by the request types.

use std::borrow::Cow;

use chrono::{DateTime, SecondsFormat, Utc};

/// Escapes a value for use in XML text or a double-quoted attribute.
pub(crate) fn escape(value: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(value)
}

/// Formats an instant as `xs:dateTime` in UTC without fractional seconds.
///
/// SPID IdPs reject `IssueInstant` values carrying milliseconds.
pub(crate) fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}
