use chrono::{DateTime, Utc};

/// Checks whether all bytes in the given slice are lowercase alphanumeric ASCII characters.
///
/// This function returns `true` if every byte in the input slice is either an ASCII
/// digit (`'0'..='9'`) or a lowercase ASCII letter (`'a'..='z'`). It returns `false`
/// if any byte falls outside of these ranges, including uppercase letters, symbols,
/// or non-ASCII characters.
pub(super) fn is_lowercase_alpha_numeric(src: &[u8]) -> bool {
    src.iter()
        .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}

/// Parses an RFC 3339 timestamp as reported by the runtime.
///
/// The runtime reports timestamps that were never set as the zero time
/// (`0001-01-01T00:00:00Z`). Those, anything before the UNIX epoch, and
/// unparseable input yield `None`.
pub(crate) fn parse_timestamp(src: &str) -> Option<DateTime<Utc>> {
    let ts = DateTime::parse_from_rfc3339(src).ok()?.with_timezone(&Utc);
    (ts > DateTime::<Utc>::UNIX_EPOCH).then_some(ts)
}
