//! Syslog wire formats
//!
//! Decodes one datagram into [`LogParts`], a field map keyed by the names in
//! [`keys`]. Only the BSD format (RFC 3164) is supported.
//!
//! # RFC 3164 layout
//!
//! ```text
//! <PRI>Mmm dd hh:mm:ss HOSTNAME TAG[PID]: CONTENT
//! ```
//!
//! When the timestamp cannot be read the message is treated as coming from
//! a non-conforming sender (RFC 3164 section 4.3.2): the receipt time and peer
//! address stand in for timestamp and hostname, and everything after the
//! priority becomes content.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Decoded fields of one syslog record
pub type LogParts = BTreeMap<String, PartValue>;

/// Field names produced by the decoder
pub mod keys {
    pub const PRIORITY: &str = "priority";
    pub const FACILITY: &str = "facility";
    pub const SEVERITY: &str = "severity";
    pub const TIMESTAMP: &str = "timestamp";
    pub const HOSTNAME: &str = "hostname";
    pub const TAG: &str = "tag";
    pub const CONTENT: &str = "content";
    pub const CLIENT: &str = "client";
}

/// Largest valid PRI value (facility 23, severity 7)
const MAX_PRIORITY: u16 = 191;

/// Longest tag RFC 3164 allows
const MAX_TAG_LEN: usize = 32;

/// "Mmm dd hh:mm:ss"
const TIMESTAMP_LEN: usize = 15;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A single decoded field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    Integer(i64),
    Timestamp(DateTime<Utc>),
}

impl PartValue {
    /// Borrow as text, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Integer(_) => "an integer",
            Self::Timestamp(_) => "a timestamp",
        }
    }
}

impl From<&str> for PartValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for PartValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for PartValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<DateTime<Utc>> for PartValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

/// Decode-level failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Datagram was empty after framing was removed
    #[error("empty message")]
    Empty,

    /// Datagram bytes are not UTF-8
    #[error("message is not valid UTF-8")]
    InvalidUtf8,

    /// Missing or malformed `<PRI>` header
    #[error("invalid priority header")]
    InvalidPriority,

    /// PRI value above 191
    #[error("priority {0} out of range")]
    PriorityOutOfRange(u16),

    /// Datagram exceeded the configured limit
    #[error("message size {size} exceeds limit {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// Supported wire formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// BSD syslog
    #[default]
    Rfc3164,
}

impl Format {
    /// Decode one datagram
    ///
    /// `received_at` supplies the year (RFC 3164 timestamps carry none) and
    /// the fallback timestamp. `peer`, when known, is recorded as the client.
    pub fn parse(
        &self,
        data: &[u8],
        received_at: DateTime<Utc>,
        peer: Option<SocketAddr>,
    ) -> Result<LogParts, ParseError> {
        match self {
            Self::Rfc3164 => parse_rfc3164(data, received_at, peer),
        }
    }
}

fn parse_rfc3164(
    data: &[u8],
    received_at: DateTime<Utc>,
    peer: Option<SocketAddr>,
) -> Result<LogParts, ParseError> {
    let data = trim_trailing_newline(data);
    if data.is_empty() {
        return Err(ParseError::Empty);
    }
    let text = std::str::from_utf8(data).map_err(|_| ParseError::InvalidUtf8)?;
    let (priority, rest) = parse_priority(text)?;

    let mut parts = LogParts::new();
    parts.insert(keys::PRIORITY.into(), i64::from(priority).into());
    parts.insert(keys::FACILITY.into(), i64::from(priority / 8).into());
    parts.insert(keys::SEVERITY.into(), i64::from(priority % 8).into());
    if let Some(peer) = peer {
        parts.insert(keys::CLIENT.into(), peer.to_string().into());
    }

    match parse_timestamp(rest, received_at) {
        Some((timestamp, rest)) => {
            let (hostname, rest) = rest.split_once(' ').unwrap_or((rest, ""));
            let (tag, content) = parse_tag(rest);
            parts.insert(keys::TIMESTAMP.into(), timestamp.into());
            parts.insert(keys::HOSTNAME.into(), hostname.into());
            parts.insert(keys::TAG.into(), tag.into());
            parts.insert(keys::CONTENT.into(), content.into());
        }
        None => {
            let hostname = peer.map(|p| p.ip().to_string()).unwrap_or_default();
            parts.insert(keys::TIMESTAMP.into(), received_at.into());
            parts.insert(keys::HOSTNAME.into(), hostname.into());
            parts.insert(keys::TAG.into(), "".into());
            parts.insert(keys::CONTENT.into(), rest.into());
        }
    }

    Ok(parts)
}

/// Parse `<N>` and return the value plus the remainder
fn parse_priority(text: &str) -> Result<(u8, &str), ParseError> {
    let rest = text.strip_prefix('<').ok_or(ParseError::InvalidPriority)?;
    let end = rest.find('>').ok_or(ParseError::InvalidPriority)?;
    let digits = &rest[..end];

    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidPriority);
    }
    let value: u16 = digits.parse().map_err(|_| ParseError::InvalidPriority)?;
    if value > MAX_PRIORITY {
        return Err(ParseError::PriorityOutOfRange(value));
    }

    Ok((value as u8, &rest[end + 1..]))
}

/// Parse "Mmm dd hh:mm:ss " in the year of receipt
///
/// A stamp more than a day ahead of receipt belongs to the previous year
/// (December messages read in January).
fn parse_timestamp(rest: &str, received_at: DateTime<Utc>) -> Option<(DateTime<Utc>, &str)> {
    let stamp = rest.get(..TIMESTAMP_LEN)?;
    let after = &rest[TIMESTAMP_LEN..];
    let after = match after.strip_prefix(' ') {
        Some(after) => after,
        None if after.is_empty() => after,
        None => return None,
    };

    let bytes = stamp.as_bytes();
    if bytes[3] != b' ' || bytes[6] != b' ' {
        return None;
    }
    let month = MONTHS.iter().position(|m| *m == &stamp[..3])? as u32 + 1;
    let day: u32 = stamp[4..6].trim_start().parse().ok()?;
    let time = NaiveTime::parse_from_str(&stamp[7..], "%H:%M:%S").ok()?;

    let at_year = |year: i32| {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(|date| Utc.from_utc_datetime(&date.and_time(time)))
    };
    let year = received_at.year();
    let mut timestamp = at_year(year)?;
    if timestamp > received_at + Duration::days(1) {
        timestamp = at_year(year - 1)?;
    }

    Some((timestamp, after))
}

/// Split "TAG[PID]: CONTENT" into tag and content
///
/// Without a well-formed tag the whole input is content.
fn parse_tag(rest: &str) -> (&str, &str) {
    let Some(end) = rest.find(|c: char| c == '[' || c == ':' || c == ' ') else {
        return ("", rest);
    };
    if end == 0 || end > MAX_TAG_LEN {
        return ("", rest);
    }

    let tag = &rest[..end];
    let after = match rest.as_bytes()[end] {
        b':' => &rest[end + 1..],
        b'[' => match rest[end..].find("]:") {
            Some(close) => &rest[end + close + 2..],
            None => return ("", rest),
        },
        _ => return ("", rest),
    };

    (tag, after.strip_prefix(' ').unwrap_or(after))
}

/// Trim trailing newline from message (LF or CRLF)
#[inline]
pub fn trim_trailing_newline(data: &[u8]) -> &[u8] {
    let mut end = data.len();

    if end > 0 && data[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && data[end - 1] == b'\r' {
            end -= 1;
        }
    }

    &data[..end]
}

#[cfg(test)]
#[path = "format_test.rs"]
mod format_test;
