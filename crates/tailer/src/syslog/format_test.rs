//! Tests for syslog formats

use chrono::{DateTime, TimeZone, Utc};

use crate::syslog::format::{keys, trim_trailing_newline, Format, ParseError, PartValue};

fn received() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 12, 21, 8, 0, 0).unwrap()
}

fn text<'a>(parts: &'a crate::syslog::LogParts, key: &str) -> &'a str {
    parts.get(key).and_then(PartValue::as_text).unwrap()
}

#[test]
fn test_full_message() {
    let parts = Format::Rfc3164
        .parse(b"<134>Dec 20 12:34:56 host app: hello", received(), None)
        .unwrap();

    assert_eq!(parts.get(keys::PRIORITY), Some(&PartValue::Integer(134)));
    assert_eq!(parts.get(keys::FACILITY), Some(&PartValue::Integer(16)));
    assert_eq!(parts.get(keys::SEVERITY), Some(&PartValue::Integer(6)));
    assert_eq!(
        parts.get(keys::TIMESTAMP),
        Some(&PartValue::Timestamp(
            Utc.with_ymd_and_hms(2023, 12, 20, 12, 34, 56).unwrap()
        ))
    );
    assert_eq!(text(&parts, keys::HOSTNAME), "host");
    assert_eq!(text(&parts, keys::TAG), "app");
    assert_eq!(text(&parts, keys::CONTENT), "hello");
    assert!(parts.get(keys::CLIENT).is_none());
}

#[test]
fn test_tag_with_pid() {
    let parts = Format::Rfc3164
        .parse(
            b"<13>Feb  5 17:32:18 10.0.0.99 myapp[1234]: Use the BFG!",
            received(),
            None,
        )
        .unwrap();

    assert_eq!(text(&parts, keys::HOSTNAME), "10.0.0.99");
    assert_eq!(text(&parts, keys::TAG), "myapp");
    assert_eq!(text(&parts, keys::CONTENT), "Use the BFG!");
    assert_eq!(
        parts.get(keys::TIMESTAMP),
        Some(&PartValue::Timestamp(
            Utc.with_ymd_and_hms(2023, 2, 5, 17, 32, 18).unwrap()
        ))
    );
}

#[test]
fn test_cisco_style_tag() {
    let parts = Format::Rfc3164
        .parse(
            b"<134>Dec 20 12:34:56 router1 %LINK-3-UPDOWN: Interface GigabitEthernet0/1, changed state to up",
            received(),
            None,
        )
        .unwrap();

    assert_eq!(text(&parts, keys::TAG), "%LINK-3-UPDOWN");
    assert_eq!(
        text(&parts, keys::CONTENT),
        "Interface GigabitEthernet0/1, changed state to up"
    );
}

#[test]
fn test_content_kept_verbatim() {
    let parts = Format::Rfc3164
        .parse(b"<134>Dec 20 12:34:56 host app:   spaced  out  ", received(), None)
        .unwrap();
    // Only the single separator space after the colon is framing
    assert_eq!(text(&parts, keys::CONTENT), "  spaced  out  ");
}

#[test]
fn test_no_tag() {
    let parts = Format::Rfc3164
        .parse(b"<134>Dec 20 12:34:56 host just some words", received(), None)
        .unwrap();

    assert_eq!(text(&parts, keys::TAG), "");
    assert_eq!(text(&parts, keys::CONTENT), "just some words");
}

#[test]
fn test_trailing_newline_stripped() {
    let parts = Format::Rfc3164
        .parse(b"<134>Dec 20 12:34:56 host app: with newline\r\n", received(), None)
        .unwrap();
    assert_eq!(text(&parts, keys::CONTENT), "with newline");
}

#[test]
fn test_missing_timestamp_falls_back() {
    let peer = "192.0.2.7:40000".parse().unwrap();
    let parts = Format::Rfc3164
        .parse(b"<13>no header here", received(), Some(peer))
        .unwrap();

    assert_eq!(parts.get(keys::TIMESTAMP), Some(&PartValue::Timestamp(received())));
    assert_eq!(text(&parts, keys::HOSTNAME), "192.0.2.7");
    assert_eq!(text(&parts, keys::TAG), "");
    assert_eq!(text(&parts, keys::CONTENT), "no header here");
    assert_eq!(text(&parts, keys::CLIENT), "192.0.2.7:40000");
}

#[test]
fn test_december_message_received_in_january() {
    let january = Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap();
    let parts = Format::Rfc3164
        .parse(b"<134>Dec 31 23:59:59 host app: late", january, None)
        .unwrap();

    assert_eq!(
        parts.get(keys::TIMESTAMP),
        Some(&PartValue::Timestamp(
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap()
        ))
    );
}

#[test]
fn test_invalid_priority() {
    let parse = |data: &[u8]| Format::Rfc3164.parse(data, received(), None);

    assert_eq!(parse(b"no priority"), Err(ParseError::InvalidPriority));
    assert_eq!(parse(b"<>Dec 20 12:34:56 host app: x"), Err(ParseError::InvalidPriority));
    assert_eq!(parse(b"<1a>Dec 20 12:34:56 host app: x"), Err(ParseError::InvalidPriority));
    assert_eq!(parse(b"<1234>x"), Err(ParseError::InvalidPriority));
    assert_eq!(parse(b"<134"), Err(ParseError::InvalidPriority));
    assert_eq!(parse(b"<192>x"), Err(ParseError::PriorityOutOfRange(192)));
}

#[test]
fn test_empty_and_invalid_utf8() {
    assert_eq!(
        Format::Rfc3164.parse(b"", received(), None),
        Err(ParseError::Empty)
    );
    assert_eq!(
        Format::Rfc3164.parse(b"\n", received(), None),
        Err(ParseError::Empty)
    );
    assert_eq!(
        Format::Rfc3164.parse(b"<13>\xff\xfe", received(), None),
        Err(ParseError::InvalidUtf8)
    );
}

#[test]
fn test_part_value_helpers() {
    assert_eq!(PartValue::from("x").as_text(), Some("x"));
    assert_eq!(PartValue::from(7i64).as_text(), None);
    assert_eq!(PartValue::from(7i64).type_name(), "an integer");
    assert_eq!(PartValue::from(received()).type_name(), "a timestamp");
}

#[test]
fn test_parse_error_display() {
    let err = ParseError::TooLarge {
        size: 10000,
        limit: 8192,
    };
    assert!(err.to_string().contains("10000"));
    assert!(err.to_string().contains("8192"));
    assert!(ParseError::PriorityOutOfRange(200).to_string().contains("200"));
}

#[test]
fn test_trim_trailing_newline() {
    assert_eq!(trim_trailing_newline(b"hello\n"), b"hello");
    assert_eq!(trim_trailing_newline(b"hello\r\n"), b"hello");
    assert_eq!(trim_trailing_newline(b"hello"), b"hello");
    assert_eq!(trim_trailing_newline(b"\r\n"), b"");
    assert_eq!(trim_trailing_newline(b""), b"");
    assert_eq!(trim_trailing_newline(b"line1\nline2\n"), b"line1\nline2");
}
