//! `If-Modified-Since` decoding (spec §4.E). The fixed RFC 1123 format and
//! its `chrono` parsing are carried straight over from
//! `pkg/http/src/headers/date.rs`'s `TIME_FORMAT`; this core only needs the
//! single canonical format (obsolete RFC 850 / asctime fallbacks are a
//! teacher feature this spec doesn't ask for).

use chrono::{NaiveDateTime, Utc};

const TIME_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Parses an `If-Modified-Since` value into unix seconds (UTC). Any
/// mismatch -- wrong format, trailing bytes, non-UTF8 -- is treated as "no
/// such header" (`None`) rather than a parse error, per spec §4.E ("extra
/// trailing bytes -> ignore header").
pub fn parse_if_modified_since(value: &[u8]) -> Option<i64> {
    let s = std::str::from_utf8(value).ok()?;
    let naive = NaiveDateTime::parse_from_str(s, TIME_FORMAT).ok()?;
    Some(naive.and_local_timezone(Utc).single()?.timestamp())
}
