//! Header-block parsing (spec §4.D).
//!
//! The spec frames this as a 4-byte packed-integer prefix switch re-dispatching
//! on `Accept-`/`Content-` branches; per the Design Note in spec §9 ("a
//! table-driven matcher... is equally acceptable provided the exact set...
//! is recognized") this is implemented as a direct byte-prefix match against
//! the known header name table instead — same recognized set, same
//! case-sensitive/skip-on-malformed semantics, fewer branches to maintain.
//! Unknown headers are skipped exactly the way `pkg/http`'s own
//! `header_parser.rs` treats anything it doesn't special-case: scan to the
//! next line and move on.

use crate::errors::*;
use crate::span::Span;

/// One entry per header this core understands. `b'\0'` is not a valid
/// `Connection` value and doubles as "no Connection header seen".
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderSpans {
    pub accept_encoding: Option<Span>,
    pub if_modified_since: Option<Span>,
    pub range: Option<Span>,
    pub cookie: Option<Span>,
    pub content_length: Option<Span>,
    pub content_type: Option<Span>,
    pub authorization: Option<Span>,
    /// Lowercased first byte of the `Connection` header's value, or 0.
    pub connection: u8,
}

pub struct HeaderParse {
    pub headers: HeaderSpans,
    /// Index, relative to the slice passed in, of the first byte after the
    /// blank line terminating the header block.
    pub end: usize,
}

enum Field {
    AcceptEncoding,
    IfModifiedSince,
    Range,
    Cookie,
    ContentLength,
    ContentType,
    Authorization,
    Connection,
}

const KNOWN_HEADERS: &[(&[u8], Field)] = &[
    (b"Accept-Encoding", Field::AcceptEncoding),
    (b"If-Modified-Since", Field::IfModifiedSince),
    (b"Range", Field::Range),
    (b"Cookie", Field::Cookie),
    (b"Content-Length", Field::ContentLength),
    (b"Content-Type", Field::ContentType),
    (b"Authorization", Field::Authorization),
    (b"Connection", Field::Connection),
];

/// Parses the header block starting at `data[0]` (i.e. immediately after the
/// request line's CRLF). Stops at the first blank line; any bytes after
/// `end` belong to the body or a pipelined request, not to this call.
pub fn parse_headers(data: &[u8]) -> Result<HeaderParse> {
    let mut headers = HeaderSpans::default();
    let mut pos = 0usize;

    loop {
        if data.len() < pos + 2 {
            return Err(err_msg("Header block truncated before terminator"));
        }

        if &data[pos..pos + 2] == b"\r\n" {
            return Ok(HeaderParse {
                headers,
                end: pos + 2,
            });
        }

        let line_rest = &data[pos..];
        let matched = KNOWN_HEADERS
            .iter()
            .find(|(name, _)| line_rest.len() >= name.len() && &line_rest[..name.len()] == *name);

        match matched {
            Some((name, field)) => {
                let after_name = pos + name.len();
                if data.len() < after_name + 2 || &data[after_name..after_name + 2] != b": " {
                    // Known name but not immediately followed by ": " -- treat
                    // as an unrecognized line per spec §4.D.
                    pos = skip_to_next_line(data, pos)?;
                    continue;
                }

                let value_start = after_name + 2;
                let cr = find_cr(data, value_start)?;
                if data.get(cr + 1) != Some(&b'\n') {
                    return Err(err_msg("Header value CR not followed by LF"));
                }

                let value = Span::new(value_start, cr - value_start);
                store(&mut headers, field, value, data);

                pos = cr + 2;
            }
            None => {
                pos = skip_to_next_line(data, pos)?;
            }
        }
    }
}

fn store(headers: &mut HeaderSpans, field: &Field, value: Span, data: &[u8]) {
    match field {
        Field::AcceptEncoding => headers.accept_encoding = Some(value),
        Field::IfModifiedSince => headers.if_modified_since = Some(value),
        Field::Range => headers.range = Some(value),
        Field::Cookie => headers.cookie = Some(value),
        Field::ContentLength => headers.content_length = Some(value),
        Field::ContentType => headers.content_type = Some(value),
        Field::Authorization => headers.authorization = Some(value),
        Field::Connection => {
            headers.connection = value.get(data).first().map(|b| b.to_ascii_lowercase()).unwrap_or(0);
        }
    }
}

fn find_cr(data: &[u8], from: usize) -> Result<usize> {
    data[from..]
        .iter()
        .position(|&b| b == b'\r')
        .map(|rel| from + rel)
        .ok_or_else(|| err_msg("Header line missing CR"))
}

fn skip_to_next_line(data: &[u8], from: usize) -> Result<usize> {
    let lf = data[from..]
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| err_msg("Malformed header line missing LF"))?;
    Ok(from + lf + 1)
}

/// Like [`parse_headers`] but against `buf[start..]`, with every span
/// re-based to an absolute offset into `buf`, and `end` likewise absolute.
pub fn parse_headers_at(buf: &[u8], start: usize) -> Result<(HeaderSpans, usize)> {
    let parsed = parse_headers(&buf[start..])?;
    let mut headers = parsed.headers;
    headers.accept_encoding = headers.accept_encoding.map(|s| s.shift(start));
    headers.if_modified_since = headers.if_modified_since.map(|s| s.shift(start));
    headers.range = headers.range.map(|s| s.shift(start));
    headers.cookie = headers.cookie.map(|s| s.shift(start));
    headers.content_length = headers.content_length.map(|s| s.shift(start));
    headers.content_type = headers.content_type.map(|s| s.shift(start));
    headers.authorization = headers.authorization.map(|s| s.shift(start));
    Ok((headers, start + parsed.end))
}
