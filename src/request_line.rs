//! Request-line parsing (spec §4.C): method, path, version, with fragment and
//! query stripped off the path before anything else runs.
//!
//! The method dispatch uses the packed-integer prefix switch the spec calls
//! for in §4.D/§9 ("4-byte packed-integer dispatch... is an implementation
//! tactic") rather than the teacher's parser-combinator `parser!`/`seq!`
//! macros (`pkg/http/src/message_syntax.rs`) — those two approaches are
//! behaviorally interchangeable per that Design Note, and the packed switch
//! is what the spec's own worked algorithm describes, so it's what's built
//! here; the surrounding `Result`/`err_msg` plumbing still follows
//! `common::errors`.

use crate::errors::*;
use crate::method::{Method, Version};
use crate::span::Span;

const TAG_GET: u32 = u32::from_ne_bytes(*b"GET ");
const TAG_HEAD: u32 = u32::from_ne_bytes(*b"HEAD");
const TAG_POST: u32 = u32::from_ne_bytes(*b"POST");

/// `len("/ HTTP/1.0")`, the shortest legal remainder after the method.
const MIN_TAIL_LEN: usize = 10;

/// A request line that failed to parse, distinguishing a line this core
/// doesn't recognize as HTTP at all (spec §7 "protocol errors", -> `400`)
/// from one with otherwise-valid framing naming a method other than
/// `GET`/`HEAD`/`POST` (spec §6 "other methods -> 405 Method Not Allowed").
#[derive(Debug)]
pub enum RequestLineError {
    Malformed(Error),
    UnsupportedMethod,
}

impl From<Error> for RequestLineError {
    fn from(e: Error) -> Self {
        RequestLineError::Malformed(e)
    }
}

pub type LineResult<T> = std::result::Result<T, RequestLineError>;

/// Longest method token worth scanning for before giving up and calling the
/// line malformed rather than merely naming an unsupported method.
const MAX_METHOD_TOKEN_LEN: usize = 8;

/// Looks for an all-uppercase-ASCII method token followed by a space within
/// `MAX_METHOD_TOKEN_LEN` bytes. If one is found, the line is framed well
/// enough that its method is simply one this core doesn't support; anything
/// else (no token, lowercase, non-letters) means the line isn't shaped like
/// a request line to begin with.
fn classify_unrecognized_method(data: &[u8]) -> RequestLineError {
    let scan_len = data.len().min(MAX_METHOD_TOKEN_LEN);
    match data[..scan_len].iter().position(|&b| b == b' ') {
        Some(len) if len > 0 && data[..len].iter().all(u8::is_ascii_uppercase) => {
            RequestLineError::UnsupportedMethod
        }
        _ => RequestLineError::Malformed(err_msg("Unsupported or malformed HTTP method")),
    }
}

pub struct RequestLine {
    pub method: Method,
    pub version: Version,
    /// The path with fragment and query already stripped off, still
    /// percent-encoded.
    pub url: Span,
    pub query_string: Option<Span>,
    pub fragment: Option<Span>,
    /// Index into the buffer of the first byte after the request line's
    /// trailing CRLF — where header parsing should resume.
    pub headers_start: usize,
}

fn read_u32(data: &[u8]) -> Option<u32> {
    if data.len() < 4 {
        return None;
    }
    Some(u32::from_ne_bytes([data[0], data[1], data[2], data[3]]))
}

/// Parses the request line starting at `data[0]`. `data` is the full
/// remainder of the connection buffer (request line onward); only a prefix
/// of it is consumed.
pub fn parse_request_line(data: &[u8]) -> LineResult<RequestLine> {
    let tag = read_u32(data).ok_or_else(|| err_msg("Request line shorter than a method tag"))?;

    let (method, method_len) = if tag == TAG_GET {
        (Method::Get, 4)
    } else if tag == TAG_HEAD && data.get(4) == Some(&b' ') {
        (Method::Head, 5)
    } else if tag == TAG_POST && data.get(4) == Some(&b' ') {
        (Method::Post, 5)
    } else {
        return Err(classify_unrecognized_method(data));
    };

    let tail = &data[method_len..];
    let cr_rel = tail
        .iter()
        .position(|&b| b == b'\r')
        .ok_or_else(|| err_msg("Request line missing CR"))?;

    if cr_rel < MIN_TAIL_LEN {
        return Err(err_msg("Request line too short to hold a path and version"));
    }

    if tail.get(cr_rel + 1) != Some(&b'\n') {
        return Err(err_msg("CR in request line not followed by LF"));
    }

    // The version token is the 8 bytes immediately preceding CR:
    // "HTTP/1.x" => H(-8) T T P / 1(-3) . x(-1)
    let version_start = cr_rel - 8;
    let version = &tail[version_start..cr_rel];

    if version[0] != b'H' {
        return Err(err_msg("Missing HTTP version marker"));
    }
    if version[5] != b'1' {
        return Err(err_msg("Only HTTP/1.x is supported"));
    }
    let minor = version[7];
    let http_version = match minor {
        b'0' => Version::Http10,
        _ => Version::Http11,
    };

    if version_start == 0 || tail[version_start - 1] != b' ' {
        return Err(err_msg("Missing space between path and HTTP version"));
    }
    let path_end_rel = version_start - 1;
    let path = &tail[..path_end_rel];

    if path.first() != Some(&b'/') {
        return Err(err_msg("Request path must start with '/'"));
    }

    // Fragment is searched for from the end (fragments are typically short);
    // query string from the start (queries are often long).
    let (path_only_len, fragment_rel) = match path.iter().rposition(|&b| b == b'#') {
        Some(idx) => (idx, Some(idx + 1)),
        None => (path.len(), None),
    };

    let path_without_fragment = &path[..path_only_len];
    let (path_len, query_rel) = match path_without_fragment.iter().position(|&b| b == b'?') {
        Some(idx) => (idx, Some(idx + 1)),
        None => (path_only_len, None),
    };

    let path_abs_start = method_len;
    let url = Span::new(path_abs_start, path_len);

    let query_string = query_rel.map(|rel| Span::new(path_abs_start + rel, path_only_len - rel));

    let fragment = fragment_rel.map(|rel| Span::new(path_abs_start + rel, path.len() - rel));

    let headers_start = method_len + cr_rel + 2;

    Ok(RequestLine {
        method,
        version: http_version,
        url,
        query_string,
        fragment,
        headers_start,
    })
}

/// Re-runs the fragment/query split used above against an arbitrary `url`
/// span, e.g. after a handler rewrites it (spec §4.G step 9). Returns the
/// path-only span plus any query/fragment spans found, all absolute offsets
/// into `buf`.
pub fn split_fragment_and_query(buf: &[u8], url: Span) -> (Span, Option<Span>, Option<Span>) {
    let path = url.get(buf);

    let (path_only_len, fragment_rel) = match path.iter().rposition(|&b| b == b'#') {
        Some(idx) => (idx, Some(idx + 1)),
        None => (path.len(), None),
    };

    let path_without_fragment = &path[..path_only_len];
    let (path_len, query_rel) = match path_without_fragment.iter().position(|&b| b == b'?') {
        Some(idx) => (idx, Some(idx + 1)),
        None => (path_only_len, None),
    };

    let base = url.start;
    let new_url = Span::new(base, path_len);
    let query_string = query_rel.map(|rel| Span::new(base + rel, path_only_len - rel));
    let fragment = fragment_rel.map(|rel| Span::new(base + rel, path.len() - rel));

    (new_url, query_string, fragment)
}

/// Like [`parse_request_line`] but against `buf[start..]`, with all spans and
/// `headers_start` re-based to be absolute offsets into `buf`.
pub fn parse_request_line_at(buf: &[u8], start: usize) -> LineResult<RequestLine> {
    let mut r = parse_request_line(&buf[start..])?;
    r.url = r.url.shift(start);
    r.query_string = r.query_string.map(|s| s.shift(start));
    r.fragment = r.fragment.map(|s| s.shift(start));
    r.headers_start += start;
    Ok(r)
}
