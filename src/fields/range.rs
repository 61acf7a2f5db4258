//! `Range` header decoding (spec §4.E). Grounded in the overall shape of
//! `pkg/http/src/headers/range.rs` (parse the `bytes=` prefix, split on
//! `-`), but this crate's `Range` is the byte-offset pair the spec
//! describes (signed 64-bit, `-1` sentinels for "open ended" or "invalid")
//! rather than the teacher's `Option<(usize, usize)>` bounded-by-content
//! version, since this core never has the resource's length on hand at
//! parse time.

/// `from`/`to` are `-1` when absent or when the header didn't parse as one
/// of the three supported grammars; the driver treats `(-1, -1)` as "no
/// usable range" without failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub from: i64,
    pub to: i64,
}

impl ByteRange {
    pub const INVALID: ByteRange = ByteRange { from: -1, to: -1 };
}

impl Default for ByteRange {
    fn default() -> Self {
        ByteRange::INVALID
    }
}

/// Parses a `Range` header value (without the `Range: ` prefix). Supported
/// grammars: `bytes=from-to`, `bytes=-to` (from = 0), `bytes=from-`
/// (to = -1). Anything else yields [`ByteRange::INVALID`] rather than an
/// error -- a malformed Range header is simply ignored, not a 400.
pub fn parse_range(value: &[u8]) -> ByteRange {
    let value = match value.strip_prefix(b"bytes=") {
        Some(v) => v,
        None => return ByteRange::INVALID,
    };

    let dash = match value.iter().position(|&b| b == b'-') {
        Some(idx) => idx,
        None => return ByteRange::INVALID,
    };

    let (from_bytes, to_bytes) = (&value[..dash], &value[dash + 1..]);

    if from_bytes.is_empty() && to_bytes.is_empty() {
        return ByteRange::INVALID;
    }

    if from_bytes.is_empty() {
        // "-to" form.
        return match parse_u64(to_bytes) {
            Some(to) => ByteRange { from: 0, to: to as i64 },
            None => ByteRange::INVALID,
        };
    }

    let from = match parse_u64(from_bytes) {
        Some(v) => v as i64,
        None => return ByteRange::INVALID,
    };

    if to_bytes.is_empty() {
        // "from-" form.
        return ByteRange { from, to: -1 };
    }

    match parse_u64(to_bytes) {
        Some(to) => ByteRange { from, to: to as i64 },
        None => ByteRange::INVALID,
    }
}

fn parse_u64(s: &[u8]) -> Option<u64> {
    if s.is_empty() || !s.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(s).ok()?.parse().ok()
}
