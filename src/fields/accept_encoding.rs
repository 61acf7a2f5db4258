//! `Accept-Encoding` decoding (spec §4.E): we only care whether gzip and/or
//! deflate are acceptable to the client, not full quality-value negotiation,
//! since nothing downstream of this core implements other encodings.

use crate::flags::RequestFlags;

/// Scans comma-separated tokens and ORs in `ACCEPT_GZIP`/`ACCEPT_DEFLATE`
/// onto `flags` for any token recognized. A token beginning with `defl`
/// (after skipping one optional leading space) sets deflate; `gzip` sets
/// gzip. Quality values (`;q=0`) are not inspected -- presence of the token
/// is enough, matching the spec's "scan comma-separated tokens" wording.
pub fn parse_accept_encoding(value: &[u8], flags: &mut RequestFlags) {
    for token in value.split(|&b| b == b',') {
        let token = token.strip_prefix(b" ").unwrap_or(token);

        if token.starts_with(b"defl") {
            flags.insert(RequestFlags::ACCEPT_DEFLATE);
        } else if token.starts_with(b"gzip") {
            flags.insert(RequestFlags::ACCEPT_GZIP);
        }
    }
}
