//! The parsed request (spec §3, "Request"). A plain value type produced by
//! the driver for each request cycle -- unlike the original's request
//! struct, which keeps a back-reference to its enclosing connection, this
//! one doesn't: the connection (buffer, socket, keep-alive flag) outlives
//! and is threaded separately through the driver, which sidesteps a
//! self-referential type that would otherwise fight Rust's borrow checker
//! across `.await` points. See `DESIGN.md` for this Open Question decision.

use crate::fields::{ByteRange, KvPair};
use crate::flags::RequestFlags;
use crate::method::Version;
use crate::proxy::ProxyInfo;
use crate::span::Span;

#[derive(Debug, Default, Clone, Copy)]
pub struct RequestHeader {
    pub if_modified_since: Option<i64>,
    pub range: ByteRange,
}

pub struct Request {
    pub flags: RequestFlags,
    pub version: Version,

    /// The path, percent-decoded, with fragment/query stripped and (after
    /// route dispatch) the matched prefix removed. Indexes into the owning
    /// `Connection`'s buffer.
    pub url: Span,
    /// Snapshot of `url` right after request-line parsing and percent
    /// decoding, before any route-prefix stripping or rewrite. Used for
    /// logging and as the rewrite loop's starting point.
    pub original_url: Span,

    pub header: RequestHeader,

    pub query_params: Vec<KvPair>,
    pub post_data: Vec<KvPair>,
    pub cookies: Vec<KvPair>,

    pub proxy: Option<ProxyInfo>,
}

impl Request {
    pub fn new(version: Version, flags: RequestFlags, url: Span) -> Self {
        Request {
            flags,
            version,
            url,
            original_url: url,
            header: RequestHeader::default(),
            query_params: Vec::new(),
            post_data: Vec::new(),
            cookies: Vec::new(),
            proxy: None,
        }
    }

    pub fn method_flags(&self) -> RequestFlags {
        RequestFlags::from_raw(self.flags.to_raw() & RequestFlags::METHOD_MASK.to_raw())
    }

    pub fn is_get(&self) -> bool {
        self.flags.contains(RequestFlags::METHOD_GET)
    }

    pub fn is_head(&self) -> bool {
        self.flags.contains(RequestFlags::METHOD_HEAD)
    }

    pub fn is_post(&self) -> bool {
        self.flags.contains(RequestFlags::METHOD_POST)
    }

    pub fn keep_alive_requested(&self, connection_byte: u8) -> bool {
        if self.flags.contains(RequestFlags::IS_HTTP_1_0) {
            connection_byte == b'k'
        } else {
            connection_byte != b'c'
        }
    }
}
