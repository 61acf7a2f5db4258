//! The route-lookup and authorization collaborators (spec §1 External
//! Collaborators, §6 "Route-lookup contract"). Neither the prefix trie nor
//! the password-file check is specified by this core; these traits are the
//! seam a concrete server wires in, modeled the same way
//! `pkg/http/src/server.rs` takes an `Arc<dyn HttpRequestHandler>` rather
//! than owning handler dispatch itself.

use async_trait::async_trait;

use crate::flags::RouteFlags;
use crate::request::Request;
use crate::status::StatusCode;

/// What a prefix-trie lookup yields for a matched URL.
pub struct RouteMatch<'a> {
    /// Length, in bytes, of the matched prefix -- stripped from `url`
    /// during `prepare_for_response` (spec §4.G step 8).
    pub prefix_len: usize,
    pub flags: RouteFlags,
    pub handler: &'a (dyn RequestHandler + Send + Sync),
    /// Required only when `flags` contains `MUST_AUTHORIZE`.
    pub realm: Option<&'a str>,
}

/// The external URL-prefix trie (`lookup_prefix(url) -> route | none`).
pub trait RouteTable: Send + Sync {
    fn lookup_prefix<'a>(&'a self, url: &[u8]) -> Option<RouteMatch<'a>>;
}

/// The external password-file / HTTP authorization check
/// (`authorize(credentials, realm, file) -> bool`).
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, credentials: Option<&[u8]>, realm: &str) -> bool;
}

/// A matched route's handler. Returns the status to send and may rewrite
/// `request.url` and set `URL_REWRITTEN` to ask the driver to re-dispatch
/// (spec §4.G step 9).
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: &mut Request) -> StatusCode;
}
