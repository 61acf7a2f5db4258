//! The three methods this core understands. Grounded on
//! `pkg/http/src/method.rs`'s `Method` enum, trimmed to the subset the spec
//! scopes this server to (`GET`, `HEAD`, `POST`); anything else is a
//! `405 Method Not Allowed` the driver produces without ever constructing a
//! `Method` value for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
        }
    }
}

/// `HTTP/1.0` vs `HTTP/1.1`. Versions beyond 1.x are out of scope (see the
/// request-line parser in `request_line.rs`, which only ever recognizes a
/// `1` major digit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}
