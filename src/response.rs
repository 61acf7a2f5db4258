//! The response-writer collaborator (spec §1 External Collaborators, §6).
//! This core never formats a status line or body itself -- it only decides
//! *which* status applies and whether the connection stays open, then hands
//! off to whatever sits on the other side of this trait (a real response
//! writer would format and flush bytes on the same socket wrapped by
//! `Connection`).

use async_trait::async_trait;

use crate::status::StatusCode;

#[async_trait]
pub trait ResponseWriter: Send + Sync {
    /// A response generated by this core itself (a pre-dispatch error, a
    /// lookup miss, an authorization failure) rather than by a route
    /// handler. `keep_alive` tells the writer whether to add
    /// `Connection: close`.
    async fn send_default_response(&mut self, status: StatusCode, keep_alive: bool);

    /// The status a route handler chose for a successfully dispatched
    /// request.
    async fn send_response(&mut self, status: StatusCode, keep_alive: bool);
}
