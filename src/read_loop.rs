//! The coroutine-driven read loop (spec §4.F). Per the Design Note in spec
//! §9, the "yield" primitive is re-expressed as `async`/`.await`: the
//! `.await` inside `Connection::read_more` *is* the suspension point --
//! control returns to the executor, which resumes this task once the
//! socket is readable again, exactly like `MAY_RESUME`. There is no
//! separate yield enum to construct.
//!
//! Grounded in the general "read until a predicate is satisfied" shape of
//! `pkg/http/src/reader.rs::StreamReader::read_matching`, generalized from a
//! `Matcher` trait object to the spec's specific request-termination
//! heuristic (a fixed-function finalizer rather than a pluggable matcher,
//! since this core only ever looks for one thing).

use futures::io::{AsyncRead, AsyncWrite};

use crate::connection::Connection;
use crate::errors::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadLoopOutcome {
    Ok,
    BadRequest,
    TooLarge,
    Timeout,
    /// The connection is no longer usable (orderly shutdown, or a
    /// transport error after a partial read). Callers must drop the
    /// connection without sending a response -- this is the async
    /// equivalent of a yield that never returns.
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finalize {
    Done,
    TryAgain,
    YieldTryAgain,
    TooLarge,
}

/// Looks only at the first four bytes already in the buffer -- cheap enough
/// to call on every read without actually parsing the request line.
fn looks_like_post(buf: &[u8]) -> bool {
    buf.len() >= 4 && &buf[0..4] == b"POST"
}

/// POST heuristic (spec §9 Open Question): overshoots header termination to
/// also capture a body already sitting in the same read, by finding the
/// *last* LF anywhere in the buffer -- not necessarily its final byte, since
/// a body with no LF of its own (as with a form-encoded POST body) can
/// follow the header terminator in the same read -- and checking the four
/// bytes ending there form "\r\n\r\n".
fn post_heuristic_done(buf: &[u8], filled: usize) -> bool {
    if !looks_like_post(buf) {
        return false;
    }
    match buf[..filled].iter().rposition(|&b| b == b'\n') {
        Some(p) if p >= 3 => &buf[p - 3..=p] == b"\r\n\r\n",
        _ => false,
    }
}

fn finalize(buf: &[u8], filled: usize, buffer_size: usize, pending_pipeline: bool) -> Finalize {
    if filled < 4 {
        return Finalize::YieldTryAgain;
    }
    if filled >= buffer_size {
        return Finalize::TooLarge;
    }
    if pending_pipeline {
        return Finalize::Done;
    }
    if &buf[filled - 4..filled] == b"\r\n\r\n" {
        return Finalize::Done;
    }
    if post_heuristic_done(buf, filled) {
        return Finalize::Done;
    }
    Finalize::TryAgain
}

/// Runs the bounded read loop for one request cycle. On return with `Ok`,
/// `conn.buffer[..conn.filled]` holds (at least) one complete request,
/// possibly with pipelined bytes of the next one trailing it.
pub async fn run_read_loop<S>(conn: &mut Connection<S>) -> Result<ReadLoopOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if let Some(start) = conn.next_request.take() {
        conn.shift_to_front(start);
        match finalize(&conn.buffer, conn.filled, conn.buffer_size(), true) {
            Finalize::Done => return Ok(ReadLoopOutcome::Ok),
            _ => unreachable!("pending_pipeline always finalizes as Done"),
        }
    }

    let mut packets_remaining = Connection::<S>::MAX_PACKETS;

    loop {
        if packets_remaining == 0 {
            return Ok(ReadLoopOutcome::Timeout);
        }

        let before = conn.filled;
        let n = match conn.read_more().await {
            Ok(n) => n,
            Err(e) => {
                return if before == 0 {
                    Ok(ReadLoopOutcome::BadRequest)
                } else {
                    let _ = e;
                    Ok(ReadLoopOutcome::Abort)
                };
            }
        };

        if n == 0 {
            // Orderly shutdown by the peer.
            return Ok(ReadLoopOutcome::Abort);
        }

        match finalize(&conn.buffer, conn.filled, conn.buffer_size(), false) {
            Finalize::Done => return Ok(ReadLoopOutcome::Ok),
            Finalize::TooLarge => return Ok(ReadLoopOutcome::TooLarge),
            Finalize::TryAgain => packets_remaining -= 1,
            Finalize::YieldTryAgain => {
                // Suspension without spending a packet: the next .await on
                // read_more is itself the yield.
            }
        }
    }
}

/// Content-Length-bounded POST body read (spec §4.F `read_post_data`).
/// Requires the header block to already be fully parsed and
/// `content_length_value` to have been extracted from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostBodyOutcome {
    Ok,
    BadRequest,
    TooLarge,
    /// Body crosses into the next pipelined request, or less of it has
    /// arrived than `Content-Length` promises -- both are unimplemented
    /// streaming-body cases per spec §4.F.
    NotImplemented,
}

pub fn read_post_data(
    buf: &[u8],
    body_start: usize,
    filled: usize,
    buffer_size: usize,
    content_length: &[u8],
) -> (PostBodyOutcome, usize) {
    let length: i64 = match std::str::from_utf8(content_length)
        .ok()
        .and_then(|s| s.parse().ok())
    {
        Some(v) => v,
        None => return (PostBodyOutcome::BadRequest, 0),
    };

    if length < 0 {
        return (PostBodyOutcome::BadRequest, 0);
    }
    if length as usize > buffer_size {
        return (PostBodyOutcome::TooLarge, 0);
    }

    let available = filled.saturating_sub(body_start);
    let length = length as usize;

    if available == length {
        (PostBodyOutcome::Ok, length)
    } else {
        (PostBodyOutcome::NotImplemented, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_requires_four_bytes() {
        assert_eq!(finalize(b"GE", 2, 100, false), Finalize::YieldTryAgain);
    }

    #[test]
    fn finalize_detects_blank_line_terminator() {
        let data = b"GET / HTTP/1.1\r\n\r\n";
        assert_eq!(finalize(data, data.len(), 100, false), Finalize::Done);
    }

    #[test]
    fn finalize_too_large_when_buffer_full() {
        let data = vec![b'x'; 16];
        assert_eq!(finalize(&data, 16, 16, false), Finalize::TooLarge);
    }

    #[test]
    fn finalize_post_heuristic_overshoots_into_body() {
        let data = b"POST /p HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc";
        assert_eq!(finalize(data, data.len(), 4096, false), Finalize::Done);
    }

    #[test]
    fn finalize_try_again_without_terminator() {
        let data = b"GET / HTTP/1.1\r\nHost: x";
        assert_eq!(finalize(data, data.len(), 4096, false), Finalize::TryAgain);
    }

    #[test]
    fn read_post_data_exact_length() {
        let buf = b"GET /p HTTP/1.1\r\n\r\na=1&b=2";
        let body_start = buf.len() - 7;
        let (outcome, len) = read_post_data(buf, body_start, buf.len(), 4096, b"7");
        assert_eq!(outcome, PostBodyOutcome::Ok);
        assert_eq!(len, 7);
    }

    #[test]
    fn read_post_data_rejects_negative_length() {
        let buf = b"x";
        let (outcome, _) = read_post_data(buf, 0, 1, 4096, b"-1");
        assert_eq!(outcome, PostBodyOutcome::BadRequest);
    }

    #[test]
    fn read_post_data_rejects_oversized_length() {
        let buf = b"x";
        let (outcome, _) = read_post_data(buf, 0, 1, 4096, b"999999");
        assert_eq!(outcome, PostBodyOutcome::TooLarge);
    }

    #[test]
    fn read_post_data_incomplete_is_not_implemented() {
        let buf = b"ab";
        let (outcome, _) = read_post_data(buf, 0, 2, 4096, b"7");
        assert_eq!(outcome, PostBodyOutcome::NotImplemented);
    }
}
