//! An in-memory socket standing in for a `TcpStream` in integration tests:
//! reads come from a fixed input buffer (optionally split into chunks, to
//! exercise the read loop's partial-read handling), writes accumulate into
//! an output buffer inspectable after the drive completes.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::io::{AsyncRead, AsyncWrite};
use http_core::{Request, RequestHandler, StatusCode};

pub struct MockSocket {
    chunks: Vec<Vec<u8>>,
    pub output: Vec<u8>,
}

impl MockSocket {
    /// Delivers `data` across `n` reads of roughly equal size, to exercise
    /// assembling a request from multiple partial socket reads.
    pub fn chunked(data: &[u8], n: usize) -> Self {
        let mut chunks = Vec::new();
        let chunk_len = (data.len() + n - 1) / n.max(1);
        let mut pos = 0;
        while pos < data.len() {
            let end = (pos + chunk_len).min(data.len());
            chunks.push(data[pos..end].to_vec());
            pos = end;
        }
        chunks.reverse(); // pop() takes from the end
        MockSocket {
            chunks,
            output: Vec::new(),
        }
    }

    pub fn whole(data: &[u8]) -> Self {
        Self::chunked(data, 1)
    }
}

impl AsyncRead for MockSocket {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.chunks.pop() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.chunks.push(chunk[n..].to_vec());
                }
                Poll::Ready(Ok(n))
            }
            None => Poll::Ready(Ok(0)),
        }
    }
}

impl AsyncWrite for MockSocket {
    fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        self.output.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

pub struct EchoHandler;

#[async_trait]
impl RequestHandler for EchoHandler {
    async fn handle(&self, _request: &mut Request) -> StatusCode {
        StatusCode::Ok
    }
}
