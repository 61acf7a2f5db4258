//! A minimal demonstration server wiring the ingestion core end-to-end:
//! one `async_std::task::spawn`-ed worker per accepted connection, a toy
//! two-route table, and a response writer that writes directly back to the
//! connection's socket. Modeled on
//! `pkg/http/src/server.rs::HttpServer::run`/`handle_client`, which spawns
//! one task per `TcpStream` off a `TcpListener::incoming()` stream; this
//! stays a thin `bin/` rather than part of the library, since the accept
//! loop and route table are explicitly out of scope for the core itself.

use async_std::net::{TcpListener, TcpStream};
use async_std::task;
use async_trait::async_trait;
use futures::io::AsyncWriteExt;

use http_core::errors::*;
use http_core::{
    drive_one_request, Authorizer, Connection, DriveOutcome, Request, RequestHandler, ResponseWriter,
    RouteFlags, RouteMatch, RouteTable, StatusCode,
};

struct HelloHandler;

#[async_trait]
impl RequestHandler for HelloHandler {
    async fn handle(&self, _request: &mut Request) -> StatusCode {
        StatusCode::Ok
    }
}

struct EchoHandler;

#[async_trait]
impl RequestHandler for EchoHandler {
    async fn handle(&self, _request: &mut Request) -> StatusCode {
        StatusCode::Ok
    }
}

struct DemoRoutes {
    hello: HelloHandler,
    echo: EchoHandler,
}

impl RouteTable for DemoRoutes {
    fn lookup_prefix<'a>(&'a self, url: &[u8]) -> Option<RouteMatch<'a>> {
        if url.starts_with(b"/hello") {
            return Some(RouteMatch {
                prefix_len: "/hello".len(),
                flags: RouteFlags::empty(),
                handler: &self.hello,
                realm: None,
            });
        }
        if url.starts_with(b"/echo") {
            return Some(RouteMatch {
                prefix_len: "/echo".len(),
                flags: RouteFlags::PARSE_QUERY_STRING
                    .or(RouteFlags::PARSE_COOKIES)
                    .or(RouteFlags::REMOVE_LEADING_SLASH),
                handler: &self.echo,
                realm: None,
            });
        }
        None
    }
}

struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _credentials: Option<&[u8]>, _realm: &str) -> bool {
        true
    }
}

/// Writes directly to its own clone of the connection's `TcpStream`. Async-std
/// `TcpStream` clones share the same underlying socket, so this can write
/// responses while `drive_one_request` holds the `Connection` (and its read
/// half) mutably borrowed.
struct SocketResponseWriter {
    socket: TcpStream,
}

#[async_trait]
impl ResponseWriter for SocketResponseWriter {
    async fn send_default_response(&mut self, status: StatusCode, keep_alive: bool) {
        self.write_status_line(status, keep_alive).await;
    }

    async fn send_response(&mut self, status: StatusCode, keep_alive: bool) {
        self.write_status_line(status, keep_alive).await;
    }
}

impl SocketResponseWriter {
    async fn write_status_line(&mut self, status: StatusCode, keep_alive: bool) {
        let mut out = format!(
            "HTTP/1.1 {} {}\r\nContent-Length: 0\r\n",
            status.as_u16(),
            status.default_reason()
        );
        if !keep_alive {
            out.push_str("Connection: close\r\n");
        }
        out.push_str("\r\n");
        let _ = self.socket.write_all(out.as_bytes()).await;
    }
}

async fn handle_connection(stream: TcpStream) -> Result<()> {
    let write_stream = stream.clone();
    let mut conn = Connection::new(stream);
    let routes = DemoRoutes {
        hello: HelloHandler,
        echo: EchoHandler,
    };
    let authorizer = AllowAll;

    loop {
        let mut writer = SocketResponseWriter {
            socket: write_stream.clone(),
        };
        let outcome = drive_one_request(&mut conn, &routes, &authorizer, &mut writer, true).await?;

        match outcome {
            DriveOutcome::Completed { keep_alive, .. } if keep_alive => continue,
            _ => break,
        }
    }

    Ok(())
}

#[async_std::main]
async fn main() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:8080").await?;
    println!("listening on 127.0.0.1:8080");

    let mut incoming = listener.incoming();
    use futures::stream::StreamExt;
    while let Some(stream) = incoming.next().await {
        let stream = stream?;
        task::spawn(async move {
            if let Err(e) = handle_connection(stream).await {
                eprintln!("connection failed: {}", e);
            }
        });
    }

    Ok(())
}
