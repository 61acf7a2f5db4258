//! End-to-end driver tests (spec §8 "Concrete scenarios"), run over an
//! in-memory socket rather than a real `TcpStream`.

mod support;

use async_trait::async_trait;

use http_core::{
    drive_one_request, Authorizer, Connection, DriveOutcome, Request, RequestHandler, ResponseWriter, RouteFlags,
    RouteMatch, RouteTable, StatusCode,
};
use support::{EchoHandler, MockSocket};

struct OneRoute<H: RequestHandler> {
    prefix: &'static str,
    flags: RouteFlags,
    handler: H,
    realm: Option<&'static str>,
}

impl<H: RequestHandler> RouteTable for OneRoute<H> {
    fn lookup_prefix<'a>(&'a self, url: &[u8]) -> Option<RouteMatch<'a>> {
        if url.starts_with(self.prefix.as_bytes()) {
            Some(RouteMatch {
                prefix_len: self.prefix.len(),
                flags: self.flags,
                handler: &self.handler,
                realm: self.realm,
            })
        } else {
            None
        }
    }
}

struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _credentials: Option<&[u8]>, _realm: &str) -> bool {
        true
    }
}

struct DenyAll;

#[async_trait]
impl Authorizer for DenyAll {
    async fn authorize(&self, _credentials: Option<&[u8]>, _realm: &str) -> bool {
        false
    }
}

struct RecordingWriter {
    sent: Vec<(StatusCode, bool)>,
}

#[async_trait]
impl ResponseWriter for RecordingWriter {
    async fn send_default_response(&mut self, status: StatusCode, keep_alive: bool) {
        self.sent.push((status, keep_alive));
    }

    async fn send_response(&mut self, status: StatusCode, keep_alive: bool) {
        self.sent.push((status, keep_alive));
    }
}

#[async_std::test]
async fn simple_get() {
    let socket = MockSocket::whole(b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n");
    let mut conn = Connection::new(socket);
    let routes = OneRoute {
        prefix: "/hello",
        flags: RouteFlags::empty(),
        handler: EchoHandler,
        realm: None,
    };
    let authorizer = AllowAll;
    let mut writer = RecordingWriter { sent: Vec::new() };

    let outcome = drive_one_request(&mut conn, &routes, &authorizer, &mut writer, false)
        .await
        .unwrap();

    assert_eq!(writer.sent, vec![(StatusCode::Ok, true)]);
    match outcome {
        DriveOutcome::Completed { keep_alive, .. } => assert!(keep_alive),
        DriveOutcome::Abort => panic!("expected a completed cycle"),
    }
}

#[async_std::test]
async fn pipelined_get_plus_get() {
    let socket = MockSocket::whole(b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n");
    let mut conn = Connection::new(socket);
    let routes = OneRoute {
        prefix: "/",
        flags: RouteFlags::empty(),
        handler: EchoHandler,
        realm: None,
    };
    let authorizer = AllowAll;

    let mut writer = RecordingWriter { sent: Vec::new() };
    let outcome = drive_one_request(&mut conn, &routes, &authorizer, &mut writer, false)
        .await
        .unwrap();
    let next_request = match outcome {
        DriveOutcome::Completed { next_request, keep_alive } => {
            assert!(keep_alive);
            next_request.expect("pipelined tail should be detected")
        }
        DriveOutcome::Abort => panic!("unexpected abort"),
    };
    assert_eq!(&conn.buffer[next_request..next_request + 3], b"GET");

    let mut writer2 = RecordingWriter { sent: Vec::new() };
    let outcome2 = drive_one_request(&mut conn, &routes, &authorizer, &mut writer2, false)
        .await
        .unwrap();
    assert!(matches!(outcome2, DriveOutcome::Completed { .. }));
    assert_eq!(writer2.sent, vec![(StatusCode::Ok, true)]);
}

#[async_std::test]
async fn post_form_body() {
    let body = b"POST /p HTTP/1.1\r\nContent-Length: 7\r\nContent-Type: application/x-www-form-urlencoded\r\n\r\na=1&b=2";
    let socket = MockSocket::whole(body);
    let mut conn = Connection::new(socket);
    let routes = OneRoute {
        prefix: "/p",
        flags: RouteFlags::PARSE_POST_DATA,
        handler: EchoHandler,
        realm: None,
    };
    let authorizer = AllowAll;
    let mut writer = RecordingWriter { sent: Vec::new() };

    drive_one_request(&mut conn, &routes, &authorizer, &mut writer, false)
        .await
        .unwrap();

    assert_eq!(writer.sent, vec![(StatusCode::Ok, true)]);
}

#[async_std::test]
async fn partial_reads_still_assemble_a_request() {
    let data = b"GET /hello HTTP/1.1\r\nHost: x\r\n\r\n";
    let socket = MockSocket::chunked(data, 5);
    let mut conn = Connection::new(socket);
    let routes = OneRoute {
        prefix: "/hello",
        flags: RouteFlags::empty(),
        handler: EchoHandler,
        realm: None,
    };
    let authorizer = AllowAll;
    let mut writer = RecordingWriter { sent: Vec::new() };

    let outcome = drive_one_request(&mut conn, &routes, &authorizer, &mut writer, false)
        .await
        .unwrap();
    assert!(matches!(outcome, DriveOutcome::Completed { .. }));
    assert_eq!(writer.sent, vec![(StatusCode::Ok, true)]);
}

#[async_std::test]
async fn missing_route_is_not_found() {
    let socket = MockSocket::whole(b"GET /nope HTTP/1.1\r\n\r\n");
    let mut conn = Connection::new(socket);
    let routes = OneRoute {
        prefix: "/hello",
        flags: RouteFlags::empty(),
        handler: EchoHandler,
        realm: None,
    };
    let authorizer = AllowAll;
    let mut writer = RecordingWriter { sent: Vec::new() };

    drive_one_request(&mut conn, &routes, &authorizer, &mut writer, false)
        .await
        .unwrap();

    assert_eq!(writer.sent, vec![(StatusCode::NotFound, true)]);
}

#[async_std::test]
async fn authorization_failure_is_unauthorized() {
    let socket = MockSocket::whole(b"GET /secret HTTP/1.1\r\n\r\n");
    let mut conn = Connection::new(socket);
    let routes = OneRoute {
        prefix: "/secret",
        flags: RouteFlags::MUST_AUTHORIZE,
        handler: EchoHandler,
        realm: Some("demo"),
    };
    let authorizer = DenyAll;
    let mut writer = RecordingWriter { sent: Vec::new() };

    drive_one_request(&mut conn, &routes, &authorizer, &mut writer, false)
        .await
        .unwrap();

    assert_eq!(writer.sent, vec![(StatusCode::Unauthorized, true)]);
}

#[async_std::test]
async fn keep_alive_policy_http_1_0_defaults_closed() {
    let socket = MockSocket::whole(b"GET /hello HTTP/1.0\r\n\r\n");
    let mut conn = Connection::new(socket);
    let routes = OneRoute {
        prefix: "/hello",
        flags: RouteFlags::empty(),
        handler: EchoHandler,
        realm: None,
    };
    let authorizer = AllowAll;
    let mut writer = RecordingWriter { sent: Vec::new() };

    drive_one_request(&mut conn, &routes, &authorizer, &mut writer, false)
        .await
        .unwrap();

    assert_eq!(writer.sent, vec![(StatusCode::Ok, false)]);
}

#[async_std::test]
async fn keep_alive_policy_http_1_0_with_header_stays_open() {
    let socket = MockSocket::whole(b"GET /hello HTTP/1.0\r\nConnection: Keep-Alive\r\n\r\n");
    let mut conn = Connection::new(socket);
    let routes = OneRoute {
        prefix: "/hello",
        flags: RouteFlags::empty(),
        handler: EchoHandler,
        realm: None,
    };
    let authorizer = AllowAll;
    let mut writer = RecordingWriter { sent: Vec::new() };

    drive_one_request(&mut conn, &routes, &authorizer, &mut writer, false)
        .await
        .unwrap();

    assert_eq!(writer.sent, vec![(StatusCode::Ok, true)]);
}

#[async_std::test]
async fn keep_alive_policy_http_1_1_close_header_closes() {
    let socket = MockSocket::whole(b"GET /hello HTTP/1.1\r\nConnection: close\r\n\r\n");
    let mut conn = Connection::new(socket);
    let routes = OneRoute {
        prefix: "/hello",
        flags: RouteFlags::empty(),
        handler: EchoHandler,
        realm: None,
    };
    let authorizer = AllowAll;
    let mut writer = RecordingWriter { sent: Vec::new() };

    drive_one_request(&mut conn, &routes, &authorizer, &mut writer, false)
        .await
        .unwrap();

    assert_eq!(writer.sent, vec![(StatusCode::Ok, false)]);
}

#[async_std::test]
async fn proxy_v1_peer_is_recovered() {
    let mut input = b"PROXY TCP4 1.2.3.4 5.6.7.8 11111 22222\r\n".to_vec();
    input.extend_from_slice(b"GET /hello HTTP/1.1\r\n\r\n");
    let socket = MockSocket::whole(&input);
    let mut conn = Connection::new(socket);

    struct CapturingHandler;
    #[async_trait]
    impl RequestHandler for CapturingHandler {
        async fn handle(&self, request: &mut Request) -> StatusCode {
            let peer = request.proxy.unwrap().peer.unwrap();
            assert_eq!(peer.port(), 11111);
            StatusCode::Ok
        }
    }

    let routes = OneRoute {
        prefix: "/hello",
        flags: RouteFlags::empty(),
        handler: CapturingHandler,
        realm: None,
    };
    let authorizer = AllowAll;
    let mut writer = RecordingWriter { sent: Vec::new() };

    drive_one_request(&mut conn, &routes, &authorizer, &mut writer, true)
        .await
        .unwrap();

    assert_eq!(writer.sent, vec![(StatusCode::Ok, true)]);
}

#[async_std::test]
async fn unsupported_method_without_pipelined_tail_aborts() {
    let socket = MockSocket::whole(b"PUT / HTTP/1.1\r\n\r\n");
    let mut conn = Connection::new(socket);
    let routes = OneRoute {
        prefix: "/",
        flags: RouteFlags::empty(),
        handler: EchoHandler,
        realm: None,
    };
    let authorizer = AllowAll;
    let mut writer = RecordingWriter { sent: Vec::new() };

    let outcome = drive_one_request(&mut conn, &routes, &authorizer, &mut writer, false)
        .await
        .unwrap();

    assert!(matches!(outcome, DriveOutcome::Abort));
    assert_eq!(writer.sent, vec![(StatusCode::MethodNotAllowed, false)]);
}
