//! The request driver (spec §4.G): orchestrates the PROXY decoder, request
//! line, header block, and field decoders over one assembled buffer, looks
//! up and invokes the route handler, and runs the bounded URL-rewrite loop.
//! Grounded in the overall shape of `pkg/http/src/server.rs::handle_client`
//! -- one big sequential `async fn` with early returns for each failure
//! mode -- generalized from that function's fixed HTTP/1.1-message-parsing
//! pipeline to this core's route-table/authorization/rewrite flow.

use futures::io::{AsyncRead, AsyncWrite};

use crate::bytes_util::url_decode_in_place;
use crate::connection::Connection;
use crate::errors::*;
use crate::fields::{parse_accept_encoding, parse_if_modified_since, parse_key_values, parse_range, ValueDecoder};
use crate::flags::{RequestFlags, RouteFlags};
use crate::header::parse_headers_at;
use crate::method::Method;
use crate::proxy::{decode_proxy_preamble, ProxyDecode};
use crate::read_loop::{read_post_data, run_read_loop, PostBodyOutcome, ReadLoopOutcome};
use crate::request::Request;
use crate::request_line::{parse_request_line_at, split_fragment_and_query, RequestLineError};
use crate::response::ResponseWriter;
use crate::route::RouteTable;
use crate::span::Span;
use crate::status::StatusCode;

const FORM_CONTENT_TYPE: &[u8] = b"application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// The cycle completed (with or without sending a response). The caller
    /// should run another cycle over the same connection iff `keep_alive`.
    Completed { next_request: Option<usize>, keep_alive: bool },
    /// The connection must be torn down without sending anything further.
    Abort,
}

pub async fn drive_one_request<S, R, A, W>(
    conn: &mut Connection<S>,
    routes: &R,
    authorizer: &A,
    response_writer: &mut W,
    allow_proxy_reqs: bool,
) -> Result<DriveOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: RouteTable,
    A: crate::route::Authorizer,
    W: ResponseWriter,
{
    // Step 1: assemble a complete request (or pipelined tail) into the buffer.
    match run_read_loop(conn).await? {
        ReadLoopOutcome::Ok => {}
        ReadLoopOutcome::Abort => return Ok(DriveOutcome::Abort),
        ReadLoopOutcome::BadRequest => {
            if conn.next_request.is_some() {
                return Ok(DriveOutcome::Completed {
                    next_request: conn.next_request.take(),
                    keep_alive: conn.keep_alive,
                });
            }
            response_writer
                .send_default_response(StatusCode::BadRequest, false)
                .await;
            return Ok(DriveOutcome::Abort);
        }
        ReadLoopOutcome::TooLarge => {
            response_writer
                .send_default_response(StatusCode::PayloadTooLarge, false)
                .await;
            return Ok(DriveOutcome::Abort);
        }
        ReadLoopOutcome::Timeout => {
            response_writer
                .send_default_response(StatusCode::RequestTimeout, false)
                .await;
            return Ok(DriveOutcome::Abort);
        }
    }

    let filled = conn.filled;
    let mut cursor = 0usize;
    let mut flags = RequestFlags::empty();

    if allow_proxy_reqs {
        flags.insert(RequestFlags::ALLOW_PROXY_REQS);
    }

    let mut proxy_info = None;
    if flags.contains(RequestFlags::ALLOW_PROXY_REQS) {
        match decode_proxy_preamble(&conn.buffer[..filled]) {
            Ok(ProxyDecode::NotPresent) => {}
            Ok(ProxyDecode::Present { info, consumed }) => {
                flags.insert(RequestFlags::PROXIED);
                proxy_info = Some(info);
                cursor += consumed;
            }
            Err(_) => {
                response_writer
                    .send_default_response(StatusCode::BadRequest, false)
                    .await;
                return Ok(DriveOutcome::Abort);
            }
        }
    }

    // Step 3: request line + headers.
    let request_line = match parse_request_line_at(&conn.buffer, cursor) {
        Ok(r) => r,
        Err(RequestLineError::UnsupportedMethod) => {
            response_writer
                .send_default_response(StatusCode::MethodNotAllowed, false)
                .await;
            return Ok(DriveOutcome::Abort);
        }
        Err(RequestLineError::Malformed(_)) => {
            response_writer
                .send_default_response(StatusCode::BadRequest, false)
                .await;
            return Ok(DriveOutcome::Abort);
        }
    };

    flags.insert(match request_line.method {
        Method::Get => RequestFlags::METHOD_GET,
        Method::Head => RequestFlags::METHOD_HEAD,
        Method::Post => RequestFlags::METHOD_POST,
    });
    if request_line.version == crate::method::Version::Http10 {
        flags.insert(RequestFlags::IS_HTTP_1_0);
    }

    let (header_spans, headers_end) = match parse_headers_at(&conn.buffer, request_line.headers_start) {
        Ok(v) => v,
        Err(_) => {
            response_writer
                .send_default_response(StatusCode::BadRequest, false)
                .await;
            return Ok(DriveOutcome::Abort);
        }
    };

    // From here on a pipelined tail (if any) is a known quantity, so a
    // BadRequest-class failure can defer to it instead of tearing the
    // connection down (spec §7: "400 received after we already detected a
    // pipelined tail does not emit a response").
    let mut tentative_next = if filled > headers_end { Some(headers_end) } else { None };

    // Step 4: percent-decode the URL in place.
    let mut url = request_line.url;
    let decoded_len = match url_decode_in_place(&mut conn.buffer[url.start..url.end()]) {
        Some(len) => len,
        None => return defer_or_abort(conn, response_writer, tentative_next).await,
    };
    url.len = decoded_len;
    let original_url = url;

    // Step 5: keep-alive.
    let keep_alive = if flags.contains(RequestFlags::IS_HTTP_1_0) {
        header_spans.connection == b'k'
    } else {
        header_spans.connection != b'c'
    };
    conn.keep_alive = keep_alive;

    // Step 6: POST body.
    let mut post_data_span: Option<Span> = None;
    if flags.contains(RequestFlags::METHOD_POST) {
        if let Some(cl) = header_spans.content_length {
            let (outcome, len) = read_post_data(
                &conn.buffer,
                headers_end,
                filled,
                conn.buffer_size(),
                cl.get(&conn.buffer),
            );
            match outcome {
                PostBodyOutcome::Ok => {
                    post_data_span = Some(Span::new(headers_end, len));
                    tentative_next = if filled > headers_end + len {
                        Some(headers_end + len)
                    } else {
                        None
                    };
                }
                PostBodyOutcome::BadRequest => {
                    return defer_or_abort(conn, response_writer, tentative_next).await;
                }
                PostBodyOutcome::TooLarge => {
                    response_writer
                        .send_default_response(StatusCode::PayloadTooLarge, false)
                        .await;
                    return Ok(DriveOutcome::Abort);
                }
                PostBodyOutcome::NotImplemented => {
                    response_writer
                        .send_default_response(StatusCode::NotImplemented, false)
                        .await;
                    return Ok(DriveOutcome::Abort);
                }
            }
        }
    }

    conn.next_request = tentative_next;

    let mut request = Request::new(request_line.version, flags, original_url);
    request.proxy = proxy_info;

    // Steps 7-9: route lookup, field decoding, authorization, dispatch, and
    // the bounded rewrite loop.
    let mut rewrites = 0u8;
    let mut query_string = request_line.query_string;
    loop {
        let route_match = routes.lookup_prefix(url.get(&conn.buffer));
        let route_match = match route_match {
            Some(m) => m,
            None => {
                response_writer
                    .send_default_response(StatusCode::NotFound, keep_alive)
                    .await;
                return Ok(DriveOutcome::Completed { next_request: conn.next_request, keep_alive });
            }
        };

        if route_match.prefix_len > url.len {
            response_writer
                .send_default_response(StatusCode::InternalServerError, false)
                .await;
            return Ok(DriveOutcome::Abort);
        }
        url.start += route_match.prefix_len;
        url.len -= route_match.prefix_len;

        if route_match.flags.contains(RouteFlags::PARSE_QUERY_STRING) {
            if let Some(qs) = query_string {
                request.query_params = parse_key_values(&mut conn.buffer, qs.start, qs.len, b'&', ValueDecoder::UrlDecode)?;
            }
        }
        if route_match.flags.contains(RouteFlags::PARSE_IF_MODIFIED_SINCE) {
            if let Some(s) = header_spans.if_modified_since {
                request.header.if_modified_since = parse_if_modified_since(s.get(&conn.buffer));
            }
        }
        if route_match.flags.contains(RouteFlags::PARSE_RANGE) {
            if let Some(s) = header_spans.range {
                request.header.range = parse_range(s.get(&conn.buffer));
            }
        }
        if route_match.flags.contains(RouteFlags::PARSE_ACCEPT_ENCODING) {
            if let Some(s) = header_spans.accept_encoding {
                let value = s.get(&conn.buffer).to_vec();
                parse_accept_encoding(&value, &mut request.flags);
            }
        }
        if route_match.flags.contains(RouteFlags::PARSE_COOKIES) {
            if let Some(s) = header_spans.cookie {
                request.cookies = parse_key_values(&mut conn.buffer, s.start, s.len, b';', ValueDecoder::Identity)?;
            }
        }
        if route_match.flags.contains(RouteFlags::PARSE_POST_DATA) {
            if let (Some(body), Some(ct)) = (post_data_span, header_spans.content_type) {
                if ct.get(&conn.buffer) == FORM_CONTENT_TYPE {
                    request.post_data = parse_key_values(&mut conn.buffer, body.start, body.len, b'&', ValueDecoder::UrlDecode)?;
                }
            }
        }

        if route_match.flags.contains(RouteFlags::MUST_AUTHORIZE) {
            let creds = header_spans.authorization.map(|s| s.get(&conn.buffer));
            let realm = route_match.realm.unwrap_or("");
            if !authorizer.authorize(creds, realm).await {
                response_writer
                    .send_default_response(StatusCode::Unauthorized, keep_alive)
                    .await;
                return Ok(DriveOutcome::Completed { next_request: conn.next_request, keep_alive });
            }
        }

        if route_match.flags.contains(RouteFlags::REMOVE_LEADING_SLASH) {
            while url.len > 0 && conn.buffer[url.start] == b'/' {
                url.start += 1;
                url.len -= 1;
            }
        }

        request.url = url;

        let status = route_match.handler.handle(&mut request).await;

        if route_match.flags.contains(RouteFlags::CAN_REWRITE_URL) && request.flags.contains(RequestFlags::URL_REWRITTEN) {
            rewrites += 1;
            if rewrites > Connection::<S>::MAX_REWRITES {
                response_writer
                    .send_default_response(StatusCode::InternalServerError, false)
                    .await;
                return Ok(DriveOutcome::Abort);
            }

            request.flags.remove(RequestFlags::URL_REWRITTEN);
            let (new_url, new_query, _fragment) = split_fragment_and_query(&conn.buffer, request.url);
            url = new_url;
            query_string = new_query;
            continue;
        }

        response_writer.send_response(status, keep_alive).await;
        return Ok(DriveOutcome::Completed { next_request: conn.next_request, keep_alive });
    }
}

async fn defer_or_abort<S, W>(
    conn: &mut Connection<S>,
    response_writer: &mut W,
    tentative_next: Option<usize>,
) -> Result<DriveOutcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
    W: ResponseWriter,
{
    if let Some(next) = tentative_next {
        conn.next_request = Some(next);
        return Ok(DriveOutcome::Completed { next_request: Some(next), keep_alive: conn.keep_alive });
    }
    response_writer
        .send_default_response(StatusCode::BadRequest, false)
        .await;
    Ok(DriveOutcome::Abort)
}
