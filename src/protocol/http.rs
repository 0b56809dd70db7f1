// ABOUTME: Minimal HTTP/1.1 request classifier and JSON response writer
// ABOUTME: Only `GET /` is routed; everything else maps to a fixed error body

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Hard cap on bytes read while looking for the end of the request head
pub const MAX_REQUEST_BYTES: usize = 8 * 1024;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// What a request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `GET /`, the scene tree
    State,
    /// `GET` on any other path
    NotFound,
    /// A well-formed request line with a method other than `GET`
    MethodNotAllowed,
    /// Oversized, truncated or unparseable request
    BadRequest,
}

impl RequestKind {
    /// Status code and reason phrase
    pub fn status(&self) -> (u16, &'static str) {
        match self {
            RequestKind::State => (200, "OK"),
            RequestKind::NotFound => (404, "Not Found"),
            RequestKind::MethodNotAllowed => (405, "Method Not Allowed"),
            RequestKind::BadRequest => (400, "Bad Request"),
        }
    }

    /// Value of the `error` field for non-state responses
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            RequestKind::State => None,
            RequestKind::NotFound => Some("not_found"),
            RequestKind::MethodNotAllowed => Some("method_not_allowed"),
            RequestKind::BadRequest => Some("bad_request"),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Read a request head from `reader`.
///
/// Stops at the first `\r\n\r\n`, at end of stream, or once [`MAX_REQUEST_BYTES`]
/// have been read. The returned bytes may therefore be partial; classification
/// decides what that means.
pub async fn read_request_head<R>(reader: &mut R) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut head = Vec::with_capacity(512);
    let mut chunk = [0u8; 1024];

    while head.len() < MAX_REQUEST_BYTES {
        let want = chunk.len().min(MAX_REQUEST_BYTES - head.len());
        let n = reader.read(&mut chunk[..want]).await?;
        if n == 0 {
            break;
        }
        // Resume the terminator search a few bytes back in case it straddles reads
        let search_from = head.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
        head.extend_from_slice(&chunk[..n]);
        if find(&head[search_from..], HEADER_TERMINATOR).is_some() {
            break;
        }
    }

    Ok(head)
}

/// Classify a request head.
///
/// The request line is `METHOD TARGET [VERSION]`; when a version is present it
/// must start with `HTTP/`. Bytes without any line terminator, or more than
/// [`MAX_REQUEST_BYTES`] without the end of the head, are a bad request.
pub fn classify_request(head: &[u8]) -> RequestKind {
    if head.len() >= MAX_REQUEST_BYTES && find(head, HEADER_TERMINATOR).is_none() {
        return RequestKind::BadRequest;
    }

    let Some(line_end) = head.iter().position(|&b| b == b'\n') else {
        return RequestKind::BadRequest;
    };
    let Ok(line) = std::str::from_utf8(&head[..line_end]) else {
        return RequestKind::BadRequest;
    };
    let line = line.strip_suffix('\r').unwrap_or(line);

    let mut parts = line.split(' ').filter(|p| !p.is_empty());
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return RequestKind::BadRequest;
    };
    match (parts.next(), parts.next()) {
        (None, None) => {}
        (Some(version), None) if version.starts_with("HTTP/") => {}
        _ => return RequestKind::BadRequest,
    }

    if !is_method_token(method) {
        return RequestKind::BadRequest;
    }
    // Asterisk-form (`OPTIONS * HTTP/1.1`) only pairs with methods other than GET
    let asterisk = target == "*" && method != "GET";
    if !target.starts_with('/') && !asterisk {
        return RequestKind::BadRequest;
    }
    if method != "GET" {
        return RequestKind::MethodNotAllowed;
    }

    let path = target
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(target);
    if path == "/" {
        RequestKind::State
    } else {
        RequestKind::NotFound
    }
}

/// Render a complete `Connection: close` response around a JSON body
pub fn render_response(kind: RequestKind, body: &str) -> Vec<u8> {
    let (code, reason) = kind.status();
    let head = format!(
        "HTTP/1.1 {code} {reason}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {len}\r\n\
         Connection: close\r\n\
         Cache-Control: no-store\r\n\
         Access-Control-Allow-Origin: *\r\n\
         \r\n",
        len = body.len()
    );

    let mut out = Vec::with_capacity(head.len() + body.len());
    out.extend_from_slice(head.as_bytes());
    out.extend_from_slice(body.as_bytes());
    out
}

/// JSON body for a non-state response
pub fn error_body(kind: RequestKind) -> String {
    let error = kind.error_code().unwrap_or("bad_request");
    serde_json::to_string(&ErrorBody { error })
        .unwrap_or_else(|_| format!("{{\"error\":\"{error}\"}}"))
}

fn is_method_token(method: &str) -> bool {
    !method.is_empty() && method.bytes().all(|b| b.is_ascii_uppercase())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
