//! Minimal HTTP/1.1 request parsing and response writing.
//!
//! Handles one request per connection with a `Content-Length` body. Chunked
//! bodies and keep-alive are not supported; every response closes the
//! connection.

use std::io::{self, BufRead, Read, Write};

use serde::Serialize;
use thiserror::Error;

const MAX_HEADER_LINE: usize = 8 * 1024;
const MAX_HEADERS: usize = 100;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("request body of {actual} bytes exceeds limit of {limit}")]
    BodyTooLarge { limit: usize, actual: usize },
}

/// Parsed request line and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Request target without its query string.
    pub path: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl Response {
    /// Response with no body.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// JSON response; serialization failure degrades to a bare 500.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: Some("application/json"),
                body,
            },
            Err(err) => {
                tracing::error!("Failed to serialize response body: {err}");
                Self::empty(500)
            }
        }
    }
}

/// Read one request, enforcing `max_body` on the declared body length.
pub fn read_request(reader: &mut impl BufRead, max_body: usize) -> Result<Request, HttpError> {
    let request_line = read_line(reader)?
        .ok_or_else(|| HttpError::Malformed("connection closed before request line".into()))?;
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(HttpError::Malformed(format!(
            "bad request line {request_line:?}"
        )));
    };
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::Malformed(format!("unsupported version {version}")));
    }
    let path = target.split('?').next().unwrap_or(target).to_string();
    let method = method.to_string();

    let mut content_length = 0usize;
    let mut header_count = 0usize;
    loop {
        let line = read_line(reader)?
            .ok_or_else(|| HttpError::Malformed("connection closed inside headers".into()))?;
        if line.is_empty() {
            break;
        }
        header_count += 1;
        if header_count > MAX_HEADERS {
            return Err(HttpError::Malformed("too many headers".into()));
        }
        let Some((name, value)) = line.split_once(':') else {
            return Err(HttpError::Malformed(format!("bad header line {line:?}")));
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value
                .parse()
                .map_err(|_| HttpError::Malformed(format!("bad Content-Length {value:?}")))?;
        } else if name.eq_ignore_ascii_case("transfer-encoding")
            && !value.eq_ignore_ascii_case("identity")
        {
            return Err(HttpError::Malformed(format!(
                "unsupported Transfer-Encoding {value:?}"
            )));
        }
    }

    if content_length > max_body {
        return Err(HttpError::BodyTooLarge {
            limit: max_body,
            actual: content_length,
        });
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;
    Ok(Request { method, path, body })
}

/// Write a complete response and ask the client to close the connection.
pub fn write_response(writer: &mut impl Write, response: &Response) -> io::Result<()> {
    write!(
        writer,
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        reason_phrase(response.status),
        response.body.len()
    )?;
    if let Some(content_type) = response.content_type {
        write!(writer, "Content-Type: {content_type}\r\n")?;
    }
    writer.write_all(b"\r\n")?;
    writer.write_all(&response.body)?;
    writer.flush()
}

fn read_line(reader: &mut impl BufRead) -> Result<Option<String>, HttpError> {
    let mut buf = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_HEADER_LINE as u64 + 1)
        .read_until(b'\n', &mut buf)?;
    if read == 0 {
        return Ok(None);
    }
    if buf.len() > MAX_HEADER_LINE {
        return Err(HttpError::Malformed("header line too long".into()));
    }
    if buf.last() != Some(&b'\n') {
        return Err(HttpError::Malformed("truncated header line".into()));
    }
    let line = String::from_utf8(buf)
        .map_err(|_| HttpError::Malformed("header line is not UTF-8".into()))?;
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str, max_body: usize) -> Result<Request, HttpError> {
        read_request(&mut raw.as_bytes(), max_body)
    }

    #[test]
    fn parses_post_with_body() {
        let raw = "POST /predict?debug=1 HTTP/1.1\r\nHost: x\r\nContent-Length: 4\r\n\r\nabcdEXTRA";
        let request = parse(raw, 64).unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/predict");
        assert_eq!(request.body, b"abcd");
    }

    #[test]
    fn missing_content_length_means_empty_body() {
        let request = parse("GET / HTTP/1.0\r\n\r\n", 64).unwrap();
        assert!(request.body.is_empty());
    }

    #[test]
    fn enforces_body_limit_before_reading() {
        let raw = "POST /predict HTTP/1.1\r\nContent-Length: 1000\r\n\r\n";
        assert!(matches!(
            parse(raw, 10),
            Err(HttpError::BodyTooLarge { limit: 10, actual: 1000 })
        ));
    }

    #[test]
    fn rejects_garbage_and_chunked_bodies() {
        assert!(matches!(parse("hello\r\n\r\n", 10), Err(HttpError::Malformed(_))));
        assert!(matches!(parse("", 10), Err(HttpError::Malformed(_))));
        let chunked = "POST /predict HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n";
        assert!(matches!(parse(chunked, 10), Err(HttpError::Malformed(_))));
        let bad_len = "POST /predict HTTP/1.1\r\nContent-Length: lots\r\n\r\n";
        assert!(matches!(parse(bad_len, 10), Err(HttpError::Malformed(_))));
    }

    #[test]
    fn short_body_is_io_error() {
        let raw = "POST /predict HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc";
        assert!(matches!(parse(raw, 64), Err(HttpError::Io(_))));
    }

    #[test]
    fn writes_status_headers_and_body() {
        let mut out = Vec::new();
        write_response(&mut out, &Response::json(200, &serde_json::json!({"ok": true}))).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: application/json\r\n"));
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.ends_with("\r\n\r\n{\"ok\":true}"));
    }

    #[test]
    fn empty_response_has_zero_length() {
        let mut out = Vec::new();
        write_response(&mut out, &Response::empty(404)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Length: 0\r\n"));
        assert!(!text.contains("Content-Type"));
    }
}
