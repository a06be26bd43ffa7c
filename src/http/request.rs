//! HTTP/1.1 request parsing using the [`httparse`] crate.

use std::net::SocketAddr;

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, Method};

/// Errors that can occur while parsing an HTTP/1.1 request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete — more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid Content-Length header: {value:?}")]
    InvalidContentLength { value: String },

    #[error("declared body of {content_length} bytes does not fit in memory")]
    TooLarge { content_length: usize },
}

/// Result of feeding a buffer to [`Request::parse`] once the head is complete.
#[derive(Debug)]
pub struct Parsed {
    pub request: Request,
    /// Offset of the first body byte in the input buffer.
    pub body_offset: usize,
    /// Total bytes this request occupies once its body has fully arrived.
    pub total_len: usize,
}

impl Parsed {
    /// Returns `true` if `buffered` bytes cover the whole body.
    pub fn is_complete(&self, buffered: usize) -> bool {
        buffered >= self.total_len
    }
}

/// A parsed HTTP/1.1 request.
///
/// # Examples
///
/// ```
/// use vitrina::http::Request;
///
/// let raw = b"POST /api/data?dry=1 HTTP/1.1\r\nHost: localhost\r\n\
///             Content-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
/// let parsed = Request::parse(raw).unwrap();
/// let request = parsed.request;
///
/// assert_eq!(request.method().as_str(), "POST");
/// assert_eq!(request.path(), "/api/data");
/// assert!(request.is_json());
/// assert_eq!(&request.body()[..], b"{}");
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    /// HTTP minor version: 0 for HTTP/1.0, 1 for HTTP/1.1.
    version: u8,
    headers: Headers,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
}

impl Request {
    const MAX_HEADERS: usize = 64;

    /// Parses a request head from `buf` and slices out as much of the body as
    /// is already buffered, bounded by `Content-Length`.
    ///
    /// The caller checks [`Parsed::is_complete`] and re-parses once more bytes
    /// arrive; bytes past `total_len` belong to the next pipelined request.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`] — the head is not fully buffered yet.
    /// - [`RequestError::Parse`] — the head is malformed.
    /// - [`RequestError::MissingField`] — method, path or version is absent.
    /// - [`RequestError::InvalidContentLength`] — `Content-Length` is not a number.
    /// - [`RequestError::TooLarge`] — `Content-Length` overflows the addressable size.
    pub fn parse(buf: &[u8]) -> Result<Parsed, RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw_req = httparse::Request::new(&mut headers);

        let body_offset = match raw_req.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method: Method = match raw_req
            .method
            .ok_or(RequestError::MissingField { field: "method" })?
            .parse()
        {
            Ok(method) => method,
            Err(never) => match never {},
        };

        let raw_path = raw_req
            .path
            .ok_or(RequestError::MissingField { field: "path" })?;

        let path = raw_path
            .split_once('?')
            .map_or(raw_path, |(path, _query)| path)
            .to_owned();

        let version = raw_req
            .version
            .ok_or(RequestError::MissingField { field: "version" })?;

        let mut header_map = Headers::with_capacity(raw_req.headers.len());
        for header in raw_req.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                header_map.insert(header.name, value);
            }
        }

        let content_length = match header_map.get("content-length") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| RequestError::InvalidContentLength {
                    value: value.to_owned(),
                })?,
            None => 0,
        };

        let total_len = body_offset
            .checked_add(content_length)
            .ok_or(RequestError::TooLarge { content_length })?;
        let body_end = total_len.min(buf.len());
        let body = Bytes::copy_from_slice(&buf[body_offset..body_end]);

        Ok(Parsed {
            request: Self {
                method,
                path,
                version,
                headers: header_map,
                body,
                remote_addr: None,
            },
            body_offset,
            total_len,
        })
    }

    /// Attaches the peer address of the connection the request arrived on.
    #[must_use]
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without the query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the HTTP minor version number (0 = HTTP/1.0, 1 = HTTP/1.1).
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Returns the raw `Content-Type` header value, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// Returns `true` if the body is declared as JSON.
    ///
    /// Accepts `application/json` and any `application/*+json` media type,
    /// ignoring parameters such as `charset`.
    pub fn is_json(&self) -> bool {
        let Some(content_type) = self.content_type() else {
            return false;
        };
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
    }

    /// Returns `true` if the connection should be kept alive after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive. HTTP/1.0 defaults to close unless
    /// `Connection: keep-alive` is explicitly set.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(conn) => conn.eq_ignore_ascii_case("keep-alive"),
            None => self.version == 1,
        }
    }

    /// Client address as reported by `X-Forwarded-For`, falling back to the
    /// TCP peer.
    pub fn client_ip(&self) -> Option<String> {
        match self.headers.get("x-forwarded-for") {
            Some(forwarded) => Some(forwarded.to_owned()),
            None => self.remote_addr.map(|addr| addr.ip().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let parsed = Request::parse(raw).unwrap();
        assert_eq!(parsed.request.method(), &Method::Get);
        assert_eq!(parsed.request.path(), "/");
        assert_eq!(parsed.request.version(), 1);
        assert_eq!(parsed.body_offset, raw.len());
        assert!(parsed.is_complete(raw.len()));
    }

    #[test]
    fn query_string_is_not_part_of_the_path() {
        let raw = b"GET /api/test?q=rust+lang&flag HTTP/1.1\r\nHost: x\r\n\r\n";
        let req = Request::parse(raw).unwrap().request;
        assert_eq!(req.path(), "/api/test");
    }

    #[test]
    fn incomplete_head() {
        let raw = b"GET / HTTP/1.1\r\nHost:";
        assert!(matches!(Request::parse(raw), Err(RequestError::Incomplete)));
    }

    #[test]
    fn partial_body_is_not_complete() {
        let raw = b"POST /api/data HTTP/1.1\r\nContent-Length: 10\r\n\r\nhello";
        let parsed = Request::parse(raw).unwrap();
        assert!(!parsed.is_complete(raw.len()));
        assert_eq!(parsed.total_len, parsed.body_offset + 10);
    }

    #[test]
    fn body_stops_at_content_length() {
        let raw = b"POST /a HTTP/1.1\r\nContent-Length: 2\r\n\r\nokGET /b HTTP/1.1\r\n\r\n";
        let parsed = Request::parse(raw).unwrap();
        assert_eq!(&parsed.request.body()[..], b"ok");
        assert!(parsed.is_complete(raw.len()));
    }

    #[test]
    fn bad_content_length() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: lots\r\n\r\n";
        assert!(matches!(
            Request::parse(raw),
            Err(RequestError::InvalidContentLength { .. })
        ));
    }

    #[test]
    fn huge_content_length_is_too_large() {
        let raw = format!("POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n", usize::MAX);
        assert!(matches!(
            Request::parse(raw.as_bytes()),
            Err(RequestError::TooLarge { content_length }) if content_length == usize::MAX
        ));
    }

    #[test]
    fn json_content_types() {
        let parse = |ct: &str| {
            let raw = format!("POST / HTTP/1.1\r\nContent-Type: {ct}\r\n\r\n");
            Request::parse(raw.as_bytes()).unwrap().request
        };
        assert!(parse("application/json").is_json());
        assert!(parse("Application/JSON; charset=utf-8").is_json());
        assert!(parse("application/vnd.api+json").is_json());
        assert!(!parse("text/plain").is_json());
        assert!(!parse("application/x-www-form-urlencoded").is_json());
    }

    #[test]
    fn keep_alive_rules() {
        let req = |raw: &[u8]| Request::parse(raw).unwrap().request;
        assert!(req(b"GET / HTTP/1.1\r\n\r\n").is_keep_alive());
        assert!(!req(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").is_keep_alive());
        assert!(!req(b"GET / HTTP/1.0\r\n\r\n").is_keep_alive());
    }

    #[test]
    fn client_ip_prefers_forwarded_header() {
        let addr: SocketAddr = "192.168.1.7:4000".parse().unwrap();
        let plain = Request::parse(b"GET / HTTP/1.1\r\n\r\n")
            .unwrap()
            .request
            .with_remote_addr(addr);
        assert_eq!(plain.client_ip().as_deref(), Some("192.168.1.7"));

        let forwarded = Request::parse(b"GET / HTTP/1.1\r\nX-Forwarded-For: 203.0.113.9\r\n\r\n")
            .unwrap()
            .request
            .with_remote_addr(addr);
        assert_eq!(forwarded.client_ip().as_deref(), Some("203.0.113.9"));
    }
}
