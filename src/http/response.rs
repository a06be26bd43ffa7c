//! HTTP/1.1 response builder.
//!
//! Provides a fluent builder API for constructing responses and serializing
//! them to a byte buffer for transmission over TCP.

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use super::{Headers, StatusCode};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// Responses are `Clone` so a fully rendered handler result can be stored in
/// the response cache and replayed.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use vitrina::http::{Response, StatusCode};
///
/// let response = Response::json(StatusCode::Ok, &json!({ "status": "ok" }));
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Type: application/json\r\n"));
/// assert!(text.ends_with(r#"{"status":"ok"}"#));
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
    keep_alive: bool,
    omit_body: bool,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
            keep_alive: true,
            omit_body: false,
        }
    }

    /// Creates a JSON response from any serializable value.
    ///
    /// Serializing a `serde_json::Value` or a plain derive cannot fail; if a
    /// custom `Serialize` impl does, the error is logged and a bare 500 is
    /// returned instead.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status)
                .header("Content-Type", CONTENT_TYPE_JSON)
                .body_bytes(body),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize JSON response body");
                Self::new(StatusCode::InternalServerError)
            }
        }
    }

    /// Creates a `200 OK` HTML response.
    pub fn html(body: impl Into<String>) -> Self {
        Self::new(StatusCode::Ok)
            .header("Content-Type", CONTENT_TYPE_HTML)
            .body(body)
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a header in place, for middleware that decorates a downstream response.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Sets a header in place, replacing any value a handler already wrote.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Sets the response body from a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Controls whether `Connection: keep-alive` or `Connection: close` is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Drops the body from the wire while keeping its `Content-Length`, as a
    /// reply to `HEAD` requires.
    #[must_use]
    pub fn head_only(mut self) -> Self {
        self.omit_body = true;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the body bytes as written by the handler.
    pub fn body_ref(&self) -> &[u8] {
        &self.body
    }

    /// Serializes the response into HTTP/1.1 wire format.
    ///
    /// Adds `Content-Type: text/plain; charset=utf-8` to a non-empty body that
    /// has none, the `Connection` header, and `Content-Length` as the last
    /// header.
    pub fn into_bytes(mut self) -> BytesMut {
        let content_length = self.body.len();

        if !self.body.is_empty() && !self.headers.contains("content-type") {
            self.headers.insert("Content-Type", CONTENT_TYPE_TEXT);
        }

        let connection = if self.keep_alive {
            "keep-alive"
        } else {
            "close"
        };
        self.headers.set("Connection", connection);

        let estimated_size = 128 + self.headers.len() * 64 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );

        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }
        buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());
        buf.put(&b"\r\n"[..]);

        if !self.omit_body && !self.body.is_empty() {
            buf.put(self.body.as_slice());
        }

        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn plain_body_gets_text_content_type() {
        let s = to_string(Response::new(StatusCode::Ok).body("Hello").into_bytes());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn json_body() {
        let r = Response::json(StatusCode::BadRequest, &json!({ "error": "nope" }));
        assert_eq!(r.status(), StatusCode::BadRequest);
        assert_eq!(r.headers().get("content-type"), Some(CONTENT_TYPE_JSON));
        assert_eq!(r.body_ref(), br#"{"error":"nope"}"#);
    }

    #[test]
    fn html_body() {
        let r = Response::html("<p>hi</p>");
        assert_eq!(r.headers().get("content-type"), Some(CONTENT_TYPE_HTML));
    }

    #[test]
    fn empty_body_has_no_content_type() {
        let s = to_string(Response::new(StatusCode::NoContent).into_bytes());
        assert!(!s.contains("Content-Type"));
        assert!(s.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn set_header_overrides() {
        let mut r = Response::new(StatusCode::Ok).header("Cache-Control", "public");
        r.set_header("Cache-Control", "no-store");
        assert_eq!(r.headers().get_all("cache-control").count(), 1);
        assert_eq!(r.headers().get("cache-control"), Some("no-store"));
    }

    #[test]
    fn head_only_keeps_length_but_not_body() {
        let s = to_string(Response::html("<p>hi</p>").head_only().into_bytes());
        assert!(s.contains("Content-Length: 9\r\n"));
        assert!(s.ends_with("\r\n\r\n"));
    }

    #[test]
    fn connection_close() {
        let s = to_string(Response::new(StatusCode::Ok).keep_alive(false).into_bytes());
        assert!(s.contains("Connection: close\r\n"));
        assert!(!s.contains("keep-alive"));
    }
}
