//! Request/response carriers and the buffered response writer.

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

/// The HTTP request type handed to a chain.
///
/// The body is fully buffered before dispatch.
pub type Request = http::Request<Bytes>;

/// The HTTP response type produced by a chain.
pub type Response = http::Response<Full<Bytes>>;

/// Buffered response state mutated by handlers.
///
/// Nothing reaches the client until the chain finishes and the writer is
/// converted with [`ResponseWriter::into_response`].
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    written: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            written: false,
        }
    }
}

impl ResponseWriter {
    /// Creates a writer with status 200 and no headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status without committing the response.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Sets the status and marks the response as written.
    pub fn write_header(&mut self, status: StatusCode) {
        self.status = status;
        self.written = true;
    }

    /// Returns the response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the response headers for modification.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Replaces a header value.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Appends bytes to the body and marks the response as written.
    pub fn write(&mut self, data: &[u8]) {
        self.body.extend_from_slice(data);
        self.written = true;
    }

    /// Replaces the body with `data` under `content_type`.
    pub fn send(&mut self, status: StatusCode, content_type: &'static str, data: Bytes) {
        self.status = status;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.body.clear();
        self.body.extend_from_slice(&data);
        self.written = true;
    }

    /// Returns the buffered body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns true once a status was committed or body bytes were written.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        self.written
    }

    /// Builds the final response.
    #[must_use]
    pub fn into_response(self) -> Response {
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Builds a JSON error response.
///
/// The body has the shape `{"error": {"code": ..., "message": ...}}`.
#[must_use]
pub fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "code": code,
            "message": message
        }
    });
    let bytes = Bytes::from(body.to_string());

    let mut response = http::Response::new(Full::new(bytes.clone()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(response: Response) -> Bytes {
        match response.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        }
    }

    #[test]
    fn test_writer_defaults() {
        let writer = ResponseWriter::new();
        assert_eq!(writer.status(), StatusCode::OK);
        assert!(!writer.is_written());
        assert!(writer.body().is_empty());
    }

    #[test]
    fn test_set_status_does_not_commit() {
        let mut writer = ResponseWriter::new();
        writer.set_status(StatusCode::CREATED);
        assert!(!writer.is_written());

        writer.write_header(StatusCode::ACCEPTED);
        assert!(writer.is_written());
        assert_eq!(writer.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_write_appends() {
        let mut writer = ResponseWriter::new();
        writer.write(b"hello, ");
        writer.write(b"world");
        assert!(writer.is_written());

        let response = writer.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, Bytes::from_static(b"hello, world"));
    }

    #[tokio::test]
    async fn test_send_replaces_body() {
        let mut writer = ResponseWriter::new();
        writer.write(b"draft");
        writer.send(
            StatusCode::CREATED,
            "text/plain; charset=utf-8",
            Bytes::from_static(b"final"),
        );

        let response = writer.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_of(response).await, Bytes::from_static(b"final"));
    }

    #[tokio::test]
    async fn test_json_error_response() {
        let response = json_error(StatusCode::NOT_FOUND, "ROUTE_NOT_FOUND", "no route");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body: serde_json::Value = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(body["error"]["code"], "ROUTE_NOT_FOUND");
        assert_eq!(body["error"]["message"], "no route");
    }
}
