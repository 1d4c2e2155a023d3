//! Wire responses.
//!
//! A [`Response`] owns its body until it is read, drained or handed to the
//! caller as a stream. Whoever ends up with the response is responsible for
//! consuming the body so the underlying connection can be reused.

use bytes::Bytes;
use http::{HeaderMap, StatusCode, header};

use crate::{Body, Result, StreamingBody};

/// HTTP response with status, headers, and body.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl Response {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Body>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers, content headers included.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// First value of a header, if it is valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Media type of the body: lowercased, without parameters.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        let value = self.headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
        let media_type = value.split(';').next()?.trim();
        (!media_type.is_empty()).then(|| media_type.to_ascii_lowercase())
    }

    /// Returns `true` when the response is known to carry no body.
    #[must_use]
    pub fn has_empty_body(&self) -> bool {
        let zero_length = self
            .header(header::CONTENT_LENGTH.as_str())
            .is_some_and(|length| length.trim() == "0");
        zero_length || self.body.is_empty()
    }

    /// Status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Status is 3xx.
    #[must_use]
    pub fn is_redirection(&self) -> bool {
        self.status.is_redirection()
    }

    /// Status is 4xx.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Status is 5xx.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Reads the whole body, keeping it buffered in the response.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the body fails.
    pub async fn bytes(&mut self) -> Result<Bytes> {
        let body = std::mem::take(&mut self.body);
        let bytes = body.collect().await?;
        self.body = Body::Buffered(bytes.clone());
        Ok(bytes)
    }

    /// Reads and discards the remaining body.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the body fails.
    pub async fn drain(self) -> Result<()> {
        self.body.drain().await
    }

    /// Consume into the body.
    #[must_use]
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Consume into a stream of body chunks.
    #[must_use]
    pub fn into_stream(self) -> StreamingBody {
        self.body.into_stream()
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Body) {
        (self.status, self.headers, self.body)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;
    use http::HeaderValue;

    use super::*;

    fn json_headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn response_basic() {
        let response = Response::new(
            StatusCode::OK,
            json_headers("application/json"),
            Bytes::from(r#"{"id":1}"#),
        );

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(response.is_success());
        assert!(!response.is_client_error());
        assert!(!response.is_server_error());
    }

    #[test]
    fn response_status_checks() {
        let response = Response::new(StatusCode::MOVED_PERMANENTLY, HeaderMap::new(), Body::Empty);
        assert!(response.is_redirection());

        let response = Response::new(StatusCode::NOT_FOUND, HeaderMap::new(), Body::Empty);
        assert!(response.is_client_error());

        let response = Response::new(StatusCode::BAD_GATEWAY, HeaderMap::new(), Body::Empty);
        assert!(response.is_server_error());
    }

    #[test]
    fn content_type_is_normalized() {
        let response = Response::new(
            StatusCode::OK,
            json_headers("Application/JSON; charset=utf-8"),
            Body::Empty,
        );
        assert_eq!(response.content_type().as_deref(), Some("application/json"));

        let response = Response::new(StatusCode::OK, HeaderMap::new(), Body::Empty);
        assert_eq!(response.content_type(), None);
    }

    #[test]
    fn empty_body_detection() {
        let response = Response::new(StatusCode::OK, HeaderMap::new(), Body::Empty);
        assert!(response.has_empty_body());

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        let response = Response::new(StatusCode::OK, headers, Body::from_stream(stream::empty()));
        assert!(response.has_empty_body());

        let response = Response::new(StatusCode::OK, HeaderMap::new(), Body::from("data"));
        assert!(!response.has_empty_body());
    }

    #[tokio::test]
    async fn bytes_buffers_streamed_body() {
        let chunks = vec![Ok(Bytes::from("hel")), Ok(Bytes::from("lo"))];
        let mut response = Response::new(
            StatusCode::OK,
            HeaderMap::new(),
            Body::from_stream(stream::iter(chunks)),
        );

        assert_eq!(response.bytes().await.expect("read"), Bytes::from("hello"));
        assert_eq!(response.bytes().await.expect("read again"), Bytes::from("hello"));
        assert!(response.body().is_replayable());
    }
}
