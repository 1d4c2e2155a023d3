//! Headers inspection middleware.
//!
//! Lets callers see the headers that actually went over the wire, after every
//! other stage had its say, and the headers that came back.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use courier::middleware::HeadersInspectionOption;
//!
//! let inspection = Arc::new(HeadersInspectionOption::new().inspect_response_headers(true));
//! request_information.options_mut().add_shared(Arc::clone(&inspection));
//! adapter.send_no_content(request_information, None).await?;
//!
//! let etag = inspection.response_headers().get("etag").cloned();
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use courier_core::{OptionKind, RequestOption};
use http::HeaderMap;
use tracing::{Instrument, debug_span};

use crate::{HandlerFuture, HandlerKind, Middleware, Next, Request};

/// Configuration and capture maps of [`HeadersInspectionHandler`].
#[derive(Debug, Default)]
pub struct HeadersInspectionOption {
    inspect_request_headers: bool,
    inspect_response_headers: bool,
    request_headers: Mutex<HeaderMap>,
    response_headers: Mutex<HeaderMap>,
}

impl HeadersInspectionOption {
    /// Option inspecting nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures outgoing headers.
    #[must_use]
    pub const fn inspect_request_headers(mut self, inspect: bool) -> Self {
        self.inspect_request_headers = inspect;
        self
    }

    /// Captures incoming headers.
    #[must_use]
    pub const fn inspect_response_headers(mut self, inspect: bool) -> Self {
        self.inspect_response_headers = inspect;
        self
    }

    /// Returns `true` if outgoing headers are captured.
    #[must_use]
    pub const fn inspects_request_headers(&self) -> bool {
        self.inspect_request_headers
    }

    /// Returns `true` if incoming headers are captured.
    #[must_use]
    pub const fn inspects_response_headers(&self) -> bool {
        self.inspect_response_headers
    }

    /// Captured request headers, content headers included.
    #[must_use]
    pub fn request_headers(&self) -> HeaderMap {
        self.request_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Captured response headers, content headers included.
    #[must_use]
    pub fn response_headers(&self) -> HeaderMap {
        self.response_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn capture_request(&self, request: &Request) {
        let mut captured = self
            .request_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        copy_headers(request.headers(), &mut captured);
        if let Some(content) = request.content() {
            copy_headers(content.headers(), &mut captured);
        }
    }

    fn capture_response(&self, headers: &HeaderMap) {
        let mut captured = self
            .response_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        copy_headers(headers, &mut captured);
    }
}

impl RequestOption for HeadersInspectionOption {
    const KIND: OptionKind = OptionKind::HeadersInspection;
}

/// Copies every header of `from`, replacing the values of names already in `into`.
fn copy_headers(from: &HeaderMap, into: &mut HeaderMap) {
    for name in from.keys() {
        into.remove(name);
        for value in from.get_all(name) {
            into.append(name.clone(), value.clone());
        }
    }
}

/// Middleware copying request and response headers into a
/// [`HeadersInspectionOption`]. Headers are observed, never changed.
#[derive(Debug, Default)]
pub struct HeadersInspectionHandler {
    option: Arc<HeadersInspectionOption>,
}

impl HeadersInspectionHandler {
    /// Creates the handler with its default configuration.
    #[must_use]
    pub fn new(option: HeadersInspectionOption) -> Self {
        Self::from_shared(Arc::new(option))
    }

    /// Creates the handler from a shared configuration, keeping the caller's
    /// handle on the capture maps.
    #[must_use]
    pub const fn from_shared(option: Arc<HeadersInspectionOption>) -> Self {
        Self { option }
    }

    /// Default configuration.
    #[must_use]
    pub fn option(&self) -> &HeadersInspectionOption {
        &self.option
    }
}

impl Middleware for HeadersInspectionHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::HeadersInspection
    }

    fn send<'a>(&'a self, request: Request, next: Next<'a>) -> HandlerFuture<'a> {
        Box::pin(
            async move {
                let option = request.options().get_or(&self.option)?;
                if option.inspect_request_headers {
                    option.capture_request(&request);
                }

                let response = next.run(request).await?;
                if option.inspect_response_headers {
                    option.capture_response(response.headers());
                }
                Ok(response)
            }
            .instrument(debug_span!("headers_inspection_handler")),
        )
    }
}

#[cfg(test)]
mod tests {
    use courier_core::{Content, Error, Method};
    use http::{HeaderValue, StatusCode, header};

    use super::*;
    use crate::testing::RecordingTransport;
    use crate::{DelegatingHandler, Handler};

    fn request() -> Request {
        Request::builder(Method::Post, "http://localhost/".parse().expect("url"))
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .content(
                Content::new("{}")
                    .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            )
            .build()
    }

    fn response_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ETAG, HeaderValue::from_static("\"v1\""));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers
    }

    #[tokio::test]
    async fn captures_request_and_content_headers() {
        let option = Arc::new(HeadersInspectionOption::new().inspect_request_headers(true));
        let handler = DelegatingHandler::with_inner(
            HeadersInspectionHandler::from_shared(Arc::clone(&option)),
            Handler::transport(RecordingTransport::ok()),
        );

        handler.send(request()).await.expect("response");

        let captured = option.request_headers();
        assert_eq!(captured.get(header::ACCEPT), Some(&HeaderValue::from_static("application/json")));
        assert_eq!(
            captured.get(header::CONTENT_TYPE),
            Some(&HeaderValue::from_static("application/json"))
        );
        assert!(option.response_headers().is_empty());
    }

    #[tokio::test]
    async fn captures_response_headers_from_request_option() {
        let handler = DelegatingHandler::with_inner(
            HeadersInspectionHandler::default(),
            Handler::transport(RecordingTransport::respond(StatusCode::OK, response_headers())),
        );
        let option = Arc::new(HeadersInspectionOption::new().inspect_response_headers(true));
        let mut request = request();
        request.options_mut().add_shared(Arc::clone(&option));

        handler.send(request).await.expect("response");

        let captured = option.response_headers();
        assert_eq!(captured.get(header::ETAG), Some(&HeaderValue::from_static("\"v1\"")));
        assert_eq!(captured.get(header::CONTENT_TYPE), Some(&HeaderValue::from_static("text/plain")));
        assert!(option.request_headers().is_empty());
    }

    #[tokio::test]
    async fn failure_captures_no_response_headers() {
        let option = Arc::new(
            HeadersInspectionOption::new()
                .inspect_request_headers(true)
                .inspect_response_headers(true),
        );
        let handler = DelegatingHandler::new(HeadersInspectionHandler::from_shared(Arc::clone(&option)));

        let result = handler.send(request()).await;

        assert!(matches!(result, Err(Error::NoResponse)));
        assert!(!option.request_headers().is_empty());
        assert!(option.response_headers().is_empty());
    }

    #[test]
    fn copy_replaces_existing_values() {
        let mut into = HeaderMap::new();
        into.append(header::ACCEPT, HeaderValue::from_static("text/plain"));
        let mut from = HeaderMap::new();
        from.append(header::ACCEPT, HeaderValue::from_static("application/json"));
        from.append(header::ACCEPT, HeaderValue::from_static("application/xml"));

        copy_headers(&from, &mut into);

        let values: Vec<_> = into.get_all(header::ACCEPT).iter().collect();
        assert_eq!(values, vec!["application/json", "application/xml"]);
    }
}
