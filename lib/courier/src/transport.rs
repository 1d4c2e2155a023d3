//! Terminal transports.
//!
//! [`HyperTransport`] puts requests on the wire through a pooled hyper
//! client. [`ServiceTransport`] ends a pipeline with any tower service,
//! which is what tests and custom stacks plug in.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use courier_core::{Body, BoxError};
use futures_util::TryStreamExt;
use http_body::Frame;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, BodyStream, Empty, Full, StreamBody};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tower::ServiceExt;
use tower::util::BoxCloneService;
use tower_service::Service;
use tracing::trace;

use crate::config::{HttpVersions, TransportConfig};
use crate::connector::https_connector;
use crate::{Error, HandlerFuture, Request, Response, Result, Transport};

type TransportBody = BoxBody<Bytes, BoxError>;

// ============================================================================
// Hyper transport
// ============================================================================

/// Transport sending requests with hyper-util, rustls and connection pooling.
///
/// The configured timeout covers the request until the response head
/// arrives; the body is streamed afterwards.
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, TransportBody>,
    config: TransportConfig,
}

impl HyperTransport {
    /// Creates a transport with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    /// Creates a transport with a custom configuration.
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        let connector = https_connector(&config);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.idle_timeout())
            .pool_max_idle_per_host(config.max_idle_per_host())
            .pool_timer(TokioTimer::new())
            .http2_only(config.http_versions() == HttpVersions::Http2Only)
            .build(connector);

        Self { inner, config }
    }

    /// Transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn build_hyper_request(request: Request) -> Result<http::Request<TransportBody>> {
        let (method, url, mut headers, content, _options) = request.into_parts();

        let body = match content {
            Some(content) => {
                let (content_headers, body) = content.into_parts();
                headers.extend(content_headers);
                body
            }
            None => Body::Empty,
        };

        let mut hyper_request = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str())
            .body(transport_body(body))
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        *hyper_request.headers_mut() = headers;

        Ok(hyper_request)
    }

    async fn execute(&self, request: Request) -> Result<Response> {
        let hyper_request = Self::build_hyper_request(request)?;
        trace!(method = %hyper_request.method(), uri = %hyper_request.uri(), "sending");

        let pending = self.inner.request(hyper_request);
        let response = match self.config.timeout() {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| Error::Timeout)?,
            None => pending.await,
        }
        .map_err(Self::map_hyper_error)?;

        let (parts, incoming) = response.into_parts();
        let body = Body::from_stream(
            BodyStream::new(incoming)
                .map_ok(|frame| frame.into_data().unwrap_or_default())
                .map_err(|err| Error::connection(err.to_string())),
        );

        Ok(Response::new(parts.status, parts.headers, body))
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: Request) -> HandlerFuture<'_> {
        Box::pin(self.execute(request))
    }
}

fn transport_body(body: Body) -> TransportBody {
    match body {
        Body::Empty => Empty::<Bytes>::new().map_err(|never| match never {}).boxed(),
        Body::Buffered(bytes) => Full::new(bytes).map_err(|never| match never {}).boxed(),
        Body::Streamed(stream) => StreamBody::new(
            stream
                .map_ok(Frame::data)
                .map_err(|err| -> BoxError { Box::new(err) }),
        )
        .boxed(),
    }
}

// ============================================================================
// Tower service transport
// ============================================================================

type BoxedService = BoxCloneService<Request, Response, Error>;

/// Transport delegating to a tower service.
///
/// The service is cloned for every request, so it must be cheap to clone.
///
/// # Example
///
/// ```ignore
/// use courier::{Response, ServiceTransport, StatusCode, tower::service_fn};
///
/// let transport = ServiceTransport::new(service_fn(|_request| async {
///     Ok(Response::new(StatusCode::NO_CONTENT, Default::default(), ""))
/// }));
/// ```
pub struct ServiceTransport {
    inner: Mutex<BoxedService>,
}

impl ServiceTransport {
    /// Wraps a service.
    pub fn new<S>(service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        Self {
            inner: Mutex::new(BoxCloneService::new(service)),
        }
    }
}

impl fmt::Debug for ServiceTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTransport").finish_non_exhaustive()
    }
}

impl Transport for ServiceTransport {
    fn send(&self, request: Request) -> HandlerFuture<'_> {
        // Lock, clone the service, and release the lock immediately
        let mut service = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Box::pin(async move { service.ready().await?.call(request).await })
    }
}

#[cfg(test)]
mod tests {
    use courier_core::{Content, Method};
    use http::{HeaderValue, StatusCode, header};
    use tower::service_fn;

    use super::*;

    #[test]
    fn hyper_request_merges_content_headers() {
        let request = Request::builder(Method::Post, "http://localhost/items".parse().expect("url"))
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .content(Content::new("{}").with_header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            ))
            .build();

        let hyper_request = HyperTransport::build_hyper_request(request).expect("request");
        assert_eq!(hyper_request.method(), http::Method::POST);
        assert_eq!(hyper_request.uri(), "http://localhost/items");
        assert_eq!(
            hyper_request.headers().get(header::CONTENT_TYPE),
            Some(&HeaderValue::from_static("application/json"))
        );
        assert!(hyper_request.headers().contains_key(header::ACCEPT));
    }

    #[tokio::test]
    async fn service_transport_calls_service() {
        let transport = ServiceTransport::new(service_fn(|request: Request| async move {
            let status = if request.url().path() == "/missing" {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::OK
            };
            Ok::<_, Error>(Response::new(status, http::HeaderMap::new(), ""))
        }));

        let request = Request::builder(Method::Get, "http://localhost/missing".parse().expect("url"))
            .build();
        let response = transport.send(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
