//! Pipeline-backed HTTP client.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use courier_core::{RequestOption, RequestOptions};
use tower_service::Service;

use crate::config::{HttpVersions, TransportConfig};
use crate::pipeline::{chain_handlers, create_default_handlers, default_handlers};
use crate::transport::{HyperTransport, ServiceTransport};
use crate::{
    DelegatingHandler, Error, Handler, Middleware, Request, Response, Result, Transport,
};

/// Future type for the Tower [`Service`] implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// HTTP client running requests through a handler chain.
///
/// Cloning is cheap; clones share the chain and the connection pool.
///
/// # Example
///
/// ```ignore
/// use courier::Client;
/// use std::time::Duration;
///
/// // Default pipeline over the hyper transport
/// let client = Client::new();
///
/// // Default pipeline with a shorter timeout and fewer retries
/// let client = Client::builder()
///     .timeout(Duration::from_secs(30))
///     .option(RetryHandlerOption::new().max_retry(1))
///     .build()?;
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    entry: Arc<Handler>,
}

impl Client {
    /// Creates a client with the default pipeline and transport.
    #[must_use]
    pub fn new() -> Self {
        let terminal = Handler::transport(HyperTransport::new());
        match chain_handlers(Some(terminal), default_handlers()) {
            Some(entry) => Self::from_handler(Handler::Delegating(entry)),
            // the default list is never empty
            None => Self::from_handler(Handler::transport(HyperTransport::new())),
        }
    }

    /// Creates a client builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Creates a client from an already linked chain.
    #[must_use]
    pub fn from_handler(entry: Handler) -> Self {
        Self {
            entry: Arc::new(entry),
        }
    }

    /// First stage of the chain.
    #[must_use]
    pub fn entry(&self) -> &Handler {
        &self.entry
    }

    /// Sends a request through the chain.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a stage or the transport.
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.entry.send(request).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request> for Client {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let entry = Arc::clone(&self.entry);
        Box::pin(async move { entry.send(request).await })
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Client`].
///
/// Without custom handlers the default pipeline is used, configured by the
/// options given to [`ClientBuilder::option`]. Without a custom transport a
/// [`HyperTransport`] is created from the [`TransportConfig`] settings.
#[derive(Default)]
pub struct ClientBuilder {
    config: TransportConfig,
    options: RequestOptions,
    handlers: Vec<DelegatingHandler>,
    transport: Option<Handler>,
}

impl ClientBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the settings of the hyper transport.
    #[must_use]
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the request timeout of the hyper transport.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_timeout(Some(timeout));
        self
    }

    /// Sets the connect timeout of the hyper transport.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_connect_timeout(Some(timeout));
        self
    }

    /// Restricts the HTTP versions of the hyper transport.
    #[must_use]
    pub fn http_versions(mut self, versions: HttpVersions) -> Self {
        self.config = self.config.with_http_versions(versions);
        self
    }

    /// Configures a stage of the default pipeline.
    #[must_use]
    pub fn option<O: RequestOption>(mut self, option: O) -> Self {
        self.options.add(option);
        self
    }

    /// Configures a stage of the default pipeline with a shared option.
    #[must_use]
    pub fn shared_option<O: RequestOption>(mut self, option: Arc<O>) -> Self {
        self.options.add_shared(option);
        self
    }

    /// Appends a middleware to a custom chain.
    ///
    /// Once a handler is added, the default pipeline is not used.
    #[must_use]
    pub fn handler(mut self, middleware: impl Middleware) -> Self {
        self.handlers.push(DelegatingHandler::new(middleware));
        self
    }

    /// Appends an already built delegating handler to a custom chain.
    #[must_use]
    pub fn delegating_handler(mut self, handler: DelegatingHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Ends the chain with a custom transport.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Handler::transport(transport));
        self
    }

    /// Ends the chain with a tower service.
    #[must_use]
    pub fn service<S>(self, service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        self.transport(ServiceTransport::new(service))
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OptionTypeMismatch`] if a default-pipeline option is
    /// stored with an unexpected type, and [`Error::Configuration`] for
    /// invalid transport settings when no custom transport is given.
    pub fn build(self) -> Result<Client> {
        let terminal = match self.transport {
            Some(transport) => transport,
            None => {
                self.config.validate()?;
                Handler::transport(HyperTransport::with_config(self.config))
            }
        };

        let handlers = if self.handlers.is_empty() {
            create_default_handlers(&self.options)?
        } else {
            self.handlers
        };

        let entry = if handlers.is_empty() {
            terminal
        } else {
            chain_handlers(Some(terminal), handlers)
                .map(Handler::Delegating)
                .ok_or_else(|| Error::configuration("empty handler chain"))?
        };

        Ok(Client::from_handler(entry))
    }
}

#[cfg(test)]
mod tests {
    use courier_core::Method;
    use http::StatusCode;

    use super::*;
    use crate::HandlerKind;
    use crate::middleware::{LoggingHandler, RetryHandler, RetryHandlerOption};
    use crate::pipeline::default_handler_kinds;
    use crate::testing::RecordingTransport;

    fn kinds(client: &Client) -> Vec<HandlerKind> {
        let mut kinds = Vec::new();
        let mut current = Some(client.entry());
        while let Some(handler) = current.and_then(Handler::as_delegating) {
            kinds.push(handler.kind());
            current = handler.inner();
        }
        kinds
    }

    #[test]
    fn default_client_uses_default_pipeline() {
        let client = Client::builder()
            .transport(RecordingTransport::ok())
            .build()
            .expect("client");

        assert_eq!(kinds(&client), default_handler_kinds());
    }

    #[test]
    fn custom_handlers_replace_default_pipeline() {
        let client = Client::builder()
            .handler(LoggingHandler::new())
            .transport(RecordingTransport::ok())
            .build()
            .expect("client");

        assert_eq!(kinds(&client), vec![HandlerKind::Logging]);
    }

    #[test]
    fn option_configures_default_stage() {
        let client = Client::builder()
            .option(RetryHandlerOption::new().max_retry(1))
            .transport(RecordingTransport::ok())
            .build()
            .expect("client");

        let retry = client
            .entry()
            .as_delegating()
            .and_then(DelegatingHandler::inner)
            .and_then(Handler::as_delegating)
            .and_then(DelegatingHandler::middleware::<RetryHandler>)
            .expect("retry handler");
        assert_eq!(retry.option().max_retries(), 1);
    }

    #[tokio::test]
    async fn new_client_has_default_pipeline() {
        assert_eq!(kinds(&Client::new()), default_handler_kinds());
    }

    #[test]
    fn invalid_transport_settings_fail_build() {
        let result = Client::builder().timeout(Duration::ZERO).build();
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn custom_transport_skips_transport_settings() {
        let result = Client::builder()
            .timeout(Duration::ZERO)
            .transport(RecordingTransport::ok())
            .build();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn sends_through_chain() {
        let transport = RecordingTransport::ok();
        let client = Client::builder()
            .transport(transport.clone())
            .build()
            .expect("client");

        let request = Request::builder(Method::Get, "http://localhost/ping".parse().expect("url"))
            .build();
        let response = client.send(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(transport.urls(), vec!["http://localhost/ping".to_string()]);
    }
}
