//! Middleware contract and the linked handler chain.
//!
//! A pipeline is a singly linked list: every [`DelegatingHandler`] wraps one
//! [`Middleware`] and optionally points at the next [`Handler`], which is
//! either another delegating handler or the terminal [`Transport`].
//!
//! # Example
//!
//! ```ignore
//! use courier::{HandlerFuture, HandlerKind, Middleware, Next, Request};
//!
//! struct Tag;
//!
//! impl Middleware for Tag {
//!     fn kind(&self) -> HandlerKind {
//!         HandlerKind::Custom("tag")
//!     }
//!
//!     fn send<'a>(&'a self, mut request: Request, next: Next<'a>) -> HandlerFuture<'a> {
//!         request.headers_mut().insert("x-tag", "courier".parse().unwrap());
//!         Box::pin(next.run(request))
//!     }
//! }
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{Error, Request, Response, Result};

/// Future returned by middleware and transports.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'a>>;

/// Identifies a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// [`crate::middleware::UriReplacementHandler`].
    UriReplacement,
    /// [`crate::middleware::RetryHandler`].
    Retry,
    /// [`crate::middleware::RedirectHandler`].
    Redirect,
    /// [`crate::middleware::ParametersNameDecodingHandler`].
    ParametersNameDecoding,
    /// [`crate::middleware::UserAgentHandler`].
    UserAgent,
    /// [`crate::middleware::HeadersInspectionHandler`].
    HeadersInspection,
    /// [`crate::middleware::LoggingHandler`].
    Logging,
    /// A middleware defined outside this crate.
    Custom(&'static str),
}

impl HandlerKind {
    /// Option kind that configures this stage, if any.
    #[must_use]
    pub const fn option_kind(self) -> Option<courier_core::OptionKind> {
        use courier_core::OptionKind;

        match self {
            Self::UriReplacement => Some(OptionKind::UriReplacement),
            Self::Retry => Some(OptionKind::Retry),
            Self::Redirect => Some(OptionKind::Redirect),
            Self::ParametersNameDecoding => Some(OptionKind::ParametersNameDecoding),
            Self::UserAgent => Some(OptionKind::UserAgent),
            Self::HeadersInspection => Some(OptionKind::HeadersInspection),
            Self::Logging | Self::Custom(_) => None,
        }
    }
}

/// A pipeline stage.
///
/// The stage may rewrite the request, forward it through `next`, then
/// inspect or rewrite the response. Per-call state lives in the future,
/// never in `self`.
pub trait Middleware: Any + Send + Sync {
    /// Kind of this stage.
    fn kind(&self) -> HandlerKind;

    /// Handles one request.
    fn send<'a>(&'a self, request: Request, next: Next<'a>) -> HandlerFuture<'a>;
}

/// Terminal stage that puts the request on the wire.
pub trait Transport: Any + Send + Sync {
    /// Sends the request.
    fn send(&self, request: Request) -> HandlerFuture<'_>;
}

/// Continuation handed to a [`Middleware`].
#[derive(Clone, Copy)]
pub struct Next<'a> {
    inner: Option<&'a Handler>,
}

impl<'a> Next<'a> {
    /// Returns `true` if a stage follows.
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.inner.is_some()
    }

    /// Forwards the request to the next stage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoResponse`] when the chain ends without a transport.
    pub async fn run(self, request: Request) -> Result<Response> {
        match self.inner {
            Some(handler) => handler.send(request).await,
            None => Err(Error::NoResponse),
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("inner", &self.inner.map(Handler::describe))
            .finish()
    }
}

// ============================================================================
// Handler chain
// ============================================================================

/// A middleware together with the link to the stage after it.
pub struct DelegatingHandler {
    middleware: Box<dyn Middleware>,
    inner: Option<Box<Handler>>,
}

impl DelegatingHandler {
    /// Wraps a middleware, not linked yet.
    pub fn new(middleware: impl Middleware) -> Self {
        Self {
            middleware: Box::new(middleware),
            inner: None,
        }
    }

    /// Wraps a middleware already linked to `inner`.
    pub fn with_inner(middleware: impl Middleware, inner: Handler) -> Self {
        Self {
            middleware: Box::new(middleware),
            inner: Some(Box::new(inner)),
        }
    }

    /// Kind of the wrapped middleware.
    #[must_use]
    pub fn kind(&self) -> HandlerKind {
        self.middleware.kind()
    }

    /// Next stage, if linked.
    #[must_use]
    pub fn inner(&self) -> Option<&Handler> {
        self.inner.as_deref()
    }

    /// Links the next stage, returning the previous link.
    pub fn set_inner(&mut self, inner: Handler) -> Option<Handler> {
        self.inner.replace(Box::new(inner)).map(|previous| *previous)
    }

    /// Wrapped middleware, if it has type `M`.
    #[must_use]
    pub fn middleware<M: Middleware>(&self) -> Option<&M> {
        let middleware: &dyn Any = &*self.middleware;
        middleware.downcast_ref()
    }

    /// Runs the request through this stage and the ones after it.
    pub fn send(&self, request: Request) -> HandlerFuture<'_> {
        self.middleware.send(
            request,
            Next {
                inner: self.inner.as_deref(),
            },
        )
    }
}

impl fmt::Debug for DelegatingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatingHandler")
            .field("kind", &self.kind())
            .field("inner", &self.inner)
            .finish()
    }
}

/// A pipeline stage: a delegating handler or the terminal transport.
pub enum Handler {
    /// Middleware stage.
    Delegating(DelegatingHandler),
    /// Terminal stage.
    Transport(Arc<dyn Transport>),
}

impl Handler {
    /// Terminal stage from a transport.
    pub fn transport(transport: impl Transport) -> Self {
        Self::Transport(Arc::new(transport))
    }

    /// Runs the request through this stage.
    pub fn send(&self, request: Request) -> HandlerFuture<'_> {
        match self {
            Self::Delegating(handler) => handler.send(request),
            Self::Transport(transport) => transport.send(request),
        }
    }

    /// The delegating handler, if this is one.
    #[must_use]
    pub const fn as_delegating(&self) -> Option<&DelegatingHandler> {
        match self {
            Self::Delegating(handler) => Some(handler),
            Self::Transport(_) => None,
        }
    }

    /// The terminal transport, if it has type `T`.
    #[must_use]
    pub fn as_transport<T: Transport>(&self) -> Option<&T> {
        match self {
            Self::Transport(transport) => {
                let transport: &dyn Any = &**transport;
                transport.downcast_ref()
            }
            Self::Delegating(_) => None,
        }
    }

    /// Returns `true` for the terminal transport.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    fn describe(&self) -> String {
        match self {
            Self::Delegating(handler) => format!("{:?}", handler.kind()),
            Self::Transport(_) => "Transport".to_string(),
        }
    }
}

impl From<DelegatingHandler> for Handler {
    fn from(handler: DelegatingHandler) -> Self {
        Self::Delegating(handler)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delegating(handler) => handler.fmt(f),
            Self::Transport(_) => f.write_str("Transport"),
        }
    }
}

#[cfg(test)]
mod tests {
    use courier_core::{Method, StatusCode};
    use http::HeaderMap;

    use super::*;

    struct Echo;

    impl Transport for Echo {
        fn send(&self, request: Request) -> HandlerFuture<'_> {
            Box::pin(async move {
                let mut headers = HeaderMap::new();
                headers.insert("x-url", request.url().as_str().parse().expect("header value"));
                Ok(Response::new(StatusCode::OK, headers, ""))
            })
        }
    }

    struct Stamp(&'static str);

    impl Middleware for Stamp {
        fn kind(&self) -> HandlerKind {
            HandlerKind::Custom(self.0)
        }

        fn send<'a>(&'a self, mut request: Request, next: Next<'a>) -> HandlerFuture<'a> {
            request.url_mut().query_pairs_mut().append_pair("stamp", self.0);
            Box::pin(next.run(request))
        }
    }

    fn request() -> Request {
        Request::builder(Method::Get, "http://localhost/".parse().expect("url")).build()
    }

    #[tokio::test]
    async fn delegating_handler_forwards_to_transport() {
        let handler = DelegatingHandler::with_inner(Stamp("a"), Handler::transport(Echo));

        let response = handler.send(request()).await.expect("response");
        assert_eq!(response.header("x-url"), Some("http://localhost/?stamp=a"));
    }

    #[tokio::test]
    async fn unlinked_handler_has_no_response() {
        let handler = DelegatingHandler::new(Stamp("a"));

        let result = handler.send(request()).await;
        assert!(matches!(result, Err(Error::NoResponse)));
    }

    #[test]
    fn set_inner_returns_previous_link() {
        let mut handler = DelegatingHandler::with_inner(Stamp("a"), Handler::transport(Echo));

        let previous = handler.set_inner(DelegatingHandler::new(Stamp("b")).into());
        assert!(previous.is_some_and(|previous| previous.is_transport()));
        assert_eq!(
            handler.inner().and_then(Handler::as_delegating).map(DelegatingHandler::kind),
            Some(HandlerKind::Custom("b"))
        );
    }

    #[test]
    fn downcasts_middleware_and_transport() {
        let handler = DelegatingHandler::with_inner(Stamp("a"), Handler::transport(Echo));

        assert!(handler.middleware::<Stamp>().is_some());
        assert!(handler.inner().and_then(Handler::as_transport::<Echo>).is_some());
    }

    #[test]
    fn option_kind_for_default_stages() {
        assert_eq!(
            HandlerKind::Retry.option_kind(),
            Some(courier_core::OptionKind::Retry)
        );
        assert_eq!(HandlerKind::Logging.option_kind(), None);
    }
}
