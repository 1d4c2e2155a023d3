//! HTTP request adapter for generated API clients.
//!
//! Requests described by a [`RequestInformation`] are authenticated,
//! converted into wire requests and sent through a chain of middleware
//! ending in a transport:
//!
//! ```text
//! UriReplacement -> Retry -> Redirect -> ParametersNameDecoding -> UserAgent -> HeadersInspection -> HyperTransport
//! ```
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! let adapter = HttpClientRequestAdapter::builder()
//!     .authentication_provider(AnonymousAuthenticationProvider)
//!     .base_url("https://api.example.com")
//!     .build()?;
//!
//! let mut request = RequestInformation::new(Method::Get, "{+baseurl}/users/{id}");
//! request.add_path_parameter("id", "42");
//! let user = adapter.send(request, User::from_node, None).await?;
//! ```

mod adapter;
mod client;
mod config;
mod connector;
mod handler;
pub mod middleware;
mod pipeline;
pub mod prelude;
mod transport;

#[cfg(test)]
mod testing;

pub use adapter::{HttpClientRequestAdapter, RequestAdapterBuilder};
pub use client::{Client, ClientBuilder, ServiceFuture};
pub use config::{HttpVersions, TransportConfig};
pub use handler::{DelegatingHandler, Handler, HandlerFuture, HandlerKind, Middleware, Next, Transport};
pub use pipeline::{
    chain_handlers, create_default_handlers, default_handler_kinds, default_handlers,
};
pub use transport::{HyperTransport, ServiceTransport};

// Re-export tower for custom transports
pub use tower;

// Re-export core types
pub use courier_core::{
    AnonymousAuthenticationProvider, AuthenticationProvider, Body, Content, Error, Method,
    Request, RequestAdapter, RequestBuilder, RequestInformation, RequestOption, RequestOptions,
    Response, ResponseHandler, ResponseHandlerOption, Result, StreamingBody,
};

// Re-export http types for status codes and headers
pub use courier_core::{HeaderMap, StatusCode, header};
