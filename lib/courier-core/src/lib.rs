//! Core types and traits for the courier request adapter.
//!
//! This crate provides the protocol-agnostic side of courier:
//! - [`RequestInformation`] - abstract request built by generated clients
//! - [`Request`], [`Content`] and [`Response`] - wire types flowing through the pipeline
//! - [`RequestOptions`] - per-request option bag consulted by middleware
//! - [`AuthenticationProvider`] - request authentication
//! - [`serialization`] - parse node and serialization writer contracts, JSON implementation
//! - [`store`] - backing store for change tracking
//! - [`RequestAdapter`] - the adapter contract
//! - [`Error`] and [`Result`] - error handling
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod adapter;
mod authentication;
mod body;
mod error;
mod headers;
mod method;
mod options;
pub mod prelude;
mod request;
mod request_information;
mod response;
mod response_handler;
pub mod serialization;
pub mod store;
mod uri_template;

pub use adapter::RequestAdapter;
pub use authentication::{
    AccessTokenProvider, AdditionalContext, AnonymousAuthenticationProvider,
    AuthenticationProvider, BaseBearerTokenAuthenticationProvider, CLAIMS_KEY,
    StaticTokenProvider,
};
pub use body::{Body, ContentType, StreamingBody};
pub use error::{BoxError, Error, Result};
pub use headers::RequestHeaders;
pub use method::Method;
pub use options::{OptionKind, RequestOption, RequestOptions, SharedOption};
pub use request::{Content, Request, RequestBuilder};
pub use request_information::{BASE_URL_KEY, RAW_URL_KEY, RequestInformation};
pub use response::Response;
pub use response_handler::{HandledValue, ResponseHandler, ResponseHandlerOption};
pub use uri_template::{ParameterValue, expand_template};

// Re-export http crate types for status codes and headers
pub use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
