//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::{
    AnonymousAuthenticationProvider, AuthenticationProvider, Client, ClientBuilder, Error,
    HttpClientRequestAdapter, Method, Middleware, Request, RequestAdapter, RequestInformation,
    RequestOptions, Response, Result, StatusCode, header,
};
pub use courier_core::serialization::{ErrorMappings, ParseNode, Parsable};
