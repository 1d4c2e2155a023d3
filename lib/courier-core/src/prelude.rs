//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits
//! for easy glob importing:
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::serialization::{
    ErrorMappings, ParseNode, ParseNodeFactory, Parsable, ParsableFactory, Primitive,
    Serializable, SerializationWriter, SerializationWriterFactory,
};
pub use crate::{
    AuthenticationProvider, Body, Content, Error, Method, Request, RequestAdapter,
    RequestInformation, RequestOption, RequestOptions, Response, Result,
};
