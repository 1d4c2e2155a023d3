//! Middleware units for the courier pipeline.
//!
//! Every unit implements [`crate::Middleware`] and reads its configuration
//! from a default option, which a request-scoped option of the same kind
//! replaces for a single call.
//!
//! # Default pipeline
//!
//! | Stage | Option |
//! |-------|--------|
//! | [`UriReplacementHandler`] | [`UriReplacementOption`] |
//! | [`RetryHandler`] | [`RetryHandlerOption`] |
//! | [`RedirectHandler`] | [`RedirectHandlerOption`] |
//! | [`ParametersNameDecodingHandler`] | [`ParametersNameDecodingOption`] |
//! | [`UserAgentHandler`] | [`UserAgentOption`] |
//! | [`HeadersInspectionHandler`] | [`HeadersInspectionOption`] |
//!
//! [`LoggingHandler`] is available for custom chains.
//!
//! # Example
//!
//! ```ignore
//! use courier::middleware::RetryHandlerOption;
//!
//! let mut request = RequestInformation::new(Method::Get, "{+baseurl}/reports");
//! request.add_option(RetryHandlerOption::new().max_retry(1));
//! ```

mod headers_inspection;
mod logging;
mod parameters_name_decoding;
mod redirect;
mod retry;
mod uri_replacement;
mod user_agent;

pub use headers_inspection::{HeadersInspectionHandler, HeadersInspectionOption};
pub use logging::{LogLevel, LoggingHandler};
pub use parameters_name_decoding::{
    DEFAULT_PARAMETERS_TO_DECODE, ParametersNameDecodingHandler, ParametersNameDecodingOption,
};
pub use redirect::{
    DEFAULT_MAX_REDIRECTS, MAX_MAX_REDIRECTS, RedirectHandler, RedirectHandlerOption,
    ShouldRedirect,
};
pub use retry::{
    DEFAULT_DELAY, DEFAULT_MAX_RETRY, MAX_DELAY, MAX_MAX_RETRY, RETRY_ATTEMPT, RetryHandler,
    RetryHandlerOption, ShouldRetry,
};
pub use uri_replacement::{UriReplacement, UriReplacementHandler, UriReplacementOption};
pub use user_agent::{
    DEFAULT_PRODUCT_NAME, DEFAULT_PRODUCT_VERSION, UserAgentHandler, UserAgentOption,
};
