//! Error types for courier.

use derive_more::{Display, Error, From};

use crate::options::OptionKind;
use crate::serialization::PrimitiveKind;

/// Boxed error produced by a mapped error factory or an external collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for courier operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Invalid adapter or pipeline configuration.
    #[display("configuration error: {_0}")]
    #[from(skip)]
    Configuration(#[error(not(source))] String),

    /// Invalid request description.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Malformed URI template.
    #[display("invalid URI template: {_0}")]
    #[from(skip)]
    InvalidTemplate(#[error(not(source))] String),

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The pipeline ended without reaching a transport.
    #[display("could not get a response after calling the service")]
    #[from(skip)]
    NoResponse,

    /// The authentication provider failed.
    #[display("authentication failed: {_0}")]
    #[from(skip)]
    Authentication(#[error(not(source))] String),

    /// Non-success status without a registered error factory.
    #[display(
        "the server returned an unexpected status code and no error factory is registered for this code: {status}"
    )]
    #[from(skip)]
    UnmappedStatus {
        /// HTTP status code.
        status: u16,
    },

    /// The registered error factory did not produce an error value.
    #[display(
        "the server returned an unexpected status code and the error registered for this code failed to deserialize: {status}"
    )]
    #[from(skip)]
    MalformedError {
        /// HTTP status code.
        status: u16,
    },

    /// A body-bearing response has no `Content-Type` header.
    #[display("no response content type header for deserialization (status {status})")]
    #[from(skip)]
    MissingContentType {
        /// HTTP status code.
        status: u16,
    },

    /// Mapped API error raised from the response body.
    #[display("API error {status}: {source}")]
    #[from(skip)]
    Api {
        /// HTTP status code.
        status: u16,
        /// The error produced by the registered error factory.
        #[error(not(source))]
        source: BoxError,
    },

    /// The requested scalar kind has no extraction path.
    #[display("error handling the response, unexpected type {kind}")]
    #[from(skip)]
    UnsupportedPrimitive {
        /// Requested scalar kind.
        #[error(not(source))]
        kind: PrimitiveKind,
    },

    /// A request option was stored under a kind owned by another type.
    #[display("request option {kind} is not a {expected}")]
    #[from(skip)]
    OptionTypeMismatch {
        /// Option kind that was looked up.
        #[error(not(source))]
        kind: OptionKind,
        /// Type the caller asked for.
        #[error(not(source))]
        expected: &'static str,
    },

    /// A response handler returned a value of another type.
    #[display("response handler did not return a {expected}")]
    #[from(skip)]
    ResponseHandlerType {
        /// Type the caller asked for.
        #[error(not(source))]
        expected: &'static str,
    },

    /// Payload could not be read into the requested shape.
    #[display("deserialization error: {_0}")]
    #[from(skip)]
    Deserialization(#[error(not(source))] String),

    /// Payload could not be written.
    #[display("serialization error: {_0}")]
    #[from(skip)]
    Serialization(#[error(not(source))] String),

    /// JSON error.
    #[display("JSON error: {_0}")]
    #[from]
    Json(serde_json::Error),

    /// Too many redirects.
    #[display("too many redirects ({count} exceeded max of {max})")]
    #[from(skip)]
    TooManyRedirects {
        /// Number of redirects followed.
        count: u32,
        /// Maximum allowed redirects.
        max: u32,
    },

    /// Invalid redirect response.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),

    /// The backing store was already enabled on this adapter.
    #[display("the backing store is already enabled for this request adapter")]
    #[from(skip)]
    BackingStoreAlreadyEnabled,
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Create a deserialization error.
    #[must_use]
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization(message.into())
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Wrap the error produced by a mapped error factory.
    #[must_use]
    pub fn api(status: u16, source: BoxError) -> Self {
        Self::Api { status, source }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns the HTTP status code carried by protocol and API errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::UnmappedStatus { status }
            | Self::MalformedError { status }
            | Self::MissingContentType { status }
            | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }

    /// The mapped error, if this error was raised from an error factory.
    #[must_use]
    pub fn api_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Api { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, derive_more::Display, derive_more::Error)]
    #[display("resource not found")]
    struct NotFound;

    #[test]
    fn error_display() {
        let err = Error::UnmappedStatus { status: 418 };
        assert_eq!(
            err.to_string(),
            "the server returned an unexpected status code and no error factory is registered for this code: 418"
        );

        let err = Error::Timeout;
        assert_eq!(err.to_string(), "request timeout");

        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "connection error: failed to connect");

        let err = Error::api(404, Box::new(NotFound));
        assert_eq!(err.to_string(), "API error 404: resource not found");
    }

    #[test]
    fn error_status() {
        let err = Error::MissingContentType { status: 200 };
        assert_eq!(err.status(), Some(200));
        assert!(!err.is_client_error());

        let err = Error::api(404, Box::new(NotFound));
        assert_eq!(err.status(), Some(404));
        assert!(err.is_client_error());
        assert!(!err.is_server_error());

        let err = Error::MalformedError { status: 503 };
        assert!(err.is_server_error());

        assert_eq!(Error::Timeout.status(), None);
        assert_eq!(Error::NoResponse.status(), None);
    }

    #[test]
    fn api_error_downcast() {
        let err = Error::api(404, Box::new(NotFound));
        let source = err.api_error().expect("mapped error");
        assert!(source.downcast_ref::<NotFound>().is_some());

        assert!(Error::Timeout.api_error().is_none());
    }

    #[test]
    fn error_is_timeout() {
        assert!(Error::Timeout.is_timeout());
        assert!(!Error::NoResponse.is_timeout());
    }

    #[test]
    fn error_is_connection() {
        assert!(Error::connection("failed").is_connection());
        assert!(!Error::Timeout.is_connection());
    }
}
