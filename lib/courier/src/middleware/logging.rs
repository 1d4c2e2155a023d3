//! Request/response logging middleware.
//!
//! This middleware logs HTTP requests and responses using the `tracing` crate.
//! It is not part of the default pipeline; add it to a custom chain.

use std::time::Instant;

use tracing::{Instrument, Level, debug, info, span, warn};

use crate::{HandlerFuture, HandlerKind, Middleware, Next, Request};

/// Log level for the logging middleware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level (request/response details).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

/// Middleware that logs requests and responses.
///
/// # Example
///
/// ```ignore
/// use courier::{ClientBuilder, middleware::LoggingHandler};
///
/// let client = ClientBuilder::new()
///     .handler(LoggingHandler::debug())
///     .build()?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler {
    level: LogLevel,
}

impl LoggingHandler {
    /// Create a new logging handler with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging handler that logs at debug level.
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// Configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl Middleware for LoggingHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Logging
    }

    fn send<'a>(&'a self, request: Request, next: Next<'a>) -> HandlerFuture<'a> {
        let method = request.method();
        let url = request.url().to_string();
        let level = self.level;

        let span = span!(Level::INFO, "http_request", %method, %url);

        Box::pin(
            async move {
                let start = Instant::now();

                match level {
                    LogLevel::Debug => {
                        debug!(
                            method = %method,
                            url = %url,
                            headers = ?request.headers(),
                            content_headers = ?request.content().map(|content| content.headers()),
                            "sending request"
                        );
                    }
                    LogLevel::Info => {
                        info!(method = %method, url = %url, "sending request");
                    }
                }

                let result = next.run(request).await;

                // Saturating conversion to u64 (truncates after ~584 million years)
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        if response.is_success() {
                            info!(status, elapsed_ms, "request completed");
                        } else {
                            warn!(status, elapsed_ms, "request failed with HTTP error");
                        }
                        if level == LogLevel::Debug {
                            debug!(headers = ?response.headers(), "response headers");
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, elapsed_ms, "request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
