//! Retry middleware for throttled and unavailable responses.
//!
//! Retries `429 Too Many Requests`, `503 Service Unavailable` and
//! `504 Gateway Timeout`, waiting for the delay announced by `Retry-After`
//! or an exponential back-off otherwise. Every retried request carries a
//! `Retry-Attempt` header with the attempt number.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use courier_core::{OptionKind, RequestOption};
use http::{HeaderValue, StatusCode, header};
use tracing::{Instrument, debug, debug_span};

use crate::{HandlerFuture, HandlerKind, Middleware, Next, Request, Response};

/// Default number of retries.
pub const DEFAULT_MAX_RETRY: u32 = 3;

/// Upper bound for the number of retries.
pub const MAX_MAX_RETRY: u32 = 10;

/// Default base delay.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// Upper bound for any single delay.
pub const MAX_DELAY: Duration = Duration::from_secs(180);

/// Header carrying the attempt number on retried requests.
pub const RETRY_ATTEMPT: &str = "retry-attempt";

/// Predicate deciding whether a retriable response is retried:
/// `(delay, attempt, response)`.
pub type ShouldRetry = Arc<dyn Fn(Duration, u32, &Response) -> bool + Send + Sync>;

/// Configuration of [`RetryHandler`].
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use courier::middleware::RetryHandlerOption;
///
/// let option = RetryHandlerOption::new()
///     .max_retry(5)
///     .delay(Duration::from_secs(1))
///     .should_retry(|_, attempt, _| attempt < 2);
/// ```
#[derive(Clone)]
pub struct RetryHandlerOption {
    max_retry: u32,
    delay: Duration,
    should_retry: ShouldRetry,
}

impl Default for RetryHandlerOption {
    fn default() -> Self {
        Self {
            max_retry: DEFAULT_MAX_RETRY,
            delay: DEFAULT_DELAY,
            should_retry: Arc::new(|_, _, _| true),
        }
    }
}

impl RetryHandlerOption {
    /// Default option: 3 retries, 3 seconds base delay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of retries, capped at [`MAX_MAX_RETRY`].
    #[must_use]
    pub fn max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry.min(MAX_MAX_RETRY);
        self
    }

    /// Sets the base delay, capped at [`MAX_DELAY`].
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay.min(MAX_DELAY);
        self
    }

    /// Sets the retry predicate.
    #[must_use]
    pub fn should_retry(
        mut self,
        predicate: impl Fn(Duration, u32, &Response) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_retry = Arc::new(predicate);
        self
    }

    /// Configured number of retries.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retry
    }

    /// Configured base delay.
    #[must_use]
    pub const fn base_delay(&self) -> Duration {
        self.delay
    }

    /// Delay before retry number `attempt` (starting at 1).
    #[must_use]
    pub fn delay_for(&self, attempt: u32, response: &Response) -> Duration {
        retry_after(response).unwrap_or_else(|| {
            let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
            self.delay.saturating_mul(factor)
        })
        .min(MAX_DELAY)
    }
}

impl fmt::Debug for RetryHandlerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryHandlerOption")
            .field("max_retry", &self.max_retry)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl RequestOption for RetryHandlerOption {
    const KIND: OptionKind = OptionKind::Retry;
}

/// Returns `true` if the status may be retried.
fn is_retriable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Delay announced by `Retry-After`, as seconds or as an HTTP date.
fn retry_after(response: &Response) -> Option<Duration> {
    let value = response.header(header::RETRY_AFTER.as_str())?.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let remaining = date.with_timezone(&Utc) - Utc::now();
    Some(remaining.to_std().unwrap_or_default())
}

/// Middleware retrying throttled requests.
///
/// Requests whose content cannot be replayed are never retried.
#[derive(Debug, Default)]
pub struct RetryHandler {
    option: Arc<RetryHandlerOption>,
}

impl RetryHandler {
    /// Creates the handler with its default configuration.
    #[must_use]
    pub fn new(option: RetryHandlerOption) -> Self {
        Self::from_shared(Arc::new(option))
    }

    /// Creates the handler from a shared configuration.
    #[must_use]
    pub const fn from_shared(option: Arc<RetryHandlerOption>) -> Self {
        Self { option }
    }

    /// Default configuration.
    #[must_use]
    pub fn option(&self) -> &RetryHandlerOption {
        &self.option
    }
}

impl Middleware for RetryHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Retry
    }

    fn send<'a>(&'a self, request: Request, next: Next<'a>) -> HandlerFuture<'a> {
        Box::pin(
            async move {
                let option = request.options().get_or(&self.option)?;
                let mut attempt = 0;
                let mut current = request;

                loop {
                    let replay = current.try_clone();
                    let response = next.run(current).await?;

                    if attempt >= option.max_retry || !is_retriable(response.status()) {
                        return Ok(response);
                    }
                    let Some(mut retry) = replay else {
                        debug!("content cannot be replayed, not retrying");
                        return Ok(response);
                    };

                    attempt += 1;
                    let delay = option.delay_for(attempt, &response);
                    if !(option.should_retry)(delay, attempt, &response) {
                        return Ok(response);
                    }

                    debug!(status = %response.status(), attempt, ?delay, "retrying request");
                    if let Err(err) = response.drain().await {
                        debug!(error = %err, "failed to drain retried response");
                    }
                    tokio::time::sleep(delay).await;

                    retry
                        .headers_mut()
                        .insert(RETRY_ATTEMPT, HeaderValue::from(attempt));
                    current = retry;
                }
            }
            .instrument(debug_span!("retry_handler")),
        )
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderMap;

    use super::*;

    fn response(status: StatusCode, retry_after: Option<&'static str>) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(value) = retry_after {
            headers.insert(header::RETRY_AFTER, HeaderValue::from_static(value));
        }
        Response::new(status, headers, "")
    }

    #[test]
    fn retriable_statuses() {
        assert!(is_retriable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retriable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retriable(StatusCode::GATEWAY_TIMEOUT));

        assert!(!is_retriable(StatusCode::OK));
        assert!(!is_retriable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_retriable(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn option_limits() {
        let option = RetryHandlerOption::new()
            .max_retry(50)
            .delay(Duration::from_secs(3600));
        assert_eq!(option.max_retries(), MAX_MAX_RETRY);
        assert_eq!(option.base_delay(), MAX_DELAY);
    }

    #[test]
    fn exponential_delay_without_retry_after() {
        let option = RetryHandlerOption::new().delay(Duration::from_secs(2));
        let response = response(StatusCode::SERVICE_UNAVAILABLE, None);

        assert_eq!(option.delay_for(1, &response), Duration::from_secs(2));
        assert_eq!(option.delay_for(2, &response), Duration::from_secs(4));
        assert_eq!(option.delay_for(3, &response), Duration::from_secs(8));
        assert_eq!(option.delay_for(10, &response), MAX_DELAY);
    }

    #[test]
    fn retry_after_seconds() {
        let option = RetryHandlerOption::new();
        let response = response(StatusCode::TOO_MANY_REQUESTS, Some("7"));

        assert_eq!(option.delay_for(1, &response), Duration::from_secs(7));
    }

    #[test]
    fn retry_after_date_in_the_past_is_immediate() {
        let response = response(
            StatusCode::TOO_MANY_REQUESTS,
            Some("Wed, 21 Oct 2015 07:28:00 GMT"),
        );

        assert_eq!(retry_after(&response), Some(Duration::ZERO));
    }

    #[test]
    fn unparseable_retry_after_is_ignored() {
        let response = response(StatusCode::TOO_MANY_REQUESTS, Some("soon"));

        assert_eq!(retry_after(&response), None);
    }
}
