//! User-agent tagging middleware.

use std::sync::Arc;

use courier_core::{OptionKind, RequestOption};
use http::{HeaderValue, header};
use tracing::{Instrument, debug_span};

use crate::{Error, HandlerFuture, HandlerKind, Middleware, Next, Request, Result};

/// Product name added by default.
pub const DEFAULT_PRODUCT_NAME: &str = "courier";

/// Product version added by default.
pub const DEFAULT_PRODUCT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration of [`UserAgentHandler`].
#[derive(Debug, Clone)]
pub struct UserAgentOption {
    enabled: bool,
    product_name: String,
    product_version: String,
}

impl Default for UserAgentOption {
    fn default() -> Self {
        Self {
            enabled: true,
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            product_version: DEFAULT_PRODUCT_VERSION.to_string(),
        }
    }
}

impl UserAgentOption {
    /// Enabled option tagging requests with `courier/<version>`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables tagging.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the product name.
    #[must_use]
    pub fn product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = name.into();
        self
    }

    /// Sets the product version.
    #[must_use]
    pub fn product_version(mut self, version: impl Into<String>) -> Self {
        self.product_version = version.into();
        self
    }

    /// Returns `true` if tagging is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Product token, `name/version`.
    #[must_use]
    pub fn token(&self) -> String {
        format!("{}/{}", self.product_name, self.product_version)
    }

    /// Adds the product token to `request` unless a token with the same
    /// product name is already there.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the token is not a valid header value.
    pub fn apply(&self, request: &mut Request) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let existing: Vec<&str> = request
            .headers()
            .get_all(header::USER_AGENT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        let present = existing.iter().flat_map(|value| products(value)).any(|product| {
            product.eq_ignore_ascii_case(&self.product_name)
        });
        if present {
            return Ok(());
        }

        let mut value = existing.join(" ");
        if !value.is_empty() {
            value.push(' ');
        }
        value.push_str(&self.token());
        let value = HeaderValue::from_str(&value)
            .map_err(|err| Error::invalid_request(format!("invalid user agent: {err}")))?;
        request.headers_mut().insert(header::USER_AGENT, value);
        Ok(())
    }
}

impl RequestOption for UserAgentOption {
    const KIND: OptionKind = OptionKind::UserAgent;
}

/// Product names in a `User-Agent` value, comments skipped.
fn products(value: &str) -> impl Iterator<Item = &str> {
    let mut depth = 0_usize;
    value.split_whitespace().filter_map(move |token| {
        if token.starts_with('(') || depth > 0 {
            depth += token.matches('(').count();
            depth = depth.saturating_sub(token.matches(')').count());
            return None;
        }
        token.split('/').next()
    })
}

/// Middleware appending a product token to the `User-Agent` header.
#[derive(Debug, Default)]
pub struct UserAgentHandler {
    option: Arc<UserAgentOption>,
}

impl UserAgentHandler {
    /// Creates the handler with its default configuration.
    #[must_use]
    pub fn new(option: UserAgentOption) -> Self {
        Self::from_shared(Arc::new(option))
    }

    /// Creates the handler from a shared configuration.
    #[must_use]
    pub const fn from_shared(option: Arc<UserAgentOption>) -> Self {
        Self { option }
    }

    /// Default configuration.
    #[must_use]
    pub fn option(&self) -> &UserAgentOption {
        &self.option
    }
}

impl Middleware for UserAgentHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::UserAgent
    }

    fn send<'a>(&'a self, mut request: Request, next: Next<'a>) -> HandlerFuture<'a> {
        Box::pin(
            async move {
                request.options().get_or(&self.option)?.apply(&mut request)?;
                next.run(request).await
            }
            .instrument(debug_span!("user_agent_handler")),
        )
    }
}
