//! URI replacement middleware.
//!
//! Rewrites portions of the request path before the request leaves, e.g. to
//! map `/users/me-token-to-replace` onto `/me` for a given tenant.

use std::sync::Arc;

use courier_core::{OptionKind, RequestOption};
use tracing::{Instrument, debug_span, trace};
use url::Url;

use crate::{HandlerFuture, HandlerKind, Middleware, Next, Request};

/// Rules used to rewrite a request URI.
pub trait UriReplacement: RequestOption {
    /// Returns `true` if replacement should happen.
    fn is_enabled(&self) -> bool;

    /// Rewrites the URI; `None` in gives `None` out.
    fn replace(&self, uri: Option<&Url>) -> Option<Url>;
}

/// Ordered substitutions applied to the URI path.
///
/// # Example
///
/// ```ignore
/// use courier::middleware::UriReplacementOption;
///
/// let option = UriReplacementOption::new(true).with_replacement("/users/me-token-to-replace", "/me");
/// ```
#[derive(Debug, Clone, Default)]
pub struct UriReplacementOption {
    enabled: bool,
    replacements: Vec<(String, String)>,
}

impl UriReplacementOption {
    /// Creates an option without substitutions.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            replacements: Vec::new(),
        }
    }

    /// Adds a substitution; substitutions run in the order they are added.
    #[must_use]
    pub fn with_replacement(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.replacements.push((from.into(), to.into()));
        self
    }

    /// Configured substitutions.
    #[must_use]
    pub fn replacements(&self) -> &[(String, String)] {
        &self.replacements
    }
}

impl RequestOption for UriReplacementOption {
    const KIND: OptionKind = OptionKind::UriReplacement;
}

impl UriReplacement for UriReplacementOption {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn replace(&self, uri: Option<&Url>) -> Option<Url> {
        let mut uri = uri?.clone();
        if !self.enabled || self.replacements.is_empty() {
            return Some(uri);
        }

        let path = self
            .replacements
            .iter()
            .fold(uri.path().to_string(), |path, (from, to)| path.replace(from.as_str(), to));
        uri.set_path(&path);
        Some(uri)
    }
}

/// Middleware applying [`UriReplacement`] rules.
///
/// A request-scoped `R` replaces the handler rules for that call; nothing
/// happens while the handler rules are disabled.
#[derive(Debug)]
pub struct UriReplacementHandler<R = UriReplacementOption> {
    replacement: Arc<R>,
}

impl<R: UriReplacement> UriReplacementHandler<R> {
    /// Creates the handler with its default rules.
    #[must_use]
    pub fn new(replacement: R) -> Self {
        Self::from_shared(Arc::new(replacement))
    }

    /// Creates the handler from shared rules.
    #[must_use]
    pub const fn from_shared(replacement: Arc<R>) -> Self {
        Self { replacement }
    }

    /// Default rules.
    #[must_use]
    pub fn replacement(&self) -> &R {
        &self.replacement
    }
}

impl Default for UriReplacementHandler {
    fn default() -> Self {
        Self::new(UriReplacementOption::default())
    }
}

impl<R: UriReplacement> Middleware for UriReplacementHandler<R> {
    fn kind(&self) -> HandlerKind {
        HandlerKind::UriReplacement
    }

    fn send<'a>(&'a self, mut request: Request, next: Next<'a>) -> HandlerFuture<'a> {
        let span = debug_span!("uri_replacement_handler", enabled = self.replacement.is_enabled());
        Box::pin(
            async move {
                let rules = request.options().get_or(&self.replacement)?;
                if self.replacement.is_enabled()
                    && let Some(uri) = rules.replace(Some(request.url()))
                {
                    trace!(from = %request.url(), to = %uri, "replaced request uri");
                    request.set_url(uri);
                }
                next.run(request).await
            }
            .instrument(span),
        )
    }
}
