//! Follow redirect middleware.
//!
//! Follows `301`, `302`, `303`, `307` and `308` responses carrying a
//! `Location` header, relative or absolute.

use std::fmt;
use std::sync::Arc;

use courier_core::{Content, Error, Method, OptionKind, RequestOption, Result};
use http::{StatusCode, header};
use tracing::{Instrument, debug, debug_span};
use url::Url;

use crate::{HandlerFuture, HandlerKind, Middleware, Next, Request, Response};

/// Default maximum number of redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// Upper bound for the maximum number of redirects.
pub const MAX_MAX_REDIRECTS: u32 = 20;

/// Predicate deciding whether a redirect response is followed.
pub type ShouldRedirect = Arc<dyn Fn(&Response) -> bool + Send + Sync>;

/// Configuration of [`RedirectHandler`].
#[derive(Clone)]
pub struct RedirectHandlerOption {
    max_redirect: u32,
    allow_redirect_on_scheme_change: bool,
    should_redirect: ShouldRedirect,
}

impl Default for RedirectHandlerOption {
    fn default() -> Self {
        Self {
            max_redirect: DEFAULT_MAX_REDIRECTS,
            allow_redirect_on_scheme_change: false,
            should_redirect: Arc::new(|_| true),
        }
    }
}

impl RedirectHandlerOption {
    /// Default option: up to 5 redirects, same scheme only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of redirects, capped at [`MAX_MAX_REDIRECTS`].
    #[must_use]
    pub fn max_redirect(mut self, max_redirect: u32) -> Self {
        self.max_redirect = max_redirect.min(MAX_MAX_REDIRECTS);
        self
    }

    /// Allows following a redirect to another scheme.
    #[must_use]
    pub const fn allow_redirect_on_scheme_change(mut self, allow: bool) -> Self {
        self.allow_redirect_on_scheme_change = allow;
        self
    }

    /// Sets the redirect predicate.
    #[must_use]
    pub fn should_redirect(
        mut self,
        predicate: impl Fn(&Response) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_redirect = Arc::new(predicate);
        self
    }

    /// Configured maximum number of redirects.
    #[must_use]
    pub const fn max_redirects(&self) -> u32 {
        self.max_redirect
    }
}

impl fmt::Debug for RedirectHandlerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectHandlerOption")
            .field("max_redirect", &self.max_redirect)
            .field(
                "allow_redirect_on_scheme_change",
                &self.allow_redirect_on_scheme_change,
            )
            .finish_non_exhaustive()
    }
}

impl RequestOption for RedirectHandlerOption {
    const KIND: OptionKind = OptionKind::Redirect;
}

/// Check if a status code is a followed redirect.
fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Method of the redirected request.
///
/// - 303: always GET
/// - 301, 302: GET unless the original method was GET or HEAD
/// - 307, 308: original method
fn redirect_method(status: StatusCode, original: Method) -> Method {
    match status.as_u16() {
        303 if original != Method::Head => Method::Get,
        301 | 302 if !matches!(original, Method::Get | Method::Head) => Method::Get,
        _ => original,
    }
}

/// Resolve a redirect Location URL relative to the original request URL.
fn resolve_redirect_url(base_url: &Url, location: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(location) {
        return Ok(url);
    }
    base_url.join(location).map_err(Error::InvalidUrl)
}

/// Middleware following redirects.
///
/// `Authorization` is dropped when the redirect leaves the original host or
/// scheme. A scheme change fails unless the option allows it.
#[derive(Debug, Default)]
pub struct RedirectHandler {
    option: Arc<RedirectHandlerOption>,
}

impl RedirectHandler {
    /// Creates the handler with its default configuration.
    #[must_use]
    pub fn new(option: RedirectHandlerOption) -> Self {
        Self::from_shared(Arc::new(option))
    }

    /// Creates the handler from a shared configuration.
    #[must_use]
    pub const fn from_shared(option: Arc<RedirectHandlerOption>) -> Self {
        Self { option }
    }

    /// Default configuration.
    #[must_use]
    pub fn option(&self) -> &RedirectHandlerOption {
        &self.option
    }
}

impl Middleware for RedirectHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Redirect
    }

    fn send<'a>(&'a self, request: Request, next: Next<'a>) -> HandlerFuture<'a> {
        Box::pin(
            async move {
                let option = request.options().get_or(&self.option)?;
                let mut current = request;
                let mut redirects = 0;

                loop {
                    let method = current.method();
                    let url = current.url().clone();
                    let headers = current.headers().clone();
                    let options = current.options().clone();
                    let had_content = current.content().is_some();
                    let replay = current.content().and_then(Content::try_clone);

                    let response = next.run(current).await?;
                    if !is_redirect(response.status()) || !(option.should_redirect)(&response) {
                        return Ok(response);
                    }
                    let Some(location) = response.header(header::LOCATION.as_str()) else {
                        return Err(Error::InvalidRedirect(
                            "redirect response missing Location header".into(),
                        ));
                    };
                    if redirects >= option.max_redirect {
                        return Err(Error::TooManyRedirects {
                            count: redirects + 1,
                            max: option.max_redirect,
                        });
                    }

                    let new_url = resolve_redirect_url(&url, location)?;
                    if new_url.scheme() != url.scheme() && !option.allow_redirect_on_scheme_change {
                        return Err(Error::InvalidRedirect(format!(
                            "redirect from {} to {} changes the scheme",
                            url.scheme(),
                            new_url.scheme()
                        )));
                    }

                    let new_method = redirect_method(response.status(), method);
                    let content = if new_method == method {
                        if had_content && replay.is_none() {
                            debug!("content cannot be replayed, not following redirect");
                            return Ok(response);
                        }
                        replay
                    } else {
                        None
                    };

                    debug!(status = %response.status(), from = %url, to = %new_url, "following redirect");
                    if let Err(err) = response.drain().await {
                        debug!(error = %err, "failed to drain redirect response");
                    }

                    let mut headers = headers;
                    if new_url.host_str() != url.host_str() || new_url.scheme() != url.scheme() {
                        headers.remove(header::AUTHORIZATION);
                    }
                    let mut next_request = Request::builder(new_method, new_url)
                        .options(options)
                        .build();
                    *next_request.headers_mut() = headers;
                    next_request.set_content(content);

                    current = next_request;
                    redirects += 1;
                }
            }
            .instrument(debug_span!("redirect_handler")),
        )
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, HeaderValue};

    use super::*;
    use crate::testing::RecordingTransport;
    use crate::{DelegatingHandler, Handler};

    #[test]
    fn default_option() {
        let option = RedirectHandlerOption::default();
        assert_eq!(option.max_redirects(), DEFAULT_MAX_REDIRECTS);
        assert!(!option.allow_redirect_on_scheme_change);
    }

    #[test]
    fn max_redirect_is_capped() {
        assert_eq!(
            RedirectHandlerOption::new().max_redirect(100).max_redirects(),
            MAX_MAX_REDIRECTS
        );
    }

    #[test]
    fn is_redirect_true() {
        for status in [301, 302, 303, 307, 308] {
            let status = StatusCode::from_u16(status).expect("status");
            assert!(is_redirect(status), "{status}");
        }
    }

    #[test]
    fn is_redirect_false() {
        assert!(!is_redirect(StatusCode::OK));
        assert!(!is_redirect(StatusCode::NOT_FOUND));
        assert!(!is_redirect(StatusCode::MULTIPLE_CHOICES));
        assert!(!is_redirect(StatusCode::NOT_MODIFIED));
    }

    #[test]
    fn redirect_method_to_get() {
        assert_eq!(redirect_method(StatusCode::SEE_OTHER, Method::Delete), Method::Get);
        assert_eq!(redirect_method(StatusCode::MOVED_PERMANENTLY, Method::Post), Method::Get);
        assert_eq!(redirect_method(StatusCode::FOUND, Method::Put), Method::Get);
    }

    #[test]
    fn redirect_method_preserved() {
        assert_eq!(
            redirect_method(StatusCode::TEMPORARY_REDIRECT, Method::Post),
            Method::Post
        );
        assert_eq!(
            redirect_method(StatusCode::PERMANENT_REDIRECT, Method::Put),
            Method::Put
        );
        assert_eq!(redirect_method(StatusCode::FOUND, Method::Head), Method::Head);
        assert_eq!(redirect_method(StatusCode::SEE_OTHER, Method::Head), Method::Head);
    }

    #[test]
    fn resolve_absolute_url() {
        let base = Url::parse("https://example.com/path").expect("base url");
        let result = resolve_redirect_url(&base, "https://other.com/new").expect("resolve");
        assert_eq!(result.as_str(), "https://other.com/new");
    }

    #[test]
    fn resolve_relative_url() {
        let base = Url::parse("https://example.com/old/path").expect("base url");
        let result = resolve_redirect_url(&base, "/new/path").expect("resolve");
        assert_eq!(result.as_str(), "https://example.com/new/path");

        let result = resolve_redirect_url(&base, "sibling").expect("resolve");
        assert_eq!(result.as_str(), "https://example.com/old/sibling");
    }

    #[tokio::test]
    async fn stops_after_max_redirects() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::LOCATION,
            HeaderValue::from_static("http://other.localhost/next"),
        );
        let transport = RecordingTransport::respond(StatusCode::FOUND, headers);
        let handler = DelegatingHandler::with_inner(
            RedirectHandler::new(RedirectHandlerOption::new().max_redirect(2)),
            Handler::transport(transport.clone()),
        );
        let request = Request::builder(Method::Post, Url::parse("http://localhost/start").expect("url"))
            .header(header::AUTHORIZATION, HeaderValue::from_static("Bearer token"))
            .build();

        let result = handler.send(request).await;
        assert!(matches!(result, Err(Error::TooManyRedirects { count: 3, max: 2 })));

        let recorded = transport.recorded();
        let methods: Vec<_> = recorded.iter().map(|request| request.method).collect();
        assert_eq!(methods, vec![Method::Post, Method::Get, Method::Get]);
        let authorized: Vec<_> = recorded
            .iter()
            .map(|request| request.headers.contains_key(header::AUTHORIZATION))
            .collect();
        assert_eq!(authorized, vec![true, false, false]);
    }
}
