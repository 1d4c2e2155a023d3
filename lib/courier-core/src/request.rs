//! Wire requests.
//!
//! A [`Request`] is what flows through the middleware chain: a concrete
//! method, an absolute URL, request headers, optional [`Content`] with its
//! own header set, and the [`RequestOptions`] that middleware consult.
//!
//! # Example
//!
//! ```
//! use courier_core::{Method, Request};
//! use http::{HeaderValue, header};
//!
//! let request = Request::builder(Method::Get, "https://api.example.com".parse().unwrap())
//!     .header(header::ACCEPT, HeaderValue::from_static("application/json"))
//!     .build();
//! ```

use http::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::{Body, Method, RequestOptions};

/// Request content: a body and the headers that describe it.
#[derive(Debug, Default)]
pub struct Content {
    headers: HeaderMap,
    body: Body,
}

impl Content {
    /// Creates content without headers.
    #[must_use]
    pub fn new(body: impl Into<Body>) -> Self {
        Self {
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Sets a content header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Content headers (`Content-Type`, `Content-Length`, ...).
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to content headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Body.
    #[must_use]
    pub const fn body(&self) -> &Body {
        &self.body
    }

    /// Returns `true` if the body can be sent more than once.
    #[must_use]
    pub const fn is_replayable(&self) -> bool {
        self.body.is_replayable()
    }

    /// Clones replayable content.
    #[must_use]
    pub fn try_clone(&self) -> Option<Self> {
        Some(Self {
            headers: self.headers.clone(),
            body: self.body.try_clone()?,
        })
    }

    /// Consume into (headers, body).
    #[must_use]
    pub fn into_parts(self) -> (HeaderMap, Body) {
        (self.headers, self.body)
    }
}

/// A wire request with method, URL, headers, optional content and options.
#[derive(Debug)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    content: Option<Content>,
    options: RequestOptions,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: Url) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Replaces the HTTP method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Request URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Mutable access to the URL, for in-place rewrites.
    #[must_use]
    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    /// Replaces the URL.
    pub fn set_url(&mut self, url: Url) {
        self.url = url;
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// First value of a request header, if it is valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Request content.
    #[must_use]
    pub const fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    /// Mutable access to the content.
    #[must_use]
    pub fn content_mut(&mut self) -> Option<&mut Content> {
        self.content.as_mut()
    }

    /// Replaces the content.
    pub fn set_content(&mut self, content: Option<Content>) {
        self.content = content;
    }

    /// Removes and returns the content.
    pub fn take_content(&mut self) -> Option<Content> {
        self.content.take()
    }

    /// Request-scoped options.
    #[must_use]
    pub const fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Mutable access to the options.
    #[must_use]
    pub fn options_mut(&mut self) -> &mut RequestOptions {
        &mut self.options
    }

    /// Returns `true` if the request can be sent again.
    #[must_use]
    pub fn is_replayable(&self) -> bool {
        self.content.as_ref().is_none_or(Content::is_replayable)
    }

    /// Clones a replayable request; requests with streamed content yield `None`.
    #[must_use]
    pub fn try_clone(&self) -> Option<Self> {
        let content = match &self.content {
            Some(content) => Some(content.try_clone()?),
            None => None,
        };
        Some(Self {
            method: self.method,
            url: self.url.clone(),
            headers: self.headers.clone(),
            content,
            options: self.options.clone(),
        })
    }

    /// Consume into (method, url, headers, content, options).
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, HeaderMap, Option<Content>, RequestOptions) {
        (
            self.method,
            self.url,
            self.headers,
            self.content,
            self.options,
        )
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: Url,
    headers: HeaderMap,
    content: Option<Content>,
    options: RequestOptions,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            content: None,
            options: RequestOptions::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Appends multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (HeaderName, HeaderValue)>) -> Self {
        for (name, value) in headers {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the content.
    #[must_use]
    pub fn content(mut self, content: Content) -> Self {
        self.content = Some(content);
        self
    }

    /// Sets the request-scoped options.
    #[must_use]
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            content: self.content,
            options: self.options,
        }
    }
}
