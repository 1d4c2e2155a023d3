//! Hyper transport settings.

use std::time::Duration;

use crate::{Error, Result};

/// HTTP versions the transport may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpVersions {
    /// HTTP/1.1, or HTTP/2 when negotiated with ALPN.
    #[default]
    Negotiate,
    /// HTTP/1.1 only.
    Http1Only,
    /// HTTP/2 only, with prior knowledge on plain connections.
    Http2Only,
}

/// Settings of a [`HyperTransport`](crate::HyperTransport).
///
/// ```ignore
/// let config = TransportConfig::default()
///     .with_timeout(None)
///     .with_http_versions(HttpVersions::Http1Only)
///     .with_https_only(true);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    max_idle_per_host: usize,
    idle_timeout: Option<Duration>,
    http_versions: HttpVersions,
    https_only: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(100)),
            connect_timeout: Some(Duration::from_secs(10)),
            max_idle_per_host: 32,
            idle_timeout: Some(Duration::from_secs(90)),
            http_versions: HttpVersions::Negotiate,
            https_only: false,
        }
    }
}

impl TransportConfig {
    /// Time allowed until the response head arrives; `None` waits forever.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Time allowed to open a connection; `None` waits forever.
    #[must_use]
    pub const fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    /// Idle connections kept per host.
    #[must_use]
    pub const fn max_idle_per_host(&self) -> usize {
        self.max_idle_per_host
    }

    /// Lifetime of an idle pooled connection; `None` keeps it open.
    #[must_use]
    pub const fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    /// Allowed HTTP versions.
    #[must_use]
    pub const fn http_versions(&self) -> HttpVersions {
        self.http_versions
    }

    /// Whether plain `http` URLs are refused.
    #[must_use]
    pub const fn https_only(&self) -> bool {
        self.https_only
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the idle connections kept per host; `0` disables pooling.
    #[must_use]
    pub const fn with_max_idle_per_host(mut self, count: usize) -> Self {
        self.max_idle_per_host = count;
        self
    }

    /// Sets the idle connection lifetime.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Restricts the HTTP versions.
    #[must_use]
    pub const fn with_http_versions(mut self, versions: HttpVersions) -> Self {
        self.http_versions = versions;
        self
    }

    /// Refuses plain `http` URLs.
    #[must_use]
    pub const fn with_https_only(mut self, https_only: bool) -> Self {
        self.https_only = https_only;
        self
    }

    /// Checks the settings before a transport is built.
    ///
    /// A zero timeout would fail every request, so it is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a zero request or connect timeout.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(Error::configuration("request timeout must not be zero"));
        }
        if self.connect_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(Error::configuration("connect timeout must not be zero"));
        }
        Ok(())
    }
}
