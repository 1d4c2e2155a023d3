//! HTTPS connector using rustls.

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;

use crate::config::{HttpVersions, TransportConfig};

/// Create an HTTPS connector with rustls and the Mozilla root certificates.
///
/// Plain `http` URLs are accepted unless the configuration is https-only.
#[must_use]
pub fn https_connector(config: &TransportConfig) -> HttpsConnector<HttpConnector> {
    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(config.connect_timeout());

    let builder = HttpsConnectorBuilder::new().with_tls_config(tls_config);
    let builder = if config.https_only() {
        builder.https_only()
    } else {
        builder.https_or_http()
    };

    match config.http_versions() {
        HttpVersions::Negotiate => builder.enable_http1().enable_http2().wrap_connector(http),
        HttpVersions::Http1Only => builder.enable_http1().wrap_connector(http),
        HttpVersions::Http2Only => builder.enable_http2().wrap_connector(http),
    }
}
