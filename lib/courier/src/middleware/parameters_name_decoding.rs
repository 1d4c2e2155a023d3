//! Query parameter name decoding middleware.
//!
//! URI templates cannot carry `$`, `.`, `-` or `~` in variable names, so
//! generated clients percent-encode them (`%24select`). This stage turns the
//! names back into their literal form before the request is sent. Values are
//! left as they are.

use std::sync::Arc;

use courier_core::{OptionKind, RequestOption};
use tracing::{Instrument, debug_span, trace};

use crate::{HandlerFuture, HandlerKind, Middleware, Next, Request};

/// Characters decoded by default.
pub const DEFAULT_PARAMETERS_TO_DECODE: [char; 4] = ['$', '.', '-', '~'];

/// Configuration of [`ParametersNameDecodingHandler`].
#[derive(Debug, Clone)]
pub struct ParametersNameDecodingOption {
    enabled: bool,
    parameters_to_decode: Vec<char>,
}

impl Default for ParametersNameDecodingOption {
    fn default() -> Self {
        Self {
            enabled: true,
            parameters_to_decode: DEFAULT_PARAMETERS_TO_DECODE.to_vec(),
        }
    }
}

impl ParametersNameDecodingOption {
    /// Enabled option with the default characters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables decoding.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replaces the characters to decode.
    #[must_use]
    pub fn parameters_to_decode(mut self, characters: impl IntoIterator<Item = char>) -> Self {
        self.parameters_to_decode = characters.into_iter().collect();
        self
    }

    /// Returns `true` if decoding is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Characters to decode.
    #[must_use]
    pub fn characters(&self) -> &[char] {
        &self.parameters_to_decode
    }

    /// Decodes the configured characters in the parameter names of `query`.
    ///
    /// Returns `None` when nothing changes.
    #[must_use]
    pub fn decode_query(&self, query: &str) -> Option<String> {
        if !self.enabled || self.parameters_to_decode.is_empty() || !query.contains('%') {
            return None;
        }

        let symbols: Vec<(String, String)> = self
            .parameters_to_decode
            .iter()
            .map(|symbol| (format!("%{:02X}", u32::from(*symbol)), symbol.to_string()))
            .filter(|(encoded, _)| query.contains(encoded.as_str()))
            .collect();
        if symbols.is_empty() {
            return None;
        }

        let decoded = query
            .split('&')
            .map(|segment| {
                let (name, rest) = segment
                    .find('=')
                    .map_or((segment, ""), |index| segment.split_at(index));
                if !name.contains('%') {
                    return segment.to_string();
                }
                let name = symbols
                    .iter()
                    .fold(name.to_string(), |name, (encoded, symbol)| {
                        name.replace(encoded.as_str(), symbol)
                    });
                format!("{name}{rest}")
            })
            .collect::<Vec<_>>()
            .join("&");

        (decoded != query).then_some(decoded)
    }
}

impl RequestOption for ParametersNameDecodingOption {
    const KIND: OptionKind = OptionKind::ParametersNameDecoding;
}

/// Middleware decoding query parameter names.
#[derive(Debug, Default)]
pub struct ParametersNameDecodingHandler {
    option: Arc<ParametersNameDecodingOption>,
}

impl ParametersNameDecodingHandler {
    /// Creates the handler with its default configuration.
    #[must_use]
    pub fn new(option: ParametersNameDecodingOption) -> Self {
        Self::from_shared(Arc::new(option))
    }

    /// Creates the handler from a shared configuration.
    #[must_use]
    pub const fn from_shared(option: Arc<ParametersNameDecodingOption>) -> Self {
        Self { option }
    }

    /// Default configuration.
    #[must_use]
    pub fn option(&self) -> &ParametersNameDecodingOption {
        &self.option
    }
}

impl Middleware for ParametersNameDecodingHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::ParametersNameDecoding
    }

    fn send<'a>(&'a self, mut request: Request, next: Next<'a>) -> HandlerFuture<'a> {
        Box::pin(
            async move {
                let option = request.options().get_or(&self.option)?;
                let decoded = request.url().query().and_then(|query| option.decode_query(query));
                if let Some(query) = decoded {
                    trace!(%query, "decoded query parameter names");
                    request.url_mut().set_query(Some(&query));
                }
                next.run(request).await
            }
            .instrument(debug_span!("parameters_name_decoding_handler")),
        )
    }
}

#[cfg(test)]
mod tests {
    use courier_core::Method;
    use url::Url;

    use super::*;

    fn decode(url: &str) -> String {
        let mut url = Url::parse(url).expect("url");
        let decoded = url
            .query()
            .and_then(|query| ParametersNameDecodingOption::default().decode_query(query));
        if let Some(query) = decoded {
            url.set_query(Some(&query));
        }
        url.to_string()
    }

    #[test]
    fn decodes_default_characters_in_names() {
        assert_eq!(
            decode("http://localhost?%24select=diplayName&api%2Dversion=2"),
            "http://localhost/?$select=diplayName&api-version=2"
        );
        assert_eq!(
            decode("http://localhost?%24select=diplayName&api%7Eversion=2"),
            "http://localhost/?$select=diplayName&api~version=2"
        );
        assert_eq!(
            decode("http://localhost?%24select=diplayName&api%2Eversion=2"),
            "http://localhost/?$select=diplayName&api.version=2"
        );
    }

    #[test]
    fn keeps_port_and_path() {
        assert_eq!(
            decode("http://localhost:888/users?%24select=diplayName&api%2Dversion=2"),
            "http://localhost:888/users?$select=diplayName&api-version=2"
        );
        assert_eq!(decode("http://localhost"), "http://localhost/");
    }

    #[test]
    fn values_stay_encoded() {
        assert_eq!(
            decode("http://localhost?%24filter=name%20eq%20%24me&%24top=5"),
            "http://localhost/?$filter=name%20eq%20%24me&$top=5"
        );
    }

    #[test]
    fn lowercase_escapes_are_not_configured_sequences() {
        let option = ParametersNameDecodingOption::default();
        assert_eq!(option.decode_query("api%2dversion=2"), None);
    }

    #[test]
    fn disabled_or_empty_set_is_a_no_op() {
        let disabled = ParametersNameDecodingOption::default().enabled(false);
        assert_eq!(disabled.decode_query("%24select=id"), None);

        let empty = ParametersNameDecodingOption::default().parameters_to_decode(Vec::new());
        assert_eq!(empty.decode_query("%24select=id"), None);
    }

    #[test]
    fn custom_decode_set() {
        let option = ParametersNameDecodingOption::default().parameters_to_decode(['$']);
        assert_eq!(
            option.decode_query("%24select=id&api%2Dversion=2").as_deref(),
            Some("$select=id&api%2Dversion=2")
        );
    }

    #[tokio::test]
    async fn request_option_overrides_default() {
        use crate::{DelegatingHandler, Handler, testing::RecordingTransport};

        let transport = RecordingTransport::ok();
        let handler = DelegatingHandler::with_inner(
            ParametersNameDecodingHandler::default(),
            Handler::transport(transport.clone()),
        );

        let mut request = Request::builder(
            Method::Get,
            Url::parse("http://localhost?%24select=id&api%2Dversion=2").expect("url"),
        )
        .build();
        request
            .options_mut()
            .add(ParametersNameDecodingOption::default().parameters_to_decode(['-']));

        handler.send(request).await.expect("response");
        assert_eq!(
            transport.urls(),
            vec!["http://localhost/?%24select=id&api-version=2".to_string()]
        );
    }
}
