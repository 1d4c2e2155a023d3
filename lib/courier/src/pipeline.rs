//! Pipeline construction.
//!
//! [`chain_handlers`] links handlers in the order given; the default pipeline
//! is built by [`create_default_handlers`] in the order reported by
//! [`default_handler_kinds`]:
//!
//! ```text
//! UriReplacement -> Retry -> Redirect -> ParametersNameDecoding -> UserAgent -> HeadersInspection -> transport
//! ```

use courier_core::{RequestOptions, Result};

use crate::middleware::{
    HeadersInspectionHandler, HeadersInspectionOption, ParametersNameDecodingHandler,
    ParametersNameDecodingOption, RedirectHandler, RedirectHandlerOption, RetryHandler,
    RetryHandlerOption, UriReplacementHandler, UriReplacementOption, UserAgentHandler,
    UserAgentOption,
};
use crate::{DelegatingHandler, Handler, HandlerKind};

/// Stages of the default pipeline, outermost first.
const DEFAULT_HANDLER_KINDS: [HandlerKind; 6] = [
    HandlerKind::UriReplacement,
    HandlerKind::Retry,
    HandlerKind::Redirect,
    HandlerKind::ParametersNameDecoding,
    HandlerKind::UserAgent,
    HandlerKind::HeadersInspection,
];

/// Stages of the default pipeline, outermost first.
#[must_use]
pub fn default_handler_kinds() -> &'static [HandlerKind] {
    &DEFAULT_HANDLER_KINDS
}

/// Creates the default handlers with their default configuration, unlinked,
/// in pipeline order.
#[must_use]
pub fn default_handlers() -> Vec<DelegatingHandler> {
    vec![
        DelegatingHandler::new(UriReplacementHandler::default()),
        DelegatingHandler::new(RetryHandler::default()),
        DelegatingHandler::new(RedirectHandler::default()),
        DelegatingHandler::new(ParametersNameDecodingHandler::default()),
        DelegatingHandler::new(UserAgentHandler::default()),
        DelegatingHandler::new(HeadersInspectionHandler::default()),
    ]
}

/// Creates the default handlers, unlinked, in pipeline order.
///
/// An option of a stage's kind in `options` configures that stage; other
/// stages get their default configuration.
///
/// # Errors
///
/// Returns [`courier_core::Error::OptionTypeMismatch`] if an option is stored
/// under a stage's kind with an unexpected type.
pub fn create_default_handlers(options: &RequestOptions) -> Result<Vec<DelegatingHandler>> {
    let mut handlers = Vec::with_capacity(DEFAULT_HANDLER_KINDS.len());
    for kind in DEFAULT_HANDLER_KINDS {
        let handler = match kind {
            HandlerKind::UriReplacement => DelegatingHandler::new(
                options
                    .get::<UriReplacementOption>()?
                    .map_or_else(UriReplacementHandler::default, UriReplacementHandler::from_shared),
            ),
            HandlerKind::Retry => DelegatingHandler::new(
                options
                    .get::<RetryHandlerOption>()?
                    .map_or_else(RetryHandler::default, RetryHandler::from_shared),
            ),
            HandlerKind::Redirect => DelegatingHandler::new(
                options
                    .get::<RedirectHandlerOption>()?
                    .map_or_else(RedirectHandler::default, RedirectHandler::from_shared),
            ),
            HandlerKind::ParametersNameDecoding => DelegatingHandler::new(
                options.get::<ParametersNameDecodingOption>()?.map_or_else(
                    ParametersNameDecodingHandler::default,
                    ParametersNameDecodingHandler::from_shared,
                ),
            ),
            HandlerKind::UserAgent => DelegatingHandler::new(
                options
                    .get::<UserAgentOption>()?
                    .map_or_else(UserAgentHandler::default, UserAgentHandler::from_shared),
            ),
            HandlerKind::HeadersInspection => DelegatingHandler::new(
                options.get::<HeadersInspectionOption>()?.map_or_else(
                    HeadersInspectionHandler::default,
                    HeadersInspectionHandler::from_shared,
                ),
            ),
            HandlerKind::Logging | HandlerKind::Custom(_) => continue,
        };
        handlers.push(handler);
    }
    Ok(handlers)
}

/// Links `handlers` in order and returns the first one.
///
/// Each handler forwards to the one after it. The last handler forwards to
/// `terminal` when one is given; otherwise it keeps whatever link it already
/// had, so a partially linked tail can be extended. Returns `None` for an
/// empty list, whatever `terminal` is.
#[must_use]
pub fn chain_handlers(
    terminal: Option<Handler>,
    handlers: Vec<DelegatingHandler>,
) -> Option<DelegatingHandler> {
    let mut handlers = handlers.into_iter().rev();
    let mut current = handlers.next()?;
    if let Some(terminal) = terminal {
        current.set_inner(terminal);
    }
    for mut previous in handlers {
        previous.set_inner(Handler::Delegating(current));
        current = previous;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use courier_core::RequestOptions;

    use super::*;
    use crate::testing::RecordingTransport;

    #[test]
    fn default_handlers_follow_documented_order() {
        let handlers = create_default_handlers(&RequestOptions::new()).expect("handlers");

        let kinds: Vec<_> = handlers.iter().map(DelegatingHandler::kind).collect();
        assert_eq!(kinds, default_handler_kinds());
    }

    #[test]
    fn unconfigured_defaults_match_option_built_defaults() {
        let plain: Vec<_> = default_handlers().iter().map(DelegatingHandler::kind).collect();
        let built: Vec<_> = create_default_handlers(&RequestOptions::new())
            .expect("handlers")
            .iter()
            .map(DelegatingHandler::kind)
            .collect();

        assert_eq!(plain, default_handler_kinds());
        assert_eq!(plain, built);
    }

    #[test]
    fn option_configures_matching_handler() {
        let mut options = RequestOptions::new();
        options.add(RetryHandlerOption::new().max_retry(1));

        let handlers = create_default_handlers(&options).expect("handlers");
        let retry = handlers
            .iter()
            .find_map(DelegatingHandler::middleware::<RetryHandler>)
            .expect("retry handler");
        assert_eq!(retry.option().max_retries(), 1);

        let redirect = handlers
            .iter()
            .find_map(DelegatingHandler::middleware::<RedirectHandler>)
            .expect("redirect handler");
        assert_eq!(
            redirect.option().max_redirects(),
            crate::middleware::DEFAULT_MAX_REDIRECTS
        );
    }

    #[test]
    fn empty_list_gives_no_chain() {
        assert!(chain_handlers(None, Vec::new()).is_none());
        assert!(chain_handlers(Some(Handler::transport(RecordingTransport::ok())), Vec::new()).is_none());
    }

    #[test]
    fn single_handler_without_terminal_is_unlinked() {
        let handlers = create_default_handlers(&RequestOptions::new()).expect("handlers");
        let first = handlers.into_iter().next().expect("handler");

        let chain = chain_handlers(None, vec![first]).expect("chain");
        assert!(chain.inner().is_none());
    }

    #[test]
    fn last_handler_keeps_existing_link_without_terminal() {
        let tail = DelegatingHandler::with_inner(
            UserAgentHandler::default(),
            Handler::transport(RecordingTransport::ok()),
        );

        let chain = chain_handlers(None, vec![DelegatingHandler::new(RetryHandler::default()), tail])
            .expect("chain");
        let tail = chain.inner().and_then(Handler::as_delegating).expect("tail");
        assert!(tail.inner().and_then(Handler::as_transport::<RecordingTransport>).is_some());
    }
}
