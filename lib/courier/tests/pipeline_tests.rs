//! Integration tests for pipeline construction.

use assert2::{check, let_assert};
use courier::middleware::UserAgentHandler;
use courier::tower::service_fn;
use courier::{
    DelegatingHandler, Error, Handler, HandlerKind, HeaderMap, Method, Request, RequestOptions,
    Response, ServiceTransport, StatusCode, chain_handlers, create_default_handlers,
    default_handler_kinds, header,
};

fn echo_user_agent() -> ServiceTransport {
    ServiceTransport::new(service_fn(|request: Request| async move {
        let mut headers = HeaderMap::new();
        if let Some(user_agent) = request.headers().get(header::USER_AGENT) {
            headers.insert("x-seen-user-agent", user_agent.clone());
        }
        headers.insert(
            "x-seen-url",
            request.url().as_str().parse().map_err(|_| Error::invalid_request("url"))?,
        );
        Ok::<_, Error>(Response::new(StatusCode::OK, headers, ""))
    }))
}

fn walk(entry: &DelegatingHandler) -> (Vec<HandlerKind>, Option<&Handler>) {
    let mut kinds = vec![entry.kind()];
    let mut current = entry.inner();
    while let Some(handler) = current.and_then(Handler::as_delegating) {
        kinds.push(handler.kind());
        current = handler.inner();
    }
    (kinds, current)
}

#[test]
fn default_pipeline_order() {
    insta::assert_debug_snapshot!(default_handler_kinds(), @r"
    [
        UriReplacement,
        Retry,
        Redirect,
        ParametersNameDecoding,
        UserAgent,
        HeadersInspection,
    ]
    ");
}

#[test]
fn chain_of_defaults_ends_in_terminal() {
    let handlers = create_default_handlers(&RequestOptions::new()).expect("handlers");

    let chain = chain_handlers(Some(Handler::transport(echo_user_agent())), handlers)
        .expect("chain");

    let (kinds, terminal) = walk(&chain);
    check!(kinds == default_handler_kinds());
    let_assert!(Some(terminal) = terminal);
    check!(terminal.as_transport::<ServiceTransport>().is_some());
}

#[test]
fn chain_of_one_links_terminal() {
    let chain = chain_handlers(
        Some(Handler::transport(echo_user_agent())),
        vec![DelegatingHandler::new(UserAgentHandler::default())],
    )
    .expect("chain");

    let (kinds, terminal) = walk(&chain);
    check!(kinds == vec![HandlerKind::UserAgent]);
    check!(terminal.is_some_and(Handler::is_transport));
}

#[test]
fn chain_of_none_is_none() {
    check!(chain_handlers(Some(Handler::transport(echo_user_agent())), Vec::new()).is_none());
}

#[tokio::test]
async fn request_flows_through_default_chain() {
    let handlers = create_default_handlers(&RequestOptions::new()).expect("handlers");
    let chain = chain_handlers(Some(Handler::transport(echo_user_agent())), handlers)
        .expect("chain");

    let url = "http://localhost/users?%24select=id".parse().expect("url");
    let response = chain
        .send(Request::builder(Method::Get, url).build())
        .await
        .expect("response");

    check!(response.status() == StatusCode::OK);
    let_assert!(Some(user_agent) = response.header("x-seen-user-agent"));
    check!(user_agent.starts_with("courier/"));
    check!(response.header("x-seen-url") == Some("http://localhost/users?$select=id"));
}
