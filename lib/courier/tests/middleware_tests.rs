//! Integration tests for the default pipeline against a mock server.

use std::sync::Arc;
use std::time::Duration;

use assert2::{check, let_assert};
use courier::middleware::{
    HeadersInspectionOption, RETRY_ATTEMPT, RedirectHandlerOption, RetryHandlerOption,
    UriReplacementOption,
};
use courier::{Client, Error, Method, Request, StatusCode, header};
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header_regex, method, path},
};

fn url(server: &MockServer, path: &str) -> Url {
    Url::parse(&format!("{}{path}", server.uri())).expect("url")
}

/// The user agent token is added to every request.
#[tokio::test]
async fn test_user_agent_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/agent"))
        .and(header_regex("user-agent", "^courier/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let request = Request::builder(Method::Get, url(&mock_server, "/agent")).build();

    let response = client.send(request).await.expect("response");
    check!(response.status() == StatusCode::OK);
}

/// Encoded characters in query parameter names are decoded on the wire.
#[tokio::test]
async fn test_parameter_names_decoded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let request = Request::builder(
        Method::Get,
        url(&mock_server, "/users?%24select=id&%24top=5&name=a%24b"),
    )
    .build();
    client.send(request).await.expect("response");

    let received = mock_server.received_requests().await.expect("recording");
    let_assert!([request] = received.as_slice());
    check!(request.url.query() == Some("$select=id&$top=5&name=a%24b"));
}

/// Response headers are captured when the request asks for them.
#[tokio::test]
async fn test_headers_inspection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/inspected"))
        .respond_with(ResponseTemplate::new(200).insert_header("x-request-id", "abc-123"))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let inspection = Arc::new(
        HeadersInspectionOption::new()
            .inspect_request_headers(true)
            .inspect_response_headers(true),
    );
    let mut request = Request::builder(Method::Get, url(&mock_server, "/inspected")).build();
    request.options_mut().add_shared(Arc::clone(&inspection));

    client.send(request).await.expect("response");

    let response_headers = inspection.response_headers();
    check!(response_headers.get("x-request-id").is_some_and(|value| value == "abc-123"));
    check!(inspection.request_headers().contains_key(header::USER_AGENT));
}

/// Throttled requests are retried with a retry attempt header.
#[tokio::test]
async fn test_retry_on_service_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let request = Request::builder(Method::Get, url(&mock_server, "/flaky")).build();

    let response = client.send(request).await.expect("response");
    check!(response.status() == StatusCode::OK);

    let received = mock_server.received_requests().await.expect("recording");
    let_assert!([first, second] = received.as_slice());
    check!(!first.headers.contains_key(RETRY_ATTEMPT));
    check!(second.headers.get(RETRY_ATTEMPT).is_some_and(|value| value == "1"));
}

/// Retries stop once the configured maximum is reached.
#[tokio::test]
async fn test_retry_limit_from_request_option() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(504))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let mut request = Request::builder(Method::Get, url(&mock_server, "/down")).build();
    request
        .options_mut()
        .add(RetryHandlerOption::new().max_retry(2).delay(Duration::ZERO));

    let response = client.send(request).await.expect("response");
    check!(response.status() == StatusCode::GATEWAY_TIMEOUT);

    let received = mock_server.received_requests().await.expect("recording");
    check!(received.len() == 3);
}

/// Redirects are followed to the final location.
#[tokio::test]
async fn test_follow_redirect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/new"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let request = Request::builder(Method::Get, url(&mock_server, "/old")).build();

    let mut response = client.send(request).await.expect("response");
    check!(response.status() == StatusCode::OK);
    let body = response.bytes().await.expect("body");
    check!(body == "moved");
}

/// A redirect loop fails once the maximum is exceeded.
#[tokio::test]
async fn test_redirect_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(307).insert_header("Location", "/loop"))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .option(RedirectHandlerOption::new().max_redirect(1))
        .build()
        .expect("client");
    let request = Request::builder(Method::Get, url(&mock_server, "/loop")).build();

    let result = client.send(request).await;
    let_assert!(Err(Error::TooManyRedirects { count: 2, max: 1 }) = result);
}

/// Configured path replacements apply to every request.
#[tokio::test]
async fn test_uri_replacement() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .option(
            UriReplacementOption::new(true)
                .with_replacement("/users/me-token-to-replace", "/me"),
        )
        .build()
        .expect("client");
    let request = Request::builder(
        Method::Get,
        url(&mock_server, "/users/me-token-to-replace/messages"),
    )
    .build();

    let response = client.send(request).await.expect("response");
    check!(response.status() == StatusCode::OK);
}
