//! Request adapter over the handler pipeline.
//!
//! [`HttpClientRequestAdapter`] authenticates a [`RequestInformation`],
//! converts it into a wire [`Request`], sends it through a [`Client`] and
//! reads the response into the shape the caller asked for.
//!
//! A `401` answer carrying a `Bearer` challenge with `claims` is retried once
//! with the claims handed to the authentication provider.

use std::any::type_name;
use std::fmt;
use std::sync::{Arc, LazyLock};

use courier_core::serialization::{
    ErrorMappings, ParseNode, ParseNodeFactory, Parsable, ParsableFactory, Primitive,
    SerializationWriterFactory, collection_of_object_values, collection_of_primitive_values,
    default_parse_node_factory, default_serialization_writer_factory, object_value,
    primitive_value,
};
use courier_core::store::{
    BackingStoreFactory, BackingStoreFactorySlot, BackingStoreParseNodeFactory,
    BackingStoreSerializationWriterFactory,
};
use courier_core::{
    AdditionalContext, AuthenticationProvider, BASE_URL_KEY, CLAIMS_KEY, Content, HandledValue,
    RequestAdapter, RequestInformation, ResponseHandlerOption, StreamingBody,
};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use regex::Regex;
use tracing::{Instrument, debug, debug_span, warn};

use crate::{Client, Error, Request, Response, Result};

const BEARER_SCHEME: &str = "Bearer";

static CLAIMS_VALUE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r#""([^"]*)""#).ok());

/// Request adapter sending requests through a courier [`Client`].
///
/// # Example
///
/// ```ignore
/// use courier::{HttpClientRequestAdapter, RequestAdapter};
/// use courier_core::{AnonymousAuthenticationProvider, Method, RequestInformation};
///
/// let adapter = HttpClientRequestAdapter::builder()
///     .authentication_provider(AnonymousAuthenticationProvider)
///     .base_url("https://graph.example.com/v1.0")
///     .build()?;
///
/// let request = RequestInformation::new(Method::Get, "{+baseurl}/me");
/// let me = adapter.send(request, User::from_node, None).await?;
/// ```
pub struct HttpClientRequestAdapter {
    client: Client,
    authentication_provider: Arc<dyn AuthenticationProvider>,
    parse_node_factory: Arc<dyn ParseNodeFactory>,
    serialization_writer_factory: Arc<dyn SerializationWriterFactory>,
    backing_store_factory: BackingStoreFactorySlot,
    backing_store_enabled: bool,
    base_url: Option<String>,
}

impl HttpClientRequestAdapter {
    /// Creates an adapter with the default client and factories.
    pub fn new(authentication_provider: impl AuthenticationProvider + 'static) -> Self {
        Self {
            client: Client::new(),
            authentication_provider: Arc::new(authentication_provider),
            parse_node_factory: Arc::new(default_parse_node_factory()),
            serialization_writer_factory: Arc::new(default_serialization_writer_factory()),
            backing_store_factory: BackingStoreFactorySlot::new(),
            backing_store_enabled: false,
            base_url: None,
        }
    }

    /// Creates an adapter builder.
    #[must_use]
    pub fn builder() -> RequestAdapterBuilder {
        RequestAdapterBuilder::default()
    }

    /// Client the requests are sent with.
    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Factory used to read responses.
    #[must_use]
    pub fn parse_node_factory(&self) -> Arc<dyn ParseNodeFactory> {
        Arc::clone(&self.parse_node_factory)
    }

    /// Backing-store factory slot shared with generated models.
    #[must_use]
    pub const fn backing_store_factory(&self) -> &BackingStoreFactorySlot {
        &self.backing_store_factory
    }

    /// Returns `true` once the backing store is enabled.
    #[must_use]
    pub const fn is_backing_store_enabled(&self) -> bool {
        self.backing_store_enabled
    }

    /// Converts a request without authenticating it.
    ///
    /// The base URL is added to the path parameters when missing. Content
    /// headers (`Content-*`, `Expires`, `Last-Modified`, `Allow`) travel with
    /// the content and are dropped when there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI cannot be resolved or a header name or
    /// value is invalid.
    pub fn request_from_information(&self, request: &mut RequestInformation) -> Result<Request> {
        self.apply_base_url(request);

        let url = request.uri()?;
        let mut headers = HeaderMap::new();
        let mut content_headers = HeaderMap::new();
        for (name, values) in request.headers().iter() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| Error::invalid_request(format!("invalid header name {name}: {err}")))?;
            for value in values {
                let value = HeaderValue::from_str(value).map_err(|err| {
                    Error::invalid_request(format!("invalid value for header {name}: {err}"))
                })?;
                if is_content_header(&name) {
                    content_headers.append(name.clone(), value);
                } else {
                    headers.append(name.clone(), value);
                }
            }
        }

        let content = request.content_for_send().map(|body| {
            let mut content = Content::new(body);
            *content.headers_mut() = content_headers;
            content
        });

        let mut native = Request::builder(request.method(), url)
            .options(request.options().clone())
            .build();
        *native.headers_mut() = headers;
        native.set_content(content);
        Ok(native)
    }

    fn apply_base_url(&self, request: &mut RequestInformation) {
        if let Some(base_url) = &self.base_url {
            request.try_add_path_parameter(BASE_URL_KEY, base_url.as_str());
        }
    }

    async fn get_response(&self, request: &mut RequestInformation) -> Result<Response> {
        let span = debug_span!("request_adapter", method = %request.method());
        self.send_with_claims(request).instrument(span).await
    }

    async fn send_with_claims(&self, request: &mut RequestInformation) -> Result<Response> {
        let mut claims: Option<String> = None;
        loop {
            self.apply_base_url(request);
            let context = claims
                .as_ref()
                .map(|claims| AdditionalContext::from([(CLAIMS_KEY.to_string(), claims.clone())]));
            self.authentication_provider
                .authenticate_request(request, context.as_ref())
                .await?;

            // Streamed content is consumed by the conversion below.
            let replayable = request.is_content_replayable();
            let native = self.request_from_information(request)?;
            let response = self.client.send(native).await?;

            if claims.is_some() || !replayable {
                return Ok(response);
            }
            let Some(challenge) = claims_challenge(&response) else {
                return Ok(response);
            };

            debug!(status = %response.status(), "retrying with claims from the authentication challenge");
            drain(response).await;
            claims = Some(challenge);
        }
    }

    async fn dispatch(
        &self,
        request: &mut RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Dispatch> {
        let handler = request.options().get::<ResponseHandlerOption>()?;
        let response = self.get_response(request).await?;
        match handler {
            Some(option) => Ok(Dispatch::Handled(
                option.handler().handle_response(response, error_mappings).await?,
            )),
            None => Ok(Dispatch::Native(response)),
        }
    }

    async fn read_model<R, F>(
        &self,
        mut response: Response,
        error_mappings: Option<&ErrorMappings>,
        read: F,
    ) -> Result<Option<R>>
    where
        R: Send,
        F: FnOnce(&dyn ParseNode) -> Result<Option<R>> + Send,
    {
        let result = self.read_response(&mut response, error_mappings, read).await;
        drain(response).await;
        result
    }

    async fn read_response<R, F>(
        &self,
        response: &mut Response,
        error_mappings: Option<&ErrorMappings>,
        read: F,
    ) -> Result<Option<R>>
    where
        R: Send,
        F: FnOnce(&dyn ParseNode) -> Result<Option<R>> + Send,
    {
        self.throw_failed_response(response, error_mappings).await?;
        if should_return_none(response) {
            return Ok(None);
        }
        let node = self.root_parse_node(response).await?;
        read(node.as_ref())
    }

    async fn root_parse_node(&self, response: &mut Response) -> Result<Box<dyn ParseNode>> {
        let Some(content_type) = response.content_type() else {
            return Err(Error::MissingContentType {
                status: response.status().as_u16(),
            });
        };
        let content = response.bytes().await?;
        self.parse_node_factory.root_parse_node(&content_type, content)
    }

    async fn throw_failed_response(
        &self,
        response: &mut Response,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let code = status.as_u16();
        let factory = error_mappings.and_then(|mappings| {
            mappings.get(status.as_str()).or_else(|| match code {
                400..=499 => mappings.get("4XX"),
                500..=599 => mappings.get("5XX"),
                _ => None,
            })
        });
        let Some(factory) = factory else {
            warn!(status = code, "no error factory registered for the response status");
            return Err(Error::UnmappedStatus { status: code });
        };

        let node = self.root_parse_node(response).await?;
        let error = object_value(node.as_ref(), *factory)?;
        match Parsable::into_error(error) {
            Some(source) => Err(Error::api(code, source)),
            None => Err(Error::MalformedError { status: code }),
        }
    }
}

impl fmt::Debug for HttpClientRequestAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientRequestAdapter")
            .field("client", &self.client)
            .field("parse_node_factory", &self.parse_node_factory)
            .field("serialization_writer_factory", &self.serialization_writer_factory)
            .field("backing_store_enabled", &self.backing_store_enabled)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RequestAdapter for HttpClientRequestAdapter {
    async fn send<T: Parsable>(
        &self,
        mut request: RequestInformation,
        factory: ParsableFactory<T>,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<T>> {
        match self.dispatch(&mut request, error_mappings).await? {
            Dispatch::Handled(value) => downcast(value),
            Dispatch::Native(response) => {
                self.read_model(response, error_mappings, |node| {
                    object_value(node, factory).map(Some)
                })
                .await
            }
        }
    }

    async fn send_collection<T: Parsable>(
        &self,
        mut request: RequestInformation,
        factory: ParsableFactory<T>,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<Vec<T>>> {
        match self.dispatch(&mut request, error_mappings).await? {
            Dispatch::Handled(value) => downcast(value),
            Dispatch::Native(response) => {
                self.read_model(response, error_mappings, |node| {
                    collection_of_object_values(node, factory).map(Some)
                })
                .await
            }
        }
    }

    async fn send_primitive<T: Primitive>(
        &self,
        mut request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<T>> {
        match self.dispatch(&mut request, error_mappings).await? {
            Dispatch::Handled(value) => downcast(value),
            Dispatch::Native(response) => {
                self.read_model(response, error_mappings, primitive_value::<T>)
                    .await
            }
        }
    }

    async fn send_primitive_collection<T: Primitive>(
        &self,
        mut request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<Vec<T>>> {
        match self.dispatch(&mut request, error_mappings).await? {
            Dispatch::Handled(value) => downcast(value),
            Dispatch::Native(response) => {
                self.read_model(response, error_mappings, |node| {
                    collection_of_primitive_values::<T>(node).map(Some)
                })
                .await
            }
        }
    }

    async fn send_stream(
        &self,
        mut request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<StreamingBody>> {
        let mut response = match self.dispatch(&mut request, error_mappings).await? {
            Dispatch::Handled(value) => return downcast(value),
            Dispatch::Native(response) => response,
        };

        if let Err(err) = self.throw_failed_response(&mut response, error_mappings).await {
            drain(response).await;
            return Err(err);
        }
        if should_return_none(&response) {
            drain(response).await;
            return Ok(None);
        }
        Ok(Some(response.into_stream()))
    }

    async fn send_no_content(
        &self,
        mut request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<()> {
        match self.dispatch(&mut request, error_mappings).await? {
            Dispatch::Handled(_) => Ok(()),
            Dispatch::Native(mut response) => {
                let result = self.throw_failed_response(&mut response, error_mappings).await;
                drain(response).await;
                result
            }
        }
    }

    async fn convert_to_native_request(&self, mut request: RequestInformation) -> Result<Request> {
        self.apply_base_url(&mut request);
        self.authentication_provider
            .authenticate_request(&mut request, None)
            .await?;
        self.request_from_information(&mut request)
    }

    fn serialization_writer_factory(&self) -> Arc<dyn SerializationWriterFactory> {
        Arc::clone(&self.serialization_writer_factory)
    }

    fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn set_base_url(&mut self, base_url: Option<String>) {
        self.base_url = base_url;
    }

    fn enable_backing_store(&mut self, factory: Option<Arc<dyn BackingStoreFactory>>) -> Result<()> {
        if self.backing_store_enabled {
            return Err(Error::BackingStoreAlreadyEnabled);
        }
        self.parse_node_factory = Arc::new(BackingStoreParseNodeFactory::new(Arc::clone(
            &self.parse_node_factory,
        )));
        self.serialization_writer_factory = Arc::new(BackingStoreSerializationWriterFactory::new(
            Arc::clone(&self.serialization_writer_factory),
        ));
        if let Some(factory) = factory {
            self.backing_store_factory.replace(factory);
        }
        self.backing_store_enabled = true;
        Ok(())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`HttpClientRequestAdapter`].
#[derive(Default)]
pub struct RequestAdapterBuilder {
    authentication_provider: Option<Arc<dyn AuthenticationProvider>>,
    parse_node_factory: Option<Arc<dyn ParseNodeFactory>>,
    serialization_writer_factory: Option<Arc<dyn SerializationWriterFactory>>,
    backing_store_factory: Option<BackingStoreFactorySlot>,
    client: Option<Client>,
    base_url: Option<String>,
}

impl RequestAdapterBuilder {
    /// Set the authentication provider (required).
    #[must_use]
    pub fn authentication_provider(
        self,
        provider: impl AuthenticationProvider + 'static,
    ) -> Self {
        self.shared_authentication_provider(Arc::new(provider))
    }

    /// Set a shared authentication provider (required).
    #[must_use]
    pub fn shared_authentication_provider(
        mut self,
        provider: Arc<dyn AuthenticationProvider>,
    ) -> Self {
        self.authentication_provider = Some(provider);
        self
    }

    /// Set the factory reading responses.
    #[must_use]
    pub fn parse_node_factory(mut self, factory: Arc<dyn ParseNodeFactory>) -> Self {
        self.parse_node_factory = Some(factory);
        self
    }

    /// Set the factory serializing request content.
    #[must_use]
    pub fn serialization_writer_factory(
        mut self,
        factory: Arc<dyn SerializationWriterFactory>,
    ) -> Self {
        self.serialization_writer_factory = Some(factory);
        self
    }

    /// Share a backing-store factory slot with generated models.
    #[must_use]
    pub fn backing_store_factory(mut self, slot: BackingStoreFactorySlot) -> Self {
        self.backing_store_factory = Some(slot);
        self
    }

    /// Set the client requests are sent with.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Build the adapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no authentication provider is set.
    pub fn build(self) -> Result<HttpClientRequestAdapter> {
        let authentication_provider = self
            .authentication_provider
            .ok_or_else(|| Error::configuration("an authentication provider is required"))?;

        Ok(HttpClientRequestAdapter {
            client: self.client.unwrap_or_default(),
            authentication_provider,
            parse_node_factory: self
                .parse_node_factory
                .unwrap_or_else(|| Arc::new(default_parse_node_factory())),
            serialization_writer_factory: self
                .serialization_writer_factory
                .unwrap_or_else(|| Arc::new(default_serialization_writer_factory())),
            backing_store_factory: self.backing_store_factory.unwrap_or_default(),
            backing_store_enabled: false,
            base_url: self.base_url,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

enum Dispatch {
    Handled(Option<HandledValue>),
    Native(Response),
}

fn downcast<T: 'static>(value: Option<HandledValue>) -> Result<Option<T>> {
    value
        .map(|value| {
            value
                .downcast::<T>()
                .map(|value| *value)
                .map_err(|_| Error::ResponseHandlerType {
                    expected: type_name::<T>(),
                })
        })
        .transpose()
}

async fn drain(response: Response) {
    if let Err(err) = response.drain().await {
        debug!(error = %err, "failed to drain response");
    }
}

fn is_content_header(name: &HeaderName) -> bool {
    name.as_str().starts_with("content-")
        || *name == header::EXPIRES
        || *name == header::LAST_MODIFIED
        || *name == header::ALLOW
}

fn should_return_none(response: &Response) -> bool {
    matches!(
        response.status(),
        StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT
    )
}

/// Claims from a `401` response's `Bearer` challenge, if any.
///
/// The first `claims` parameter of the first `Bearer` challenge wins.
fn claims_challenge(response: &Response) -> Option<String> {
    if response.status() != StatusCode::UNAUTHORIZED {
        return None;
    }

    response
        .headers()
        .get_all(header::WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|challenge| {
            let (scheme, parameters) = challenge.trim().split_once(char::is_whitespace)?;
            scheme
                .eq_ignore_ascii_case(BEARER_SCHEME)
                .then_some(parameters)
        })
        .next()
        .and_then(|parameters| {
            let raw = parameters.split(',').map(str::trim).find(|parameter| {
                parameter
                    .get(..CLAIMS_KEY.len())
                    .is_some_and(|prefix| prefix.eq_ignore_ascii_case(CLAIMS_KEY))
            })?;
            let captures = CLAIMS_VALUE.as_ref()?.captures(raw)?;
            captures.get(1).map(|value| value.as_str().to_string())
        })
}
