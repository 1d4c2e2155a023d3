//! Protocol-agnostic request description.
//!
//! A [`RequestInformation`] is what generated request builders produce: an
//! RFC 6570 URL template with its path and query parameters, headers,
//! optional content and request options. The adapter turns it into a wire
//! [`Request`](crate::Request).
//!
//! # Example
//!
//! ```
//! use courier_core::{Method, RequestInformation};
//!
//! let mut info = RequestInformation::new(Method::Get, "{+baseurl}/users{?select,skip}");
//! info.add_path_parameter("baseurl", "https://graph.example.com");
//! info.add_query_parameter("select", vec!["id", "displayName"]);
//! info.add_optional_query_parameter("skip", None::<i32>);
//!
//! let uri = info.uri().unwrap();
//! assert_eq!(uri.as_str(), "https://graph.example.com/users?select=id,displayName");
//! ```

use std::collections::HashMap;

use url::Url;

use crate::serialization::{Serializable, SerializationWriterFactory};
use crate::{
    Body, ContentType, Error, Method, ParameterValue, RequestHeaders, RequestOption,
    RequestOptions, Result, expand_template,
};

/// Path parameter holding the base URL.
pub const BASE_URL_KEY: &str = "baseurl";

/// Path parameter holding a raw URL that bypasses the template.
pub const RAW_URL_KEY: &str = "request-raw-url";

const CONTENT_TYPE: &str = "content-type";

/// Abstract request: template, parameters, headers, content and options.
#[derive(Debug)]
pub struct RequestInformation {
    method: Method,
    url_template: String,
    path_parameters: HashMap<String, ParameterValue>,
    query_parameters: HashMap<String, Option<ParameterValue>>,
    headers: RequestHeaders,
    content: Option<Body>,
    options: RequestOptions,
    uri: Option<Url>,
}

impl RequestInformation {
    /// Creates a request description from a method and a URL template.
    #[must_use]
    pub fn new(method: Method, url_template: impl Into<String>) -> Self {
        Self {
            method,
            url_template: url_template.into(),
            path_parameters: HashMap::new(),
            query_parameters: HashMap::new(),
            headers: RequestHeaders::new(),
            content: None,
            options: RequestOptions::new(),
            uri: None,
        }
    }

    /// Creates a request description targeting an explicit URL.
    #[must_use]
    pub fn with_uri(method: Method, uri: Url) -> Self {
        let mut info = Self::new(method, "");
        info.set_uri(uri);
        info
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

    /// URL template.
    #[must_use]
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// Replaces the URL template.
    pub fn set_url_template(&mut self, url_template: impl Into<String>) {
        self.url_template = url_template.into();
    }

    /// Path parameters.
    #[must_use]
    pub const fn path_parameters(&self) -> &HashMap<String, ParameterValue> {
        &self.path_parameters
    }

    /// Sets a path parameter, replacing any previous value.
    pub fn add_path_parameter(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        self.path_parameters.insert(name.into(), value.into());
    }

    /// Sets a path parameter unless it is already present.
    ///
    /// Returns `true` if the value was added.
    pub fn try_add_path_parameter(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> bool {
        let mut added = false;
        self.path_parameters.entry(name.into()).or_insert_with(|| {
            added = true;
            value.into()
        });
        added
    }

    /// Query parameters; `None` values are omitted from the URI.
    #[must_use]
    pub const fn query_parameters(&self) -> &HashMap<String, Option<ParameterValue>> {
        &self.query_parameters
    }

    /// Sets a query parameter.
    pub fn add_query_parameter(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        self.query_parameters
            .insert(name.into(), Some(value.into()));
    }

    /// Sets a query parameter that may be absent.
    pub fn add_optional_query_parameter<V: Into<ParameterValue>>(
        &mut self,
        name: impl Into<String>,
        value: Option<V>,
    ) {
        self.query_parameters
            .insert(name.into(), value.map(Into::into));
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &RequestHeaders {
        &self.headers
    }

    /// Mutable access to the request headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut RequestHeaders {
        &mut self.headers
    }

    /// Request content.
    #[must_use]
    pub const fn content(&self) -> Option<&Body> {
        self.content.as_ref()
    }

    /// Returns `true` if the content, if any, can be sent again.
    #[must_use]
    pub fn is_content_replayable(&self) -> bool {
        self.content.as_ref().is_none_or(Body::is_replayable)
    }

    /// Sets raw content with its content type.
    pub fn set_content(&mut self, content: impl Into<Body>, content_type: &str) {
        self.headers.insert(CONTENT_TYPE, content_type);
        self.content = Some(content.into());
    }

    /// Sets binary content; `Content-Type` defaults to `application/octet-stream`.
    pub fn set_stream_content(&mut self, content: impl Into<Body>) {
        self.headers
            .try_add(CONTENT_TYPE, ContentType::OctetStream.as_str());
        self.content = Some(content.into());
    }

    /// Serializes a model as the content.
    ///
    /// # Errors
    ///
    /// Returns an error if no writer serves `content_type` or writing fails.
    pub fn set_content_from_serializable(
        &mut self,
        factory: &dyn SerializationWriterFactory,
        content_type: &str,
        value: &dyn Serializable,
    ) -> Result<()> {
        let mut writer = factory.serialization_writer(content_type)?;
        writer.write_object_value(None, Some(value))?;
        let content = writer.serialized_content()?;
        self.set_content(content, content_type);
        Ok(())
    }

    /// Serializes a collection of models as the content.
    ///
    /// # Errors
    ///
    /// Returns an error if no writer serves `content_type` or writing fails.
    pub fn set_content_from_serializable_collection(
        &mut self,
        factory: &dyn SerializationWriterFactory,
        content_type: &str,
        values: &[&dyn Serializable],
    ) -> Result<()> {
        let mut writer = factory.serialization_writer(content_type)?;
        writer.write_collection_of_object_values(None, values)?;
        let content = writer.serialized_content()?;
        self.set_content(content, content_type);
        Ok(())
    }

    /// Content for one send.
    ///
    /// Buffered content is cloned so it can be sent again; streamed content
    /// is handed over and is gone afterwards.
    pub fn content_for_send(&mut self) -> Option<Body> {
        match self.content.as_ref()?.try_clone() {
            Some(body) => Some(body),
            None => self.content.take(),
        }
    }

    /// Request options.
    #[must_use]
    pub const fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Mutable access to the request options.
    #[must_use]
    pub fn options_mut(&mut self) -> &mut RequestOptions {
        &mut self.options
    }

    /// Adds a request option, replacing any option of the same kind.
    pub fn add_option<O: RequestOption>(&mut self, option: O) {
        self.options.add(option);
    }

    /// Sets an explicit URI, clearing the template parameters.
    pub fn set_uri(&mut self, uri: Url) {
        self.path_parameters.clear();
        self.query_parameters.clear();
        self.uri = Some(uri);
    }

    /// Resolved URI.
    ///
    /// An explicit URI wins, then a [`RAW_URL_KEY`] path parameter, then the
    /// expanded template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is malformed, the base URL is
    /// missing while the template needs it, or the result is not a URL.
    pub fn uri(&self) -> Result<Url> {
        if let Some(uri) = &self.uri {
            return Ok(uri.clone());
        }
        if let Some(raw) = self.path_parameters.get(RAW_URL_KEY) {
            return Ok(Url::parse(&raw.to_string())?);
        }
        if self.url_template.contains(BASE_URL_KEY) && !self.path_parameters.contains_key(BASE_URL_KEY) {
            return Err(Error::invalid_request(
                "the base URL is missing from the path parameters",
            ));
        }

        let mut variables = self.path_parameters.clone();
        for (name, value) in &self.query_parameters {
            if let Some(value) = value {
                variables.insert(name.clone(), value.clone());
            }
        }
        let expanded = expand_template(&self.url_template, &variables)?;
        Ok(Url::parse(&expanded)?)
    }
}
