//! Request adapter contract.
//!
//! Generated clients talk to a [`RequestAdapter`]: it turns a
//! [`RequestInformation`] into a wire request, sends it and converts the
//! response into the requested shape.

use std::future::Future;
use std::sync::Arc;

use crate::serialization::{
    ErrorMappings, Parsable, ParsableFactory, Primitive, SerializationWriterFactory,
};
use crate::store::BackingStoreFactory;
use crate::{Request, RequestInformation, Result, StreamingBody};

/// Executes abstract requests and deserializes their responses.
///
/// Every method returns `Ok(None)` for a response without content.
pub trait RequestAdapter: Send + Sync {
    /// Sends a request and reads a single model.
    fn send<T: Parsable>(
        &self,
        request: RequestInformation,
        factory: ParsableFactory<T>,
        error_mappings: Option<&ErrorMappings>,
    ) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Sends a request and reads a collection of models.
    fn send_collection<T: Parsable>(
        &self,
        request: RequestInformation,
        factory: ParsableFactory<T>,
        error_mappings: Option<&ErrorMappings>,
    ) -> impl Future<Output = Result<Option<Vec<T>>>> + Send;

    /// Sends a request and reads a single scalar.
    fn send_primitive<T: Primitive>(
        &self,
        request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Sends a request and reads a collection of scalars.
    fn send_primitive_collection<T: Primitive>(
        &self,
        request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> impl Future<Output = Result<Option<Vec<T>>>> + Send;

    /// Sends a request and hands the response body over as a stream.
    ///
    /// The caller owns the stream and must consume or drop it.
    fn send_stream(
        &self,
        request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> impl Future<Output = Result<Option<StreamingBody>>> + Send;

    /// Sends a request whose response carries no content.
    fn send_no_content(
        &self,
        request: RequestInformation,
        error_mappings: Option<&ErrorMappings>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Authenticates the request and converts it into a wire request.
    fn convert_to_native_request(
        &self,
        request: RequestInformation,
    ) -> impl Future<Output = Result<Request>> + Send;

    /// Factory used to serialize request content.
    fn serialization_writer_factory(&self) -> Arc<dyn SerializationWriterFactory>;

    /// Base URL injected into requests that do not carry one.
    fn base_url(&self) -> Option<&str>;

    /// Replaces the base URL.
    fn set_base_url(&mut self, base_url: Option<String>);

    /// Switches the parse and serialization factories to backing-store aware
    /// variants and installs the backing-store factory.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::BackingStoreAlreadyEnabled`] on a second call.
    fn enable_backing_store(&mut self, factory: Option<Arc<dyn BackingStoreFactory>>) -> Result<()>;
}
