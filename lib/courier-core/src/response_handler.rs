//! Response handler override.
//!
//! A [`ResponseHandlerOption`] in the request options replaces the adapter's
//! own dispatch: the handler receives the raw response and owns its body.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::serialization::ErrorMappings;
use crate::{OptionKind, RequestOption, Response, Result};

/// Type-erased value produced by a [`ResponseHandler`].
pub type HandledValue = Box<dyn Any + Send>;

/// Turns a raw response into the call's result.
#[async_trait]
pub trait ResponseHandler: Send + Sync {
    /// Handles the response.
    ///
    /// The returned value is downcast to the type the caller requested.
    ///
    /// # Errors
    ///
    /// Any error is returned to the caller as-is.
    async fn handle_response(
        &self,
        response: Response,
        error_mappings: Option<&ErrorMappings>,
    ) -> Result<Option<HandledValue>>;
}

/// Request option carrying a [`ResponseHandler`].
#[derive(Clone)]
pub struct ResponseHandlerOption {
    handler: Arc<dyn ResponseHandler>,
}

impl ResponseHandlerOption {
    /// Creates the option.
    pub fn new(handler: impl ResponseHandler + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &dyn ResponseHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for ResponseHandlerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandlerOption").finish_non_exhaustive()
    }
}

impl RequestOption for ResponseHandlerOption {
    const KIND: OptionKind = OptionKind::ResponseHandler;
}
