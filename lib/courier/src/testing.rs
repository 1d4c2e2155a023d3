//! In-memory transport for unit tests.

use std::sync::{Arc, Mutex, PoisonError};

use courier_core::Method;
use http::{HeaderMap, StatusCode};

use crate::{HandlerFuture, Request, Response, Transport};

/// What the transport saw for one request.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: HeaderMap,
}

/// Transport answering every request with the same status and headers,
/// recording what it received.
#[derive(Debug, Clone)]
pub(crate) struct RecordingTransport {
    status: StatusCode,
    headers: HeaderMap,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingTransport {
    pub(crate) fn ok() -> Self {
        Self::respond(StatusCode::OK, HeaderMap::new())
    }

    pub(crate) fn respond(status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            status,
            headers,
            recorded: Arc::default(),
        }
    }

    pub(crate) fn recorded(&self) -> Vec<Recorded> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.recorded().into_iter().map(|recorded| recorded.url).collect()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: Request) -> HandlerFuture<'_> {
        let mut headers = request.headers().clone();
        if let Some(content) = request.content() {
            headers.extend(content.headers().clone());
        }
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Recorded {
                method: request.method(),
                url: request.url().to_string(),
                headers,
            });

        let response = Response::new(self.status, self.headers.clone(), "");
        Box::pin(async move { Ok(response) })
    }
}
