//! Request and response bodies.

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::{StreamExt, stream};

use crate::Result;

/// A streaming body: chunks of bytes arriving over time.
pub type StreamingBody = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + Sync>>;

/// Well-known media types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a request or a response.
///
/// Buffered bodies can be replayed, streamed bodies are read once.
#[derive(Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Fully buffered body.
    Buffered(Bytes),
    /// Body read chunk by chunk.
    Streamed(StreamingBody),
}

impl Body {
    /// Creates a streamed body.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + Sync + 'static,
    {
        Self::Streamed(Box::pin(stream))
    }

    /// Returns `true` if the body can be sent more than once.
    #[must_use]
    pub const fn is_replayable(&self) -> bool {
        !matches!(self, Self::Streamed(_))
    }

    /// Returns `true` if the body is known to be empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Buffered(bytes) => bytes.is_empty(),
            Self::Streamed(_) => false,
        }
    }

    /// Exact length, when known without reading.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Empty => Some(0),
            Self::Buffered(bytes) => Some(bytes.len()),
            Self::Streamed(_) => None,
        }
    }

    /// Clones a replayable body; streamed bodies yield `None`.
    #[must_use]
    pub fn try_clone(&self) -> Option<Self> {
        match self {
            Self::Empty => Some(Self::Empty),
            Self::Buffered(bytes) => Some(Self::Buffered(bytes.clone())),
            Self::Streamed(_) => None,
        }
    }

    /// Reads the whole body.
    ///
    /// # Errors
    ///
    /// Returns an error if reading any chunk fails.
    pub async fn collect(self) -> Result<Bytes> {
        match self {
            Self::Empty => Ok(Bytes::new()),
            Self::Buffered(bytes) => Ok(bytes),
            Self::Streamed(mut body) => {
                let mut collected = BytesMut::new();
                while let Some(chunk) = body.next().await {
                    collected.extend_from_slice(&chunk?);
                }
                Ok(collected.freeze())
            }
        }
    }

    /// Reads and discards the whole body.
    ///
    /// # Errors
    ///
    /// Returns an error if reading any chunk fails.
    pub async fn drain(self) -> Result<()> {
        if let Self::Streamed(mut body) = self {
            while let Some(chunk) = body.next().await {
                chunk?;
            }
        }
        Ok(())
    }

    /// Converts the body into a stream of chunks.
    #[must_use]
    pub fn into_stream(self) -> StreamingBody {
        match self {
            Self::Empty => Box::pin(stream::empty()),
            Self::Buffered(bytes) => Box::pin(stream::once(async move { Ok(bytes) })),
            Self::Streamed(body) => body,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            Self::Streamed(_) => f.write_str("Streamed"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Buffered(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffered(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Buffered(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::Buffered(Bytes::from_static(text.as_bytes()))
    }
}
