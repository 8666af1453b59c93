//! HTTP client trait abstraction.
//!
//! Provides a trait-based abstraction for HTTP operations, enabling
//! dependency injection and mocking in tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;

/// HTTP headers represented as a key-value map.
pub type Headers = HashMap<String, String>;

/// A response body delivered incrementally.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// HTTP client errors.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpError {
    /// Connection failed
    ConnectionFailed(String),
    /// Request timeout
    Timeout(String),
    /// Server returned an error status
    ServerError { status: u16, message: String },
    /// Request was cancelled
    Cancelled,
    /// IO error, including a body stream dropped mid-transfer
    Io(String),
    /// Invalid URL
    InvalidUrl(String),
    /// Other error
    Other(String),
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            HttpError::Timeout(msg) => write!(f, "Request timeout: {}", msg),
            HttpError::ServerError { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            HttpError::Cancelled => write!(f, "Request cancelled"),
            HttpError::Io(msg) => write!(f, "IO error: {}", msg),
            HttpError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            HttpError::Other(msg) => write!(f, "HTTP error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}

/// Trait for the streaming HTTP transport.
///
/// Implementations include the production reqwest-based client and a
/// scripted mock client for testing.
///
/// # Example
///
/// ```ignore
/// use futures::StreamExt;
/// use opencode_events::traits::{HttpClient, Headers, HttpError};
///
/// async fn first_chunk<C: HttpClient>(client: &C) -> Result<usize, HttpError> {
///     let mut body = client.get_stream("http://localhost:4096/event", &Headers::new()).await?;
///     Ok(body.next().await.transpose()?.map_or(0, |chunk| chunk.len()))
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request and return the body as a stream.
    ///
    /// Used for Server-Sent Events, where the body never completes while the
    /// subscription is alive. A non-2xx status is reported as
    /// [`HttpError::ServerError`] before any body is read.
    ///
    /// # Arguments
    /// * `url` - The URL to request
    /// * `headers` - Request headers
    async fn get_stream(&self, url: &str, headers: &Headers) -> Result<ByteStream, HttpError>;
}
