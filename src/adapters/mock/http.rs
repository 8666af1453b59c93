//! Mock HTTP client for testing.
//!
//! Provides a configurable mock HTTP client that can return body streams,
//! error statuses or transport errors, scripted per call.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use crate::traits::{ByteStream, Headers, HttpClient, HttpError};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method
    pub method: String,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: Headers,
    /// When the request was issued (tokio clock, so paused-time tests can
    /// assert exact gaps)
    pub at: Instant,
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Answer with a non-2xx status and body text
    Status(u16, String),
    /// Fail the request itself
    Error(HttpError),
    /// Stream the chunks, then end the body cleanly
    Stream(Vec<Bytes>),
    /// Stream the chunks, then fail the body with the error
    StreamThenError(Vec<Bytes>, HttpError),
    /// Stream the chunks, then keep the body open forever
    StreamPending(Vec<Bytes>),
}

impl MockResponse {
    /// Build a body from SSE frame strings, one chunk per frame.
    pub fn sse_frames(frames: &[&str]) -> Vec<Bytes> {
        frames.iter().map(|f| Bytes::from(f.to_string())).collect()
    }
}

/// Mock HTTP client for testing.
///
/// Responses are looked up per URL: first from a queue of one-shot responses
/// (consumed in order, one per request), then from a sticky response set with
/// [`set_response`](Self::set_response), then from the default.
///
/// # Example
///
/// ```ignore
/// use opencode_events::adapters::mock::{MockHttpClient, MockResponse};
///
/// let client = MockHttpClient::new();
/// client.push_response(
///     "http://localhost:4096/event",
///     MockResponse::Stream(MockResponse::sse_frames(&["data: {\"type\":\"server.connected\"}\n\n"])),
/// );
/// client.set_default_response(MockResponse::Error(HttpError::ConnectionFailed("refused".into())));
/// ```
#[derive(Debug, Clone)]
pub struct MockHttpClient {
    /// One-shot responses by URL
    queued: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    /// Sticky responses by URL
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    /// Default response when no specific match
    default_response: Arc<Mutex<Option<MockResponse>>>,
    /// Recorded requests for verification
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        Self {
            queued: Arc::new(Mutex::new(HashMap::new())),
            responses: Arc::new(Mutex::new(HashMap::new())),
            default_response: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a response used by exactly one future request to `url`.
    pub fn push_response(&self, url: &str, response: MockResponse) {
        let mut queued = self.queued.lock().unwrap();
        queued.entry(url.to_string()).or_default().push_back(response);
    }

    /// Set a response for every request to `url` once its queue is empty.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(url.to_string(), response);
    }

    /// Set a default response for URLs without specific matches.
    pub fn set_default_response(&self, response: MockResponse) {
        let mut default = self.default_response.lock().unwrap();
        *default = Some(response);
    }

    /// Get all recorded requests.
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests made so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn record_request(&self, method: &str, url: &str, headers: &Headers) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            at: Instant::now(),
        });
    }

    fn get_response(&self, url: &str) -> Option<MockResponse> {
        if let Some(queue) = self.queued.lock().unwrap().get_mut(url) {
            if let Some(response) = queue.pop_front() {
                return Some(response);
            }
        }

        if let Some(response) = self.responses.lock().unwrap().get(url) {
            return Some(response.clone());
        }

        self.default_response.lock().unwrap().clone()
    }
}

impl Default for MockHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get_stream(&self, url: &str, headers: &Headers) -> Result<ByteStream, HttpError> {
        self.record_request("GET", url, headers);

        match self.get_response(url) {
            Some(MockResponse::Stream(chunks)) => {
                Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
            }
            Some(MockResponse::StreamThenError(chunks, err)) => {
                let body = futures::stream::iter(
                    chunks
                        .into_iter()
                        .map(Ok)
                        .chain(std::iter::once(Err(err))),
                );
                Ok(Box::pin(body))
            }
            Some(MockResponse::StreamPending(chunks)) => {
                let body = futures::stream::iter(chunks.into_iter().map(Ok))
                    .chain(futures::stream::pending());
                Ok(Box::pin(body))
            }
            Some(MockResponse::Status(status, message)) => {
                Err(HttpError::ServerError { status, message })
            }
            Some(MockResponse::Error(err)) => Err(err),
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}
