//! Network side of an [`EventChannel`](super::EventChannel).

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use super::ChannelProducer;
use crate::sse::{SseDecoder, SseParseError};
use crate::traits::{Headers, HttpClient, HttpError};

fn sse_headers() -> Headers {
    let mut headers = Headers::new();
    headers.insert("Accept".to_string(), "text/event-stream".to_string());
    headers.insert("Cache-Control".to_string(), "no-cache".to_string());
    headers
}

/// Read the event stream at `url` into `producer` until it ends, fails, or
/// the channel is closed.
pub(super) async fn run(client: Arc<dyn HttpClient>, url: String, producer: ChannelProducer) {
    let mut body = match client.get_stream(&url, &sse_headers()).await {
        Ok(body) => body,
        Err(e) => {
            warn!(url = %url, error = %e, "Failed to open event stream");
            producer.fail(e);
            return;
        }
    };

    producer.mark_open();
    info!(url = %url, "Event stream connected");

    let mut decoder = SseDecoder::new();
    let mut received: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(url = %url, error = %e, received, "Event stream failed");
                producer.fail(e);
                return;
            }
        };

        for result in decoder.push(&chunk) {
            match result {
                Ok(event) => {
                    received += 1;
                    debug!(kind = event.kind(), "Received event");
                    if !producer.deliver(event) {
                        debug!("Channel closed, dropping subscription");
                        return;
                    }
                }
                Err(e @ SseParseError::LineTooLong { .. }) => {
                    warn!(url = %url, error = %e, received, "Event stream is not line-delimited");
                    producer.fail(HttpError::Io(e.to_string()));
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "Dropping malformed event frame");
                }
            }
        }
    }

    decoder.finish();
    info!(url = %url, received, "Event stream ended");
    producer.finish();
}
