//! Event handler that writes one log line per event.

use tracing::{info, warn};

use crate::dispatch::{route, EventHandler};
use crate::sse::{Event, SessionError};

/// Logs every known event at `info`, session errors at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &Event) {
        match event.session_id() {
            Some(session) => info!(kind = event.kind(), session, "event"),
            None => info!(kind = event.kind(), "event"),
        }
        route(self, event);
    }

    fn on_session_error(&self, event: &SessionError) {
        warn!(
            session = event.session_id.as_deref().unwrap_or("-"),
            error = event.message().unwrap_or("unknown error"),
            "Session error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::dispatch;
    use crate::sse::parse_event;

    #[test]
    fn test_logging_handler_accepts_every_event() {
        let event = parse_event(
            r#"{"type":"session.error","properties":{"sessionID":"s1","error":{"name":"Boom"}}}"#,
        )
        .unwrap();
        assert!(dispatch(&event, &LoggingHandler));
        assert!(dispatch(&Event::ServerConnected, &LoggingHandler));
    }
}
