//! Common test utilities for integration tests.
//!
//! Provides a recording event handler and helpers for building SSE bodies.

#![allow(dead_code)]

use std::sync::Mutex;
use std::time::Duration;

use opencode_events::dispatch::EventHandler;
use opencode_events::sse::Event;

/// Records the kind of every event it receives, in order.
#[derive(Default)]
pub struct RecordingHandler {
    kinds: Mutex<Vec<String>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.kinds.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.kinds.lock().unwrap().len()
    }

    /// Poll until at least `count` events were recorded or `timeout` passes.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.len() >= count
    }
}

impl EventHandler for RecordingHandler {
    fn handle(&self, event: &Event) {
        self.kinds.lock().unwrap().push(event.kind().to_string());
    }
}

/// One `data:` frame carrying `{"type": kind, "properties": properties}`.
pub fn frame(kind: &str, properties: serde_json::Value) -> String {
    let payload = serde_json::json!({ "type": kind, "properties": properties });
    format!("data: {}\n\n", payload)
}

/// A bare `data:` frame with only a type.
pub fn bare_frame(kind: &str) -> String {
    format!("data: {{\"type\":\"{}\"}}\n\n", kind)
}
