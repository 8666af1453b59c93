//! SSE stream parsing logic
//!
//! Contains the stateful [`SseParser`] that accumulates lines into frames,
//! and [`parse_event`] which turns a frame's JSON payload into a typed
//! [`Event`].

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::sse::events::Event;

/// Errors that can occur while turning a frame into an [`Event`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SseParseError {
    /// Frame payload is not valid JSON
    #[error("Invalid JSON in event frame: {0}")]
    InvalidJson(String),
    /// Payload is JSON but has no string `type` field
    #[error("Event frame has no type field")]
    MissingType,
    /// Properties do not match the shape expected for a known kind
    #[error("Invalid properties for event '{kind}': {detail}")]
    InvalidPayload { kind: String, detail: String },
    /// A single line grew past the decoder's limit without a terminator
    #[error("Event stream line exceeds {limit} bytes")]
    LineTooLong { limit: usize },
}

/// Represents a parsed SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Event name declaration (e.g., "event: message")
    Event(String),
    /// Data payload (e.g., "data: {\"type\": \"server.connected\"}")
    Data(String),
    /// Any other field (`id:`, `retry:`, unknown names)
    Field { name: String, value: String },
    /// Empty line - signals end of frame
    Empty,
    /// Comment line (starts with ':'), used by servers as keep-alive
    Comment(String),
}

/// Parse a single SSE line into its component type
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }

    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }

    let (name, value) = match line.split_once(':') {
        Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
        None => (line, ""),
    };

    match name {
        "event" => SseLine::Event(value.trim().to_string()),
        "data" => SseLine::Data(value.to_string()),
        _ => SseLine::Field {
            name: name.to_string(),
            value: value.to_string(),
        },
    }
}

/// One complete frame: everything between two blank lines
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    /// Optional `event:` name; the opencode server never sets one
    pub event: Option<String>,
    /// Data lines joined with `\n`
    pub data: String,
}

/// Stateful SSE parser that accumulates lines and emits complete frames
#[derive(Debug, Default)]
pub struct SseParser {
    /// Current event name being accumulated
    current_event: Option<String>,
    /// Accumulated data lines (SSE allows multiple data: lines)
    data_buffer: Vec<String>,
}

impl SseParser {
    /// Create a new SSE parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a line (without its line terminator) to the parser.
    ///
    /// Returns `Some(frame)` when the line completes a frame that carried
    /// data. Frames without data lines are dropped, as SSE requires.
    pub fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        match parse_sse_line(line) {
            SseLine::Event(name) => {
                self.current_event = Some(name);
                None
            }
            SseLine::Data(data) => {
                self.data_buffer.push(data);
                None
            }
            SseLine::Empty => self.take_frame(),
            SseLine::Field { .. } | SseLine::Comment(_) => None,
        }
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        let event = self.current_event.take();
        if self.data_buffer.is_empty() {
            return None;
        }
        let data = self.data_buffer.join("\n");
        self.data_buffer.clear();
        Some(SseFrame { event, data })
    }

    /// Returns true if a frame has been started but not terminated
    pub fn has_partial_frame(&self) -> bool {
        self.current_event.is_some() || !self.data_buffer.is_empty()
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.current_event = None;
        self.data_buffer.clear();
    }
}

fn properties<T: DeserializeOwned>(kind: &str, properties: Value) -> Result<T, SseParseError> {
    serde_json::from_value(properties).map_err(|e| SseParseError::InvalidPayload {
        kind: kind.to_string(),
        detail: e.to_string(),
    })
}

/// Parse a frame's JSON payload into a typed [`Event`].
///
/// Unknown `type` values are not an error; they become [`Event::Unknown`].
pub fn parse_event(data: &str) -> Result<Event, SseParseError> {
    let mut value: Value =
        serde_json::from_str(data).map_err(|e| SseParseError::InvalidJson(e.to_string()))?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(SseParseError::MissingType)?
        .to_string();

    // Absent or null properties decode as an empty object so that every
    // defaulted payload struct accepts them.
    let props = match value.get_mut("properties").map(Value::take) {
        Some(Value::Null) | None => Value::Object(Default::default()),
        Some(props) => props,
    };

    let event = match kind.as_str() {
        "installation.updated" => Event::InstallationUpdated(properties(&kind, props)?),
        "lsp.client.diagnostics" => Event::LspClientDiagnostics(properties(&kind, props)?),
        "message.updated" => Event::MessageUpdated(properties(&kind, props)?),
        "message.removed" => Event::MessageRemoved(properties(&kind, props)?),
        "message.part.updated" => Event::MessagePartUpdated(properties(&kind, props)?),
        "message.part.removed" => Event::MessagePartRemoved(properties(&kind, props)?),
        "session.compacted" => Event::SessionCompacted(properties(&kind, props)?),
        "permission.updated" => Event::PermissionUpdated(properties(&kind, props)?),
        "permission.replied" => Event::PermissionReplied(properties(&kind, props)?),
        "file.edited" => Event::FileEdited(properties(&kind, props)?),
        "file.watcher.updated" => Event::FileWatcherUpdated(properties(&kind, props)?),
        "todo.updated" => Event::TodoUpdated(properties(&kind, props)?),
        "session.idle" => Event::SessionIdle(properties(&kind, props)?),
        "session.created" => Event::SessionCreated(properties(&kind, props)?),
        "session.updated" => Event::SessionUpdated(properties(&kind, props)?),
        "session.deleted" => Event::SessionDeleted(properties(&kind, props)?),
        "session.error" => Event::SessionError(properties(&kind, props)?),
        "server.connected" => Event::ServerConnected,
        "ide.installed" => Event::IdeInstalled(properties(&kind, props)?),
        _ => Event::Unknown {
            kind,
            properties: props,
        },
    };

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::events::KNOWN_EVENT_KINDS;

    // Tests for parse_sse_line

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(parse_sse_line(""), SseLine::Empty);
    }

    #[test]
    fn test_parse_comment_line() {
        assert_eq!(
            parse_sse_line(": keep-alive"),
            SseLine::Comment("keep-alive".to_string())
        );
        assert_eq!(parse_sse_line(":"), SseLine::Comment(String::new()));
    }

    #[test]
    fn test_parse_data_line_strips_single_space() {
        assert_eq!(
            parse_sse_line(r#"data: {"type":"x"}"#),
            SseLine::Data(r#"{"type":"x"}"#.to_string())
        );
        assert_eq!(parse_sse_line("data:  two"), SseLine::Data(" two".to_string()));
        assert_eq!(parse_sse_line("data:raw"), SseLine::Data("raw".to_string()));
    }

    #[test]
    fn test_parse_other_fields() {
        assert_eq!(
            parse_sse_line("retry: 1000"),
            SseLine::Field {
                name: "retry".to_string(),
                value: "1000".to_string()
            }
        );
        assert_eq!(
            parse_sse_line("id"),
            SseLine::Field {
                name: "id".to_string(),
                value: String::new()
            }
        );
    }

    // Tests for SseParser

    #[test]
    fn test_parser_emits_frame_on_blank_line() {
        let mut parser = SseParser::new();
        assert!(parser.feed_line(r#"data: {"type":"server.connected"}"#).is_none());
        assert!(parser.has_partial_frame());

        let frame = parser.feed_line("").unwrap();
        assert_eq!(frame.data, r#"{"type":"server.connected"}"#);
        assert_eq!(frame.event, None);
        assert!(!parser.has_partial_frame());
    }

    #[test]
    fn test_parser_joins_multiline_data() {
        let mut parser = SseParser::new();
        parser.feed_line("event: message");
        parser.feed_line(r#"data: {"type":"#);
        parser.feed_line(r#"data: "file.edited"}"#);
        let frame = parser.feed_line("").unwrap();
        assert_eq!(frame.event.as_deref(), Some("message"));
        assert_eq!(frame.data, "{\"type\":\n\"file.edited\"}");
        assert!(parse_event(&frame.data).is_ok());
    }

    #[test]
    fn test_parser_ignores_frames_without_data() {
        let mut parser = SseParser::new();
        parser.feed_line("event: ping");
        assert!(parser.feed_line("").is_none());
        assert!(parser.feed_line("").is_none());
    }

    #[test]
    fn test_parser_reset() {
        let mut parser = SseParser::new();
        parser.feed_line("data: partial");
        parser.reset();
        assert!(parser.feed_line("").is_none());
    }

    // Tests for parse_event

    #[test]
    fn test_parse_bare_known_kinds() {
        for kind in KNOWN_EVENT_KINDS {
            let data = format!(r#"{{"type":"{}"}}"#, kind);
            let event = parse_event(&data).unwrap();
            assert_eq!(event.kind(), kind);
            assert!(!event.is_unknown(), "{} parsed as unknown", kind);
        }
    }

    #[test]
    fn test_parse_unknown_kind_keeps_properties() {
        let event =
            parse_event(r#"{"type":"some.future.kind","properties":{"a":1}}"#).unwrap();
        match event {
            Event::Unknown { kind, properties } => {
                assert_eq!(kind, "some.future.kind");
                assert_eq!(properties["a"], 1);
            }
            other => panic!("Expected Unknown event, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_message_part_updated() {
        let data = r#"{"type":"message.part.updated","properties":{"part":{"id":"prt_1","sessionID":"ses_1","messageID":"msg_1","type":"text","text":"hi"}}}"#;
        match parse_event(data).unwrap() {
            Event::MessagePartUpdated(part) => {
                assert_eq!(part.id(), Some("prt_1"));
                assert_eq!(part.session_id(), Some("ses_1"));
                assert_eq!(part.message_id(), Some("msg_1"));
                assert_eq!(part.part_type(), Some("text"));
            }
            other => panic!("Expected MessagePartUpdated, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_todo_updated() {
        let data = r#"{"type":"todo.updated","properties":{"sessionID":"ses_1","todos":[{"id":"1","content":"write tests","status":"pending","priority":"high"}]}}"#;
        match parse_event(data).unwrap() {
            Event::TodoUpdated(todos) => {
                assert_eq!(todos.session_id.as_deref(), Some("ses_1"));
                assert_eq!(todos.todos.len(), 1);
                assert_eq!(todos.todos[0].content, "write tests");
            }
            other => panic!("Expected TodoUpdated, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_permission_updated() {
        let data = r#"{"type":"permission.updated","properties":{"id":"per_1","type":"bash","pattern":["git *"],"sessionID":"ses_1","messageID":"msg_1","title":"Run git status","metadata":{},"time":{"created":1}}}"#;
        match parse_event(data).unwrap() {
            Event::PermissionUpdated(permission) => {
                assert_eq!(permission.id.as_deref(), Some("per_1"));
                assert_eq!(permission.permission_type.as_deref(), Some("bash"));
                assert_eq!(permission.title.as_deref(), Some("Run git status"));
                assert!(permission.pattern.unwrap().is_array());
            }
            other => panic!("Expected PermissionUpdated, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_null_properties() {
        let event = parse_event(r#"{"type":"session.idle","properties":null}"#).unwrap();
        assert_eq!(event, Event::SessionIdle(Default::default()));
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_event("{not json"),
            Err(SseParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_parse_missing_type() {
        assert_eq!(
            parse_event(r#"{"properties":{}}"#),
            Err(SseParseError::MissingType)
        );
        assert_eq!(parse_event(r#"{"type":42}"#), Err(SseParseError::MissingType));
    }

    #[test]
    fn test_parse_payload_shape_mismatch() {
        let result = parse_event(r#"{"type":"file.edited","properties":{"file":7}}"#);
        match result {
            Err(SseParseError::InvalidPayload { kind, .. }) => assert_eq!(kind, "file.edited"),
            other => panic!("Expected InvalidPayload, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_display() {
        assert_eq!(
            SseParseError::MissingType.to_string(),
            "Event frame has no type field"
        );
        assert_eq!(
            SseParseError::InvalidPayload {
                kind: "file.edited".to_string(),
                detail: "expected a string".to_string()
            }
            .to_string(),
            "Invalid properties for event 'file.edited': expected a string"
        );        assert_eq!(
            SseParseError::LineTooLong { limit: 16 }.to_string(),
            "Event stream line exceeds 16 bytes"
        );
    }
}
