//! Event types and definitions
//!
//! Contains the [`Event`] enum with every event kind the opencode server
//! publishes on `/event`, plus the payload structs carried in each event's
//! `properties` object.
//!
//! Payloads are deliberately lenient: every field is optional or defaulted,
//! so a frame like `{"type":"session.created"}` still decodes. Nested SDK
//! objects (session info, message info, message parts) stay as raw JSON with
//! accessors for the handful of fields routing needs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire tags of every event kind the dispatcher knows about.
pub const KNOWN_EVENT_KINDS: [&str; 19] = [
    "installation.updated",
    "lsp.client.diagnostics",
    "message.updated",
    "message.removed",
    "message.part.updated",
    "message.part.removed",
    "session.compacted",
    "permission.updated",
    "permission.replied",
    "file.edited",
    "file.watcher.updated",
    "todo.updated",
    "session.idle",
    "session.created",
    "session.updated",
    "session.deleted",
    "session.error",
    "server.connected",
    "ide.installed",
];

/// Look up a string at a `/`-separated path inside a JSON value.
fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// A typed event from the opencode event stream
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    InstallationUpdated(InstallationUpdated),
    LspClientDiagnostics(LspClientDiagnostics),
    MessageUpdated(MessageUpdated),
    MessageRemoved(MessageRemoved),
    MessagePartUpdated(MessagePartUpdated),
    MessagePartRemoved(MessagePartRemoved),
    SessionCompacted(SessionRef),
    PermissionUpdated(PermissionUpdated),
    PermissionReplied(PermissionReplied),
    FileEdited(FileEdited),
    FileWatcherUpdated(FileWatcherUpdated),
    TodoUpdated(TodoUpdated),
    SessionIdle(SessionRef),
    SessionCreated(SessionInfo),
    SessionUpdated(SessionInfo),
    SessionDeleted(SessionInfo),
    SessionError(SessionError),
    ServerConnected,
    IdeInstalled(IdeInstalled),
    /// An event kind this client does not know yet. Kept so newer servers
    /// never break older clients.
    Unknown { kind: String, properties: Value },
}

impl Event {
    /// Returns the wire tag (`type` field) of this event.
    pub fn kind(&self) -> &str {
        match self {
            Event::InstallationUpdated(_) => "installation.updated",
            Event::LspClientDiagnostics(_) => "lsp.client.diagnostics",
            Event::MessageUpdated(_) => "message.updated",
            Event::MessageRemoved(_) => "message.removed",
            Event::MessagePartUpdated(_) => "message.part.updated",
            Event::MessagePartRemoved(_) => "message.part.removed",
            Event::SessionCompacted(_) => "session.compacted",
            Event::PermissionUpdated(_) => "permission.updated",
            Event::PermissionReplied(_) => "permission.replied",
            Event::FileEdited(_) => "file.edited",
            Event::FileWatcherUpdated(_) => "file.watcher.updated",
            Event::TodoUpdated(_) => "todo.updated",
            Event::SessionIdle(_) => "session.idle",
            Event::SessionCreated(_) => "session.created",
            Event::SessionUpdated(_) => "session.updated",
            Event::SessionDeleted(_) => "session.deleted",
            Event::SessionError(_) => "session.error",
            Event::ServerConnected => "server.connected",
            Event::IdeInstalled(_) => "ide.installed",
            Event::Unknown { kind, .. } => kind,
        }
    }

    /// Returns true if this is an event kind the client does not recognize.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Event::Unknown { .. })
    }

    /// The session this event belongs to, when it names one.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Event::MessageUpdated(e) => e.session_id(),
            Event::MessageRemoved(e) => e.session_id.as_deref(),
            Event::MessagePartUpdated(e) => e.session_id(),
            Event::MessagePartRemoved(e) => e.session_id.as_deref(),
            Event::SessionCompacted(e) | Event::SessionIdle(e) => e.session_id.as_deref(),
            Event::PermissionUpdated(e) => e.session_id.as_deref(),
            Event::PermissionReplied(e) => e.session_id.as_deref(),
            Event::TodoUpdated(e) => e.session_id.as_deref(),
            Event::SessionCreated(e) | Event::SessionUpdated(e) | Event::SessionDeleted(e) => {
                e.id()
            }
            Event::SessionError(e) => e.session_id.as_deref(),
            Event::InstallationUpdated(_)
            | Event::LspClientDiagnostics(_)
            | Event::FileEdited(_)
            | Event::FileWatcherUpdated(_)
            | Event::ServerConnected
            | Event::IdeInstalled(_)
            | Event::Unknown { .. } => None,
        }
    }
}

/// A new opencode version was installed on the server host
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallationUpdated {
    pub version: Option<String>,
}

/// A language server published diagnostics for a file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LspClientDiagnostics {
    #[serde(rename = "serverID")]
    pub server_id: Option<String>,
    pub path: Option<String>,
}

/// Message metadata was created or changed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageUpdated {
    /// Raw message info object as published by the server
    pub info: Value,
}

impl MessageUpdated {
    pub fn id(&self) -> Option<&str> {
        str_at(&self.info, "/id")
    }

    pub fn session_id(&self) -> Option<&str> {
        str_at(&self.info, "/sessionID")
    }

    /// `user` or `assistant`
    pub fn role(&self) -> Option<&str> {
        str_at(&self.info, "/role")
    }

    /// Assistant messages carry `time.completed` once generation finished.
    pub fn is_completed(&self) -> bool {
        self.info
            .pointer("/time/completed")
            .is_some_and(|v| !v.is_null())
    }
}

/// A message was deleted from a session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageRemoved {
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
    #[serde(rename = "messageID")]
    pub message_id: Option<String>,
}

/// A message part (text, tool call, reasoning, file, patch...) changed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagePartUpdated {
    /// Raw part object as published by the server
    pub part: Value,
}

impl MessagePartUpdated {
    pub fn id(&self) -> Option<&str> {
        str_at(&self.part, "/id")
    }

    pub fn session_id(&self) -> Option<&str> {
        str_at(&self.part, "/sessionID")
    }

    pub fn message_id(&self) -> Option<&str> {
        str_at(&self.part, "/messageID")
    }

    /// Part type tag, e.g. `text`, `tool`, `reasoning`
    pub fn part_type(&self) -> Option<&str> {
        str_at(&self.part, "/type")
    }
}

/// A message part was deleted
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagePartRemoved {
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
    #[serde(rename = "messageID")]
    pub message_id: Option<String>,
    #[serde(rename = "partID")]
    pub part_id: Option<String>,
}

/// Payload of events that only name a session (`session.idle`, `session.compacted`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRef {
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
}

/// The agent asks for permission to run a tool
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionUpdated {
    pub id: Option<String>,
    /// Permission type, e.g. `bash` or `edit`
    #[serde(rename = "type")]
    pub permission_type: Option<String>,
    /// A single pattern or a list of patterns
    pub pattern: Option<Value>,
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
    #[serde(rename = "messageID")]
    pub message_id: Option<String>,
    #[serde(rename = "callID")]
    pub call_id: Option<String>,
    pub title: Option<String>,
    pub metadata: Value,
}

/// A permission request was answered
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionReplied {
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
    #[serde(rename = "permissionID")]
    pub permission_id: Option<String>,
    /// `once`, `always` or `reject`
    pub response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEdited {
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWatcherUpdated {
    pub file: Option<String>,
    /// `add`, `change` or `unlink`
    pub event: Option<String>,
}

/// A single todo entry maintained by the agent
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Todo {
    pub id: String,
    pub content: String,
    pub status: String,
    pub priority: String,
}

/// The agent's todo list for a session was replaced
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoUpdated {
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
    pub todos: Vec<Todo>,
}

/// Payload of `session.created`, `session.updated` and `session.deleted`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInfo {
    /// Raw session object as published by the server
    pub info: Value,
}

impl SessionInfo {
    pub fn id(&self) -> Option<&str> {
        str_at(&self.info, "/id")
    }

    pub fn title(&self) -> Option<&str> {
        str_at(&self.info, "/title")
    }

    /// Last update time in milliseconds since the epoch
    pub fn updated_at(&self) -> Option<i64> {
        self.info.pointer("/time/updated").and_then(Value::as_i64)
    }
}

/// A session failed, optionally naming the session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionError {
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
    pub error: Option<Value>,
}

impl SessionError {
    /// Human readable error text: `error.data.message`, falling back to `error.name`.
    pub fn message(&self) -> Option<&str> {
        let error = self.error.as_ref()?;
        str_at(error, "/data/message").or_else(|| str_at(error, "/name"))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdeInstalled {
    pub ide: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_kinds_are_unique() {
        let mut kinds = KNOWN_EVENT_KINDS.to_vec();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), KNOWN_EVENT_KINDS.len());
    }

    #[test]
    fn test_unknown_kind_reports_its_tag() {
        let event = Event::Unknown {
            kind: "some.future.kind".to_string(),
            properties: Value::Null,
        };
        assert_eq!(event.kind(), "some.future.kind");
        assert!(event.is_unknown());
        assert_eq!(event.session_id(), None);
    }

    #[test]
    fn test_message_accessors() {
        let msg = MessageUpdated {
            info: json!({
                "id": "msg_1",
                "sessionID": "ses_1",
                "role": "assistant",
                "time": {"created": 1, "completed": 2}
            }),
        };
        assert_eq!(msg.id(), Some("msg_1"));
        assert_eq!(msg.session_id(), Some("ses_1"));
        assert_eq!(msg.role(), Some("assistant"));
        assert!(msg.is_completed());

        let pending = MessageUpdated {
            info: json!({"id": "msg_2", "time": {"created": 1}}),
        };
        assert!(!pending.is_completed());
    }

    #[test]
    fn test_session_error_message_fallbacks() {
        let with_data = SessionError {
            session_id: None,
            error: Some(json!({"name": "ProviderAuthError", "data": {"message": "bad key"}})),
        };
        assert_eq!(with_data.message(), Some("bad key"));

        let name_only = SessionError {
            session_id: None,
            error: Some(json!({"name": "MessageAbortedError"})),
        };
        assert_eq!(name_only.message(), Some("MessageAbortedError"));

        assert_eq!(SessionError::default().message(), None);
    }

    #[test]
    fn test_session_id_for_session_lifecycle_uses_info_id() {
        let event = Event::SessionDeleted(SessionInfo {
            info: json!({"id": "ses_9", "title": "t"}),
        });
        assert_eq!(event.session_id(), Some("ses_9"));
        assert_eq!(event.kind(), "session.deleted");
    }
}
