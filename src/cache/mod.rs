//! In-memory session cache
//!
//! [`SessionCache`] is an [`EventHandler`] that folds the event stream into a
//! local picture of the server: sessions, their messages and parts, todo
//! lists, pending permissions and busy/idle status. Readers get snapshots;
//! the event loop holds the write lock only for the duration of one event.

mod message;
mod session;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::debug;

use crate::dispatch::EventHandler;
use crate::sse::{
    MessagePartRemoved, MessagePartUpdated, MessageRemoved, MessageUpdated, PermissionReplied,
    PermissionUpdated, SessionError, SessionInfo, SessionRef, Todo, TodoUpdated,
};

/// A message and the parts received for it so far
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CachedMessage {
    pub id: String,
    /// Raw message info; `Value::Null` while only parts have been seen
    pub info: Value,
    /// Raw part objects in arrival order
    pub parts: Vec<Value>,
}

impl CachedMessage {
    fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn role(&self) -> Option<&str> {
        self.info.get("role").and_then(Value::as_str)
    }

    /// True until the message info has been received
    pub fn is_placeholder(&self) -> bool {
        self.info.is_null()
    }

    /// An assistant message still being generated
    pub fn is_running(&self) -> bool {
        self.role() == Some("assistant")
            && self
                .info
                .pointer("/time/completed")
                .map_or(true, Value::is_null)
    }
}

/// Counts for a one-line overview of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheSummary {
    pub sessions: usize,
    pub messages: usize,
    pub busy: usize,
    pub pending_permissions: usize,
}

impl fmt::Display for CacheSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sessions, {} messages, {} busy, {} pending permissions",
            self.sessions, self.messages, self.busy, self.pending_permissions
        )
    }
}

/// Cache state, mutated one event at a time
#[derive(Debug, Default)]
pub(crate) struct SessionStore {
    /// Raw session info indexed by session ID
    pub(crate) sessions: HashMap<String, Value>,
    /// Order of session IDs (most recently updated first)
    pub(crate) session_order: Vec<String>,
    /// Messages per session, in arrival order
    pub(crate) messages: HashMap<String, Vec<CachedMessage>>,
    pub(crate) todos: HashMap<String, Vec<Todo>>,
    /// Unanswered permission requests per session
    pub(crate) permissions: HashMap<String, Vec<PermissionUpdated>>,
    /// Sessions with an assistant message still generating
    pub(crate) busy: HashSet<String>,
    pub(crate) errors: HashMap<String, String>,
    /// Last error not tied to any session
    pub(crate) global_error: Option<String>,
}

impl SessionStore {
    fn record_error(&mut self, event: &SessionError) {
        let message = event
            .message()
            .unwrap_or("unknown error")
            .to_string();
        match &event.session_id {
            Some(session_id) => {
                self.busy.remove(session_id);
                self.errors.insert(session_id.clone(), message);
            }
            None => self.global_error = Some(message),
        }
    }

    fn summary(&self) -> CacheSummary {
        CacheSummary {
            sessions: self.sessions.len(),
            messages: self.messages.values().map(Vec::len).sum(),
            busy: self.busy.len(),
            pending_permissions: self.permissions.values().map(Vec::len).sum(),
        }
    }
}

/// Shared, event-driven view of the server's sessions.
///
/// Register it with the event loop (directly or through a
/// [`HandlerSet`](crate::dispatch::HandlerSet)) and query it from anywhere.
#[derive(Debug, Default)]
pub struct SessionCache {
    store: RwLock<SessionStore>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// All sessions, most recently updated first
    pub fn sessions(&self) -> Vec<Value> {
        let store = self.read();
        store
            .session_order
            .iter()
            .filter_map(|id| store.sessions.get(id).cloned())
            .collect()
    }

    pub fn session(&self, session_id: &str) -> Option<Value> {
        self.read().sessions.get(session_id).cloned()
    }

    pub fn messages(&self, session_id: &str) -> Vec<CachedMessage> {
        self.read()
            .messages
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn parts(&self, session_id: &str, message_id: &str) -> Vec<Value> {
        self.read()
            .find_message(session_id, message_id)
            .map(|m| m.parts.clone())
            .unwrap_or_default()
    }

    pub fn todos(&self, session_id: &str) -> Vec<Todo> {
        self.read().todos.get(session_id).cloned().unwrap_or_default()
    }

    pub fn pending_permissions(&self, session_id: &str) -> Vec<PermissionUpdated> {
        self.read()
            .permissions
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether an assistant message in the session is still generating
    pub fn is_busy(&self, session_id: &str) -> bool {
        self.read().busy.contains(session_id)
    }

    /// Last error reported for `session_id`, or for no particular session
    /// when `None`
    pub fn last_error(&self, session_id: Option<&str>) -> Option<String> {
        let store = self.read();
        match session_id {
            Some(id) => store.errors.get(id).cloned(),
            None => store.global_error.clone(),
        }
    }

    pub fn summary(&self) -> CacheSummary {
        self.read().summary()
    }
}

impl EventHandler for SessionCache {
    fn on_session_created(&self, event: &SessionInfo) {
        self.write().upsert_session(event);
    }

    fn on_session_updated(&self, event: &SessionInfo) {
        self.write().upsert_session(event);
    }

    fn on_session_deleted(&self, event: &SessionInfo) {
        if let Some(id) = event.id() {
            self.write().remove_session(id);
        }
    }

    fn on_session_idle(&self, event: &SessionRef) {
        if let Some(id) = &event.session_id {
            self.write().busy.remove(id);
        }
    }

    fn on_session_error(&self, event: &SessionError) {
        self.write().record_error(event);
    }

    fn on_message_updated(&self, event: &MessageUpdated) {
        self.write().upsert_message(event);
    }

    fn on_message_removed(&self, event: &MessageRemoved) {
        if let (Some(session_id), Some(message_id)) = (&event.session_id, &event.message_id) {
            self.write().remove_message(session_id, message_id);
        }
    }

    fn on_message_part_updated(&self, event: &MessagePartUpdated) {
        self.write().upsert_part(event);
    }

    fn on_message_part_removed(&self, event: &MessagePartRemoved) {
        if let (Some(session_id), Some(message_id), Some(part_id)) =
            (&event.session_id, &event.message_id, &event.part_id)
        {
            self.write().remove_part(session_id, message_id, part_id);
        }
    }

    fn on_todo_updated(&self, event: &TodoUpdated) {
        if let Some(session_id) = &event.session_id {
            self.write()
                .todos
                .insert(session_id.clone(), event.todos.clone());
        }
    }

    fn on_permission_updated(&self, event: &PermissionUpdated) {
        let (Some(session_id), Some(id)) = (&event.session_id, &event.id) else {
            debug!("Ignoring permission request without session or id");
            return;
        };
        let mut store = self.write();
        let pending = store.permissions.entry(session_id.clone()).or_default();
        match pending.iter_mut().find(|p| p.id.as_deref() == Some(id.as_str())) {
            Some(existing) => *existing = event.clone(),
            None => pending.push(event.clone()),
        }
    }

    fn on_permission_replied(&self, event: &PermissionReplied) {
        let (Some(session_id), Some(permission_id)) = (&event.session_id, &event.permission_id)
        else {
            return;
        };
        let mut store = self.write();
        if let Some(pending) = store.permissions.get_mut(session_id) {
            pending.retain(|p| p.id.as_deref() != Some(permission_id.as_str()));
            if pending.is_empty() {
                store.permissions.remove(session_id);
            }
        }
    }
}
