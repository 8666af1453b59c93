//! Message and part methods for SessionStore

use serde_json::Value;
use tracing::debug;

use crate::sse::{MessagePartUpdated, MessageUpdated};

use super::{CachedMessage, SessionStore};

fn id_of(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

impl SessionStore {
    pub(crate) fn find_message(&self, session_id: &str, message_id: &str) -> Option<&CachedMessage> {
        self.messages
            .get(session_id)?
            .iter()
            .find(|m| m.id == message_id)
    }

    /// Get the message, inserting an empty placeholder if it is not known yet
    fn message_entry(&mut self, session_id: &str, message_id: &str) -> &mut CachedMessage {
        let messages = self.messages.entry(session_id.to_string()).or_default();
        let index = match messages.iter().position(|m| m.id == message_id) {
            Some(index) => index,
            None => {
                messages.push(CachedMessage::placeholder(message_id));
                messages.len() - 1
            }
        };
        &mut messages[index]
    }

    /// Add or update message info. An assistant message without a completion
    /// time marks its session busy; a completed one clears it.
    pub(crate) fn upsert_message(&mut self, event: &MessageUpdated) {
        let (Some(session_id), Some(message_id)) = (event.session_id(), event.id()) else {
            debug!("Ignoring message event without session or id");
            return;
        };

        self.message_entry(session_id, message_id).info = event.info.clone();

        if event.role() == Some("assistant") {
            if event.is_completed() {
                self.busy.remove(session_id);
            } else {
                self.busy.insert(session_id.to_string());
            }
        }
    }

    /// Remove a message. Removing the running assistant message clears the
    /// session's busy flag unless another one is still running.
    pub(crate) fn remove_message(&mut self, session_id: &str, message_id: &str) -> bool {
        let Some(messages) = self.messages.get_mut(session_id) else {
            return false;
        };
        let Some(index) = messages.iter().position(|m| m.id == message_id) else {
            return false;
        };
        let removed = messages.remove(index);

        if removed.is_running() && !messages.iter().any(CachedMessage::is_running) {
            self.busy.remove(session_id);
        }
        true
    }

    /// Add or replace a part under its message
    pub(crate) fn upsert_part(&mut self, event: &MessagePartUpdated) {
        let (Some(session_id), Some(message_id), Some(part_id)) =
            (event.session_id(), event.message_id(), event.id())
        else {
            debug!("Ignoring part event without session, message or id");
            return;
        };

        let message = self.message_entry(session_id, message_id);
        match message.parts.iter_mut().find(|p| id_of(p) == Some(part_id)) {
            Some(existing) => *existing = event.part.clone(),
            None => message.parts.push(event.part.clone()),
        }
    }

    pub(crate) fn remove_part(&mut self, session_id: &str, message_id: &str, part_id: &str) -> bool {
        let Some(message) = self
            .messages
            .get_mut(session_id)
            .and_then(|messages| messages.iter_mut().find(|m| m.id == message_id))
        else {
            return false;
        };
        let before = message.parts.len();
        message.parts.retain(|p| id_of(p) != Some(part_id));
        message.parts.len() < before
    }
}
