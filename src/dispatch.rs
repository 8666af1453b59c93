//! Event routing.
//!
//! [`dispatch`] routes one [`Event`] to the matching method of an
//! [`EventHandler`]. Every handler method defaults to a no-op, so an
//! application only implements the kinds it cares about. Unknown kinds are
//! ignored: servers add event kinds faster than clients ship.

use std::sync::Arc;

use tracing::trace;

use crate::sse::{
    Event, FileEdited, FileWatcherUpdated, IdeInstalled, InstallationUpdated, LspClientDiagnostics,
    MessagePartRemoved, MessagePartUpdated, MessageRemoved, MessageUpdated, PermissionReplied,
    PermissionUpdated, SessionError, SessionInfo, SessionRef, TodoUpdated,
};

/// Receiver of routed events.
///
/// Methods are called from the event loop task, one event at a time, in
/// arrival order. They should return quickly; slow work belongs on another
/// task.
#[allow(unused_variables)]
pub trait EventHandler: Send + Sync {
    /// Entry point used by [`dispatch`]. The default routes to the per-kind
    /// methods below; override it to observe every known event.
    fn handle(&self, event: &Event) {
        route(self, event);
    }

    fn on_installation_updated(&self, event: &InstallationUpdated) {}
    fn on_lsp_client_diagnostics(&self, event: &LspClientDiagnostics) {}
    fn on_message_updated(&self, event: &MessageUpdated) {}
    fn on_message_removed(&self, event: &MessageRemoved) {}
    fn on_message_part_updated(&self, event: &MessagePartUpdated) {}
    fn on_message_part_removed(&self, event: &MessagePartRemoved) {}
    fn on_session_compacted(&self, event: &SessionRef) {}
    fn on_permission_updated(&self, event: &PermissionUpdated) {}
    fn on_permission_replied(&self, event: &PermissionReplied) {}
    fn on_file_edited(&self, event: &FileEdited) {}
    fn on_file_watcher_updated(&self, event: &FileWatcherUpdated) {}
    fn on_todo_updated(&self, event: &TodoUpdated) {}
    fn on_session_idle(&self, event: &SessionRef) {}
    fn on_session_created(&self, event: &SessionInfo) {}
    fn on_session_updated(&self, event: &SessionInfo) {}
    fn on_session_deleted(&self, event: &SessionInfo) {}
    fn on_session_error(&self, event: &SessionError) {}
    fn on_server_connected(&self) {}
    fn on_ide_installed(&self, event: &IdeInstalled) {}
}

/// Call the per-kind method of `handler` matching `event`.
pub fn route<H: EventHandler + ?Sized>(handler: &H, event: &Event) {
    match event {
        Event::InstallationUpdated(e) => handler.on_installation_updated(e),
        Event::LspClientDiagnostics(e) => handler.on_lsp_client_diagnostics(e),
        Event::MessageUpdated(e) => handler.on_message_updated(e),
        Event::MessageRemoved(e) => handler.on_message_removed(e),
        Event::MessagePartUpdated(e) => handler.on_message_part_updated(e),
        Event::MessagePartRemoved(e) => handler.on_message_part_removed(e),
        Event::SessionCompacted(e) => handler.on_session_compacted(e),
        Event::PermissionUpdated(e) => handler.on_permission_updated(e),
        Event::PermissionReplied(e) => handler.on_permission_replied(e),
        Event::FileEdited(e) => handler.on_file_edited(e),
        Event::FileWatcherUpdated(e) => handler.on_file_watcher_updated(e),
        Event::TodoUpdated(e) => handler.on_todo_updated(e),
        Event::SessionIdle(e) => handler.on_session_idle(e),
        Event::SessionCreated(e) => handler.on_session_created(e),
        Event::SessionUpdated(e) => handler.on_session_updated(e),
        Event::SessionDeleted(e) => handler.on_session_deleted(e),
        Event::SessionError(e) => handler.on_session_error(e),
        Event::ServerConnected => handler.on_server_connected(),
        Event::IdeInstalled(e) => handler.on_ide_installed(e),
        Event::Unknown { .. } => {}
    }
}

/// Route `event` to `handler`.
///
/// Returns `false` without touching the handler when the event kind is
/// unknown.
pub fn dispatch<H: EventHandler + ?Sized>(event: &Event, handler: &H) -> bool {
    if event.is_unknown() {
        trace!(kind = event.kind(), "Ignoring unknown event kind");
        return false;
    }
    handler.handle(event);
    true
}

/// Fans every event out to several handlers, in registration order.
#[derive(Default, Clone)]
pub struct HandlerSet {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn push(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl EventHandler for HandlerSet {
    fn handle(&self, event: &Event) {
        for handler in &self.handlers {
            handler.handle(event);
        }
    }
}

/// A handler that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl EventHandler for NoopHandler {}
