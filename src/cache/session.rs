//! Session methods for SessionStore

use tracing::debug;

use crate::sse::SessionInfo;

use super::SessionStore;

impl SessionStore {
    /// Add or update a session and move it to the front of the order
    pub(crate) fn upsert_session(&mut self, event: &SessionInfo) {
        let Some(id) = event.id() else {
            debug!("Ignoring session event without id");
            return;
        };
        let id = id.to_string();

        self.session_order.retain(|existing| existing != &id);
        self.session_order.insert(0, id.clone());
        self.sessions.insert(id, event.info.clone());
    }

    /// Remove a session and everything recorded for it.
    ///
    /// Returns `true` if the session was known.
    pub(crate) fn remove_session(&mut self, session_id: &str) -> bool {
        let existed = self.sessions.remove(session_id).is_some();

        self.session_order.retain(|id| id != session_id);
        self.messages.remove(session_id);
        self.todos.remove(session_id);
        self.permissions.remove(session_id);
        self.busy.remove(session_id);
        self.errors.remove(session_id);

        existed
    }
}

#[cfg(test)]
mod tests {
    use super::super::SessionCache;
    use crate::dispatch::dispatch;
    use crate::sse::parse_event;

    fn feed(cache: &SessionCache, json: &str) {
        dispatch(&parse_event(json).unwrap(), cache);
    }

    fn session_ids(cache: &SessionCache) -> Vec<String> {
        cache
            .sessions()
            .iter()
            .filter_map(|s| s["id"].as_str().map(String::from))
            .collect()
    }

    #[test]
    fn test_created_sessions_are_most_recent_first() {
        let cache = SessionCache::new();
        feed(&cache, r#"{"type":"session.created","properties":{"info":{"id":"a","title":"A"}}}"#);
        feed(&cache, r#"{"type":"session.created","properties":{"info":{"id":"b","title":"B"}}}"#);
        assert_eq!(session_ids(&cache), vec!["b", "a"]);
    }

    #[test]
    fn test_update_moves_session_to_front_and_replaces_info() {
        let cache = SessionCache::new();
        feed(&cache, r#"{"type":"session.created","properties":{"info":{"id":"a","title":"A"}}}"#);
        feed(&cache, r#"{"type":"session.created","properties":{"info":{"id":"b","title":"B"}}}"#);
        feed(
            &cache,
            r#"{"type":"session.updated","properties":{"info":{"id":"a","title":"Renamed"}}}"#,
        );

        assert_eq!(session_ids(&cache), vec!["a", "b"]);
        assert_eq!(cache.session("a").unwrap()["title"], "Renamed");
        assert_eq!(cache.summary().sessions, 2);
    }

    #[test]
    fn test_session_without_id_is_ignored() {
        let cache = SessionCache::new();
        feed(&cache, r#"{"type":"session.created","properties":{"info":{"title":"?"}}}"#);
        assert!(cache.sessions().is_empty());
    }

    #[test]
    fn test_delete_removes_everything_for_session() {
        let cache = SessionCache::new();
        feed(&cache, r#"{"type":"session.created","properties":{"info":{"id":"a"}}}"#);
        feed(&cache, r#"{"type":"session.created","properties":{"info":{"id":"b"}}}"#);
        feed(
            &cache,
            r#"{"type":"message.updated","properties":{"info":{"id":"m1","sessionID":"a","role":"assistant","time":{"created":1}}}}"#,
        );
        feed(
            &cache,
            r#"{"type":"todo.updated","properties":{"sessionID":"a","todos":[{"id":"1","content":"x"}]}}"#,
        );
        feed(
            &cache,
            r#"{"type":"permission.updated","properties":{"id":"p1","sessionID":"a"}}"#,
        );
        assert!(cache.is_busy("a"));

        feed(&cache, r#"{"type":"session.deleted","properties":{"info":{"id":"a"}}}"#);

        assert_eq!(session_ids(&cache), vec!["b"]);
        assert!(cache.session("a").is_none());
        assert!(cache.messages("a").is_empty());
        assert!(cache.todos("a").is_empty());
        assert!(cache.pending_permissions("a").is_empty());
        assert!(!cache.is_busy("a"));
    }

    #[test]
    fn test_remove_unknown_session_reports_false() {
        let mut store = super::SessionStore::default();
        assert!(!store.remove_session("missing"));
    }
}
