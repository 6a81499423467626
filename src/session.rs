//! Session model consumed by the gate.
//!
//! The gate never writes sessions. It resolves one named session per request
//! through a [`SessionStore`] and reads a single value from it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{SessionError, StoreError};
use crate::request::RequestContext;

/// A value stored in a session.
///
/// Stores may hold anything; only [`SessionValue::Text`] is accepted as an
/// expected CSRF token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionValue {
    /// UTF-8 text
    Text(String),
    /// Signed integer
    Integer(i64),
    /// Boolean flag
    Boolean(bool),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl SessionValue {
    /// Returns the text if this value is [`SessionValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SessionValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for SessionValue {
    fn from(value: &str) -> Self {
        SessionValue::Text(value.to_string())
    }
}

impl From<String> for SessionValue {
    fn from(value: String) -> Self {
        SessionValue::Text(value)
    }
}

impl From<i64> for SessionValue {
    fn from(value: i64) -> Self {
        SessionValue::Integer(value)
    }
}

impl From<bool> for SessionValue {
    fn from(value: bool) -> Self {
        SessionValue::Boolean(value)
    }
}

impl From<Vec<u8>> for SessionValue {
    fn from(value: Vec<u8>) -> Self {
        SessionValue::Bytes(value)
    }
}

/// A resolved session: a name plus its value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    name: String,
    values: HashMap<String, SessionValue>,
}

impl Session {
    /// Creates an empty session.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<SessionValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SessionValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns the session name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&SessionValue> {
        self.values.get(key)
    }

    /// Returns the full value mapping.
    pub fn values(&self) -> &HashMap<String, SessionValue> {
        &self.values
    }
}

/// Resolves the session belonging to a request.
///
/// Implementations own cookie transport and persistence. `get` is called on
/// every protected request, concurrently, and should return promptly.
pub trait SessionStore: Send + Sync {
    /// Resolves the session named `name` for `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the session is missing, expired, or the
    /// backend fails.
    fn get(&self, request: &RequestContext, name: &str) -> Result<Session, SessionError>;
}

/// The application surrounding the gate.
///
/// The gate asks its host for a session store once at initialization and
/// registers its error kinds with the host's reporter.
pub trait GateHost: Send + Sync {
    /// Acquires the session store.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if no store can be provided. The gate stays
    /// up and rejects protected requests instead.
    fn session_store(&self) -> Result<Arc<dyn SessionStore>, StoreError>;

    /// Returns the reporter used to register and render rejections.
    fn error_reporter(&self) -> &dyn crate::error::ErrorReporter;
}

/// In-memory session store keyed by a session ID carried in a request header.
///
/// Useful for tests and single-process hosts. Sessions are looked up by
/// `(session id, session name)`.
///
/// Every map update is a single insert or retain, so a panic in another
/// thread cannot leave the map half-written; a poisoned lock is recovered
/// rather than treated as a failure.
///
/// # Examples
///
/// ```
/// use csrf_gate::{MemorySessionStore, RequestContext, Session, SessionStore};
///
/// let store = MemorySessionStore::new("X-Session-Id");
/// store.put("sid-1", Session::new("default").with_value("csrf_token", "abc123"));
///
/// let request = RequestContext::new("req-1", "save").with_header("X-Session-Id", "sid-1");
/// let session = store.get(&request, "default").unwrap();
/// assert_eq!(session.get("csrf_token").and_then(|v| v.as_text()), Some("abc123"));
/// ```
#[derive(Debug)]
pub struct MemorySessionStore {
    id_header: String,
    sessions: RwLock<HashMap<(String, String), Session>>,
}

impl MemorySessionStore {
    /// Creates an empty store reading session IDs from `id_header`.
    pub fn new(id_header: impl Into<String>) -> Self {
        Self {
            id_header: id_header.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<(String, String), Session>> {
        self.sessions.read().unwrap_or_else(|poisoned| {
            tracing::warn!("session store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<(String, String), Session>> {
        self.sessions.write().unwrap_or_else(|poisoned| {
            tracing::warn!("session store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Stores `session` under `session_id`, replacing any session with the
    /// same ID and name.
    pub fn put(&self, session_id: impl Into<String>, session: Session) {
        let key = (session_id.into(), session.name().to_string());
        self.write().insert(key, session);
    }

    /// Removes every session stored under `session_id`.
    pub fn remove(&self, session_id: &str) {
        self.write().retain(|(id, _), _| id != session_id);
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, request: &RequestContext, name: &str) -> Result<Session, SessionError> {
        let session_id = request
            .header(&self.id_header)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SessionError::NotFound(name.to_string()))?;

        self.read()
            .get(&(session_id.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| SessionError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_sid(sid: &str) -> RequestContext {
        RequestContext::new("req-1", "save").with_header("X-Session-Id", sid)
    }

    #[test]
    fn as_text_only_accepts_text() {
        assert_eq!(SessionValue::from("abc").as_text(), Some("abc"));
        assert_eq!(SessionValue::from(42i64).as_text(), None);
        assert_eq!(SessionValue::from(true).as_text(), None);
        assert_eq!(SessionValue::from(vec![1u8, 2]).as_text(), None);
    }

    #[test]
    fn session_insert_replaces_value() {
        let mut session = Session::new("default").with_value("k", "v1");
        session.insert("k", "v2");
        assert_eq!(session.get("k"), Some(&SessionValue::Text("v2".into())));
        assert_eq!(session.values().len(), 1);
    }

    #[test]
    fn memory_store_resolves_by_id_and_name() {
        let store = MemorySessionStore::new("X-Session-Id");
        store.put("sid-1", Session::new("default").with_value("csrf_token", "a"));
        store.put("sid-1", Session::new("admin").with_value("csrf_token", "b"));
        assert_eq!(store.len(), 2);

        let default = store.get(&request_with_sid("sid-1"), "default").unwrap();
        let admin = store.get(&request_with_sid("sid-1"), "admin").unwrap();
        assert_eq!(default.get("csrf_token").and_then(|v| v.as_text()), Some("a"));
        assert_eq!(admin.get("csrf_token").and_then(|v| v.as_text()), Some("b"));
    }

    #[test]
    fn memory_store_without_session_id_is_not_found() {
        let store = MemorySessionStore::new("X-Session-Id");
        let request = RequestContext::new("req-1", "save");
        assert_eq!(
            store.get(&request, "default"),
            Err(SessionError::NotFound("default".into()))
        );
    }

    #[test]
    fn memory_store_unknown_id_is_not_found() {
        let store = MemorySessionStore::new("X-Session-Id");
        store.put("sid-1", Session::new("default"));
        assert!(store.get(&request_with_sid("sid-2"), "default").is_err());
    }

    #[test]
    fn memory_store_remove_drops_all_names() {
        let store = MemorySessionStore::new("X-Session-Id");
        store.put("sid-1", Session::new("default"));
        store.put("sid-1", Session::new("admin"));
        store.put("sid-2", Session::new("default"));

        store.remove("sid-1");
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn memory_store_survives_poisoned_lock() {
        let store = Arc::new(MemorySessionStore::new("X-Session-Id"));
        store.put("sid-1", Session::new("default").with_value("csrf_token", "a"));

        let poisoner = Arc::clone(&store);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.sessions.write().unwrap();
            panic!("writer panicked while holding the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(store.sessions.is_poisoned());

        let session = store.get(&request_with_sid("sid-1"), "default").unwrap();
        assert_eq!(session.get("csrf_token").and_then(|v| v.as_text()), Some("a"));

        store.put("sid-2", Session::new("default"));
        assert_eq!(store.len(), 2);

        store.remove("sid-1");
        assert_eq!(store.len(), 1);
        assert!(store.get(&request_with_sid("sid-1"), "default").is_err());
        assert!(store.get(&request_with_sid("sid-2"), "default").is_ok());
    }
}
