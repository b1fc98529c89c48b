use crate::session::WizardSession;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Registry of wizard sessions, one per authenticated principal.
///
/// The registry lock is held only long enough to hand out the per-session
/// handle; every request then serializes on the session's own mutex, so
/// two tabs submitting the same step can never interleave partial
/// mutations.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Mutex<WizardSession>>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        SessionStore::default()
    }

    /// Fetch (or lazily create) the session handle for a principal.
    pub fn session(&self, principal: &str) -> Arc<Mutex<WizardSession>> {
        let mut sessions = self.sessions.lock().expect("session registry poisoned");
        sessions
            .entry(principal.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(WizardSession::new())))
            .clone()
    }

    /// Drop a principal's session entirely (logout).
    pub fn remove(&self, principal: &str) {
        let mut sessions = self.sessions.lock().expect("session registry poisoned");
        sessions.remove(principal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_principal_same_session() {
        let store = SessionStore::new();
        let a = store.session("u1");
        let b = store.session("u1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_principals_get_distinct_sessions() {
        let store = SessionStore::new();
        let a = store.session("u1");
        let b = store.session("u2");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_remove_forgets_the_session() {
        let store = SessionStore::new();
        let a = store.session("u1");
        store.remove("u1");
        let b = store.session("u1");
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
