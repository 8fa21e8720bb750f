use crate::{Session, SessionStore};
use smls_core::PendingAuthorization;
use async_trait::async_trait;
use smls_core::AuthError;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps sessions in process memory. Sessions are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired session and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        before - sessions.len()
    }

    /// Number of stored sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no session.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_session(&self, id: &str) -> Result<Option<Session>, AuthError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(id)
            .filter(|session| !session.is_expired())
            .cloned())
    }

    async fn save_session(&self, session: &Session) -> Result<(), AuthError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<(), AuthError> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn take_pending(&self, id: &str) -> Result<Option<PendingAuthorization>, AuthError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions
            .get_mut(id)
            .filter(|session| !session.is_expired())
            .and_then(|session| session.data.take_pending()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use smls_core::Provider;
    use std::sync::Arc;

    fn pending() -> PendingAuthorization {
        PendingAuthorization {
            provider: Provider::Google,
            state: "state".into(),
            code_verifier: Some("verifier".into()),
            redirect_uri: "http://localhost:5000/auth/google/callback".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_load_delete() {
        let store = MemoryStore::new();
        let mut session = Session::new(Duration::hours(1));
        session.data.flash(crate::FlashLevel::Info, "hello");
        store.save_session(&session).await.unwrap();

        let loaded = store.load_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.data.flash.len(), 1);

        store.delete_session(&session.id).await.unwrap();
        assert!(store.load_session(&session.id).await.unwrap().is_none());
        store.delete_session("unknown").await.unwrap();
    }

    #[tokio::test]
    async fn expired_sessions_are_not_loaded() {
        let store = MemoryStore::new();
        let session = Session::new(Duration::seconds(-5));
        store.save_session(&session).await.unwrap();

        assert!(store.load_session(&session.id).await.unwrap().is_none());
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn saving_replaces_previous_state() {
        let store = MemoryStore::new();
        let mut session = Session::new(Duration::hours(1));
        store.save_session(&session).await.unwrap();

        session.data.set_credentials(
            Provider::LinkedIn,
            smls_core::ClientCredentials::new("li-client", "li-secret"),
        );
        store.save_session(&session).await.unwrap();

        let loaded = store.load_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.data.configured_providers(), vec![Provider::LinkedIn]);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_takes_hand_out_the_pending_flow_once() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..20 {
            let mut session = Session::new(Duration::hours(1));
            session.data.pending = Some(pending());
            store.save_session(&session).await.unwrap();

            let takers: Vec<_> = (0..8)
                .map(|_| {
                    let store = store.clone();
                    let id = session.id.clone();
                    tokio::spawn(async move { store.take_pending(&id).await.unwrap() })
                })
                .collect();

            let mut taken = 0;
            for taker in takers {
                if taker.await.unwrap().is_some() {
                    taken += 1;
                }
            }
            assert_eq!(taken, 1);

            let stored = store.load_session(&session.id).await.unwrap().unwrap();
            assert!(stored.data.pending.is_none());
        }
    }

    #[tokio::test]
    async fn take_pending_ignores_unknown_and_expired_sessions() {
        let store = MemoryStore::new();
        assert!(store.take_pending("unknown").await.unwrap().is_none());

        let mut session = Session::new(Duration::seconds(-5));
        session.data.pending = Some(pending());
        store.save_session(&session).await.unwrap();
        assert!(store.take_pending(&session.id).await.unwrap().is_none());
    }
}
