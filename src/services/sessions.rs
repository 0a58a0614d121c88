use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use vocab_review_algo::Offsets;

use crate::auth::SessionKey;
use crate::services::trainer::{TrainerError, TrainerSession, TrainerView};

pub type SharedSession = Arc<Mutex<TrainerSession>>;

/// Trainer sessions keyed by session identity. Each session sits behind its own
/// mutex, held for the whole of an operation.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionKey, SharedSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `source` for `key`. The session the key had open before is
    /// closed only once the new one is in place; a failed open leaves it alone.
    pub async fn open(
        &self,
        key: SessionKey,
        data_dir: &Path,
        source: &str,
        default_offsets: Offsets,
    ) -> Result<TrainerView, TrainerError> {
        let (session, view) =
            TrainerSession::open(data_dir, &key, source, default_offsets).await?;
        let replaced = self
            .sessions
            .write()
            .insert(key, Arc::new(Mutex::new(session)));

        if let Some(replaced) = replaced {
            replaced.lock().await.close().await;
        }
        Ok(view)
    }

    pub fn get(&self, key: &SessionKey) -> Result<SharedSession, TrainerError> {
        self.sessions
            .read()
            .get(key)
            .cloned()
            .ok_or(TrainerError::SessionNotFound)
    }

    /// Persists and drops the session. Returns whether one existed.
    pub async fn remove(&self, key: &SessionKey) -> bool {
        match self.take(key) {
            Some(session) => {
                session.lock().await.close().await;
                true
            }
            None => false,
        }
    }

    /// Tears down every session bound to `source` without persisting.
    pub async fn close_source(&self, source: &str) -> usize {
        let mut closed = 0;
        for (key, session) in self.entries() {
            let mut guard = session.lock().await;
            if guard.source_name() != source {
                continue;
            }
            guard.mark_closed();
            drop(guard);
            self.remove_if_same(&key, &session);
            closed += 1;
        }
        if closed > 0 {
            tracing::info!(source = %source, sessions = closed, "sessions closed for removed source");
        }
        closed
    }

    /// Closes sessions idle longer than `ttl`. Sessions busy with a request are skipped.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let mut evicted = 0;
        for (key, session) in self.entries() {
            let Ok(mut guard) = session.try_lock() else {
                continue;
            };
            if guard.idle_for() <= ttl {
                continue;
            }
            guard.close().await;
            drop(guard);
            self.remove_if_same(&key, &session);
            evicted += 1;
        }
        evicted
    }

    pub async fn persist_all(&self) {
        for (_, session) in self.entries() {
            session.lock().await.persist().await;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn take(&self, key: &SessionKey) -> Option<SharedSession> {
        self.sessions.write().remove(key)
    }

    fn entries(&self) -> Vec<(SessionKey, SharedSession)> {
        self.sessions
            .read()
            .iter()
            .map(|(key, session)| (key.clone(), Arc::clone(session)))
            .collect()
    }

    fn remove_if_same(&self, key: &SessionKey, session: &SharedSession) {
        let mut sessions = self.sessions.write();
        if sessions.get(key).is_some_and(|s| Arc::ptr_eq(s, session)) {
            sessions.remove(key);
        }
    }
}
