//! Session store
//!
//! The registry's only shared mutable state. The trait keeps the storage
//! pluggable (an external store keyed by document id is what a multi-instance
//! deployment would slot in); the default is a process-local map.
//!
//! Every session sits behind its own `tokio::sync::Mutex`, so requests for
//! the same document serialize while unrelated documents only contend on the
//! brief map-level lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::types::ProcessingSession;

/// Shared handle to one session; lock it to touch the session at all.
pub type SessionHandle = Arc<Mutex<ProcessingSession>>;

/// Pluggable storage for in-flight chunk sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the session for a document id, if one is active.
    async fn get(&self, document_id: &str) -> Option<SessionHandle>;

    /// Fetch the session for a document id, creating it from `template` if
    /// absent. Returns the handle and whether it was just created.
    async fn get_or_create(
        &self,
        document_id: &str,
        template: ProcessingSession,
    ) -> (SessionHandle, bool);

    /// Remove and return the session for a document id.
    async fn remove(&self, document_id: &str) -> Option<SessionHandle>;

    /// Number of active sessions.
    async fn session_count(&self) -> usize;

    /// Evict every session whose last activity predates `cutoff`. Returns
    /// the evicted document ids.
    async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Vec<String>;
}

/// Process-local store: volatile by design, lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, document_id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(document_id).cloned()
    }

    async fn get_or_create(
        &self,
        document_id: &str,
        template: ProcessingSession,
    ) -> (SessionHandle, bool) {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(document_id) {
            return (Arc::clone(existing), false);
        }
        let handle: SessionHandle = Arc::new(Mutex::new(template));
        sessions.insert(document_id.to_string(), Arc::clone(&handle));
        (handle, true)
    }

    async fn remove(&self, document_id: &str) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(document_id)
    }

    async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        // Two phases so the sweep never holds the map lock while inspecting
        // sessions, and never blocks submissions for unrelated documents.
        let candidates: Vec<(String, SessionHandle)> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
                .collect()
        };

        let mut expired = Vec::new();
        for (id, handle) in candidates {
            // A session whose lock is held is mid-request, hence active.
            let is_expired = match handle.try_lock() {
                Ok(session) => !session.is_finished() && session.last_activity < cutoff,
                Err(_) => false,
            };
            if !is_expired {
                continue;
            }

            let mut sessions = self.sessions.write().await;
            // Re-check under the write lock; the session may have been
            // completed and replaced since the snapshot.
            let still_expired = match sessions.get(&id).map(Arc::clone) {
                Some(current) if Arc::ptr_eq(&current, &handle) => match current.try_lock() {
                    Ok(mut session) => {
                        let expired = !session.is_finished() && session.last_activity < cutoff;
                        if expired {
                            session.mark_finished();
                        }
                        expired
                    }
                    Err(_) => false,
                },
                _ => false,
            };
            if still_expired {
                sessions.remove(&id);
                expired.push(id);
            }
        }
        expired
    }
}
