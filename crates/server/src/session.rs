//! Session Management
//!
//! Each session owns one [`Conversation`] behind an async mutex, so turns for
//! a session run strictly one after another. The cancel handle sits outside
//! the mutex: a new turn cancels the in-flight retrieval of the previous one
//! before it waits for the lock.
//!
//! Storage goes through the [`SessionStore`] trait. [`InMemorySessionStore`]
//! is the only backend; sessions do not survive a restart.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};

use udyami_agent::{CancelHandle, Conversation};

use crate::ServerError;

/// One live conversation
pub struct Session {
    pub id: String,
    conversation: Mutex<Conversation>,
    cancel: CancelHandle,
    created_at: Instant,
    last_activity: RwLock<Instant>,
}

impl Session {
    pub fn new(id: impl Into<String>, conversation: Conversation) -> Self {
        let cancel = conversation.cancel_handle();
        Self {
            id: id.into(),
            conversation: Mutex::new(conversation),
            cancel,
            created_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    /// Session with a fresh random id
    pub fn generate(conversation: Conversation) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), conversation)
    }

    /// Exclusive access to the conversation; waits for the running turn
    pub async fn conversation(&self) -> tokio::sync::MutexGuard<'_, Conversation> {
        self.conversation.lock().await
    }

    /// Abandon whatever retrieval the running turn is waiting on
    pub fn cancel_in_flight(&self) {
        self.cancel.cancel();
    }

    /// Update last activity
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.read().elapsed()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Check if session is expired
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.idle_for() > ttl
    }
}

/// Session store trait for pluggable backends
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Add a session; fails when the store is full
    async fn insert(&self, session: Arc<Session>) -> Result<(), ServerError>;

    async fn get(&self, id: &str) -> Result<Option<Arc<Session>>, ServerError>;

    /// Remove a session, returning it when it existed
    async fn remove(&self, id: &str) -> Result<Option<Arc<Session>>, ServerError>;

    async fn count(&self) -> usize;

    /// Drop sessions idle past the TTL; returns how many were removed
    async fn cleanup_expired(&self) -> usize;

    /// Check if this store is shared between instances
    fn is_distributed(&self) -> bool;
}

/// In-memory session store (default)
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(max_sessions: usize, ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            ttl,
        }
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, Arc<Session>>) -> usize {
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = !session.is_expired(self.ttl);
            if !keep {
                session.cancel_in_flight();
                tracing::info!(session_id = %id, "Expired session");
            }
            keep
        });
        before - sessions.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: Arc<Session>) -> Result<(), ServerError> {
        let mut sessions = self.sessions.write();

        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut sessions);

            if sessions.len() >= self.max_sessions {
                return Err(ServerError::Capacity(self.max_sessions));
            }
        }

        tracing::info!(session_id = %session.id, "Created session");
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Arc<Session>>, ServerError> {
        Ok(self.sessions.read().get(id).cloned())
    }

    async fn remove(&self, id: &str) -> Result<Option<Arc<Session>>, ServerError> {
        let removed = self.sessions.write().remove(id);
        if let Some(session) = &removed {
            session.cancel_in_flight();
            tracing::info!(session_id = %id, "Removed session");
        }
        Ok(removed)
    }

    async fn count(&self) -> usize {
        self.sessions.read().len()
    }

    async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions)
    }

    fn is_distributed(&self) -> bool {
        false
    }
}

/// Periodically remove expired sessions until the returned sender sends `true`
pub fn start_cleanup_task(store: Arc<dyn SessionStore>, interval: Duration) -> watch::Sender<bool> {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let removed = store.cleanup_expired().await;
                    if removed > 0 {
                        let remaining = store.count().await;
                        tracing::info!(removed, remaining, "Session cleanup");
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Session cleanup task shutting down");
                        break;
                    }
                }
            }
        }
    });

    shutdown_tx
}
