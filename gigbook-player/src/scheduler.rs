//! Rehearsal scheduler collaborator
//!
//! The scheduler owns rehearsal session records and the short-lived lists
//! that back a running session. [`InMemoryScheduler`] is the in-process
//! implementation used by the demo binary and tests.

use crate::error::Result;
use async_trait::async_trait;
use gigbook_common::{RehearsalSession, SessionId, Setlist, SetlistId, SongId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn get_session(&self, id: SessionId) -> Result<Option<RehearsalSession>>;

    async fn save_session(&self, session: &RehearsalSession) -> Result<()>;

    /// Create an ephemeral ordered list of `song_ids`
    async fn create_ephemeral_list(&self, name: &str, song_ids: &[SongId]) -> Result<SetlistId>;

    /// Delete a list. Idempotent: returns false if it was already gone.
    async fn delete_list(&self, id: SetlistId) -> Result<bool>;
}

#[derive(Default)]
pub struct InMemoryScheduler {
    sessions: RwLock<HashMap<SessionId, RehearsalSession>>,
    lists: RwLock<HashMap<SetlistId, Setlist>>,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_session(&self, session: RehearsalSession) {
        self.sessions.write().await.insert(session.id, session);
    }

    pub async fn session(&self, id: SessionId) -> Option<RehearsalSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn list(&self, id: SetlistId) -> Option<Setlist> {
        self.lists.read().await.get(&id).cloned()
    }

    pub async fn live_lists(&self) -> usize {
        self.lists.read().await.len()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete_list` calls, including no-op ones
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scheduler for InMemoryScheduler {
    async fn get_session(&self, id: SessionId) -> Result<Option<RehearsalSession>> {
        Ok(self.session(id).await)
    }

    async fn save_session(&self, session: &RehearsalSession) -> Result<()> {
        self.sessions.write().await.insert(session.id, session.clone());
        Ok(())
    }

    async fn create_ephemeral_list(&self, name: &str, song_ids: &[SongId]) -> Result<SetlistId> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut list = Setlist::new(name, song_ids.to_vec());
        list.ephemeral = true;
        let id = list.id;
        self.lists.write().await.insert(id, list);
        debug!("Created ephemeral list {} ({} songs)", id, song_ids.len());
        Ok(id)
    }

    async fn delete_list(&self, id: SetlistId) -> Result<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let removed = self.lists.write().await.remove(&id).is_some();
        debug!("Delete list {}: {}", id, if removed { "removed" } else { "already gone" });
        Ok(removed)
    }
}
