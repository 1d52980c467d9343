//! Rehearsal session lifecycle
//!
//! Turns a rehearsal session into something the navigation sequencer can
//! walk. Sessions with more than one song get an ephemeral list from the
//! scheduler, addressed through [`NavigationContext::Session`]; a
//! single-song session plays as a standalone song.
//!
//! The ephemeral list id lives on the session record and is taken off it
//! when the list is deleted, so ending a session twice never deletes
//! twice.

use crate::error::{Error, Result};
use crate::scheduler::Scheduler;
use crate::state::SharedState;
use chrono::Utc;
use gigbook_common::{NavigationContext, PlayerEvent, SessionId, SetlistId, SongId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a started session is navigated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPlan {
    /// Walk `songs` through the ephemeral list `list_id`
    Sequence {
        context: NavigationContext,
        songs: Vec<SongId>,
        list_id: SetlistId,
    },
    /// One song, no list
    Standalone(SongId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSession {
    pub id: SessionId,
    pub list_id: Option<SetlistId>,
}

pub struct SessionLifecycleCoordinator {
    scheduler: Arc<dyn Scheduler>,
    state: Arc<SharedState>,
    active: Option<ActiveSession>,
}

impl SessionLifecycleCoordinator {
    pub fn new(scheduler: Arc<dyn Scheduler>, state: Arc<SharedState>) -> Self {
        Self {
            scheduler,
            state,
            active: None,
        }
    }

    pub fn active(&self) -> Option<ActiveSession> {
        self.active
    }

    /// Start `id`, ending whichever session was running before
    pub async fn start(&mut self, id: SessionId) -> Result<SessionPlan> {
        let mut session = self
            .scheduler
            .get_session(id)
            .await?
            .ok_or(Error::SessionNotFound(id))?;
        if session.song_ids.is_empty() {
            return Err(Error::EmptyList(format!("session \"{}\"", session.title)));
        }

        if let Some(previous) = self.active.take() {
            info!("Ending session {} before starting {}", previous.id, id);
            self.end(previous.id, false).await?;
            // The record may just have been rewritten
            if previous.id == id {
                session = self
                    .scheduler
                    .get_session(id)
                    .await?
                    .ok_or(Error::SessionNotFound(id))?;
            }
        }

        // A list left behind by a run that never ended
        if let Some(leftover) = session.ephemeral_list_id.take() {
            warn!("Session {} still referenced list {}, deleting it", id, leftover);
            self.scheduler.delete_list(leftover).await?;
        }

        let list_id = if session.song_ids.len() > 1 {
            let name = format!("Rehearsal: {}", session.title);
            Some(
                self.scheduler
                    .create_ephemeral_list(&name, &session.song_ids)
                    .await?,
            )
        } else {
            None
        };

        session.is_active = true;
        session.started_at = Some(Utc::now());
        session.current_song_index = Some(0);
        session.ephemeral_list_id = list_id;
        self.scheduler.save_session(&session).await?;
        self.active = Some(ActiveSession { id, list_id });

        info!(
            "Started session \"{}\" ({} songs, list {:?})",
            session.title,
            session.song_ids.len(),
            list_id
        );
        self.state.broadcast_event(PlayerEvent::SessionStarted {
            session_id: id,
            list_id,
            song_count: session.song_ids.len(),
            timestamp: Utc::now(),
        });

        Ok(match list_id {
            Some(list_id) => SessionPlan::Sequence {
                context: NavigationContext::Session {
                    session_id: id,
                    index: 0,
                },
                songs: session.song_ids.clone(),
                list_id,
            },
            None => SessionPlan::Standalone(session.song_ids[0]),
        })
    }

    /// Stop `id`. Idempotent.
    pub async fn stop(&mut self, id: SessionId) -> Result<bool> {
        self.end(id, false).await
    }

    /// Stop `id` and mark it completed. Idempotent.
    pub async fn complete(&mut self, id: SessionId) -> Result<bool> {
        self.end(id, true).await
    }

    /// Keep the session record's position in step with navigation
    pub async fn record_position(&self, id: SessionId, index: usize) -> Result<()> {
        let Some(mut session) = self.scheduler.get_session(id).await? else {
            return Err(Error::SessionNotFound(id));
        };
        if session.current_song_index == Some(index) {
            return Ok(());
        }
        session.current_song_index = Some(index);
        self.scheduler.save_session(&session).await
    }

    /// Returns whether the session was running
    async fn end(&mut self, id: SessionId, completed: bool) -> Result<bool> {
        let mut session = self
            .scheduler
            .get_session(id)
            .await?
            .ok_or(Error::SessionNotFound(id))?;

        if self.active.map(|a| a.id) == Some(id) {
            self.active = None;
        }

        if let Some(list_id) = session.ephemeral_list_id {
            self.scheduler.delete_list(list_id).await?;
            session.ephemeral_list_id = None;
        }

        let was_active = session.is_active;
        session.is_active = false;
        session.current_song_index = None;
        if completed {
            session.completed = true;
        }
        self.scheduler.save_session(&session).await?;

        if was_active {
            info!("Session \"{}\" ended (completed: {})", session.title, completed);
            self.state.broadcast_event(PlayerEvent::SessionEnded {
                session_id: id,
                completed,
                timestamp: Utc::now(),
            });
        } else {
            debug!("Session {} was not running", id);
        }
        Ok(was_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::InMemoryScheduler;
    use gigbook_common::RehearsalSession;

    async fn coordinator_with(
        songs: usize,
    ) -> (SessionLifecycleCoordinator, Arc<InMemoryScheduler>, SessionId) {
        let scheduler = Arc::new(InMemoryScheduler::new());
        let session = RehearsalSession::new("Thursday run", (0..songs).map(|_| SongId::new()).collect());
        let id = session.id;
        scheduler.insert_session(session).await;
        let coordinator = SessionLifecycleCoordinator::new(scheduler.clone(), Arc::new(SharedState::new()));
        (coordinator, scheduler, id)
    }

    #[tokio::test]
    async fn test_multi_song_session_gets_list() {
        let (mut coordinator, scheduler, id) = coordinator_with(4).await;

        let plan = coordinator.start(id).await.unwrap();
        let SessionPlan::Sequence { list_id, songs, context } = plan else {
            panic!("expected a sequence");
        };
        assert_eq!(songs.len(), 4);
        assert_eq!(context.session_id(), Some(id));
        assert_eq!(scheduler.list(list_id).await.unwrap().songs.len(), 4);

        let record = scheduler.session(id).await.unwrap();
        assert!(record.is_active);
        assert!(record.started_at.is_some());
        assert_eq!(record.ephemeral_list_id, Some(list_id));
    }

    #[tokio::test]
    async fn test_single_song_session_has_no_list() {
        let (mut coordinator, scheduler, id) = coordinator_with(1).await;

        let plan = coordinator.start(id).await.unwrap();
        assert!(matches!(plan, SessionPlan::Standalone(_)));
        assert_eq!(scheduler.create_calls(), 0);

        coordinator.stop(id).await.unwrap();
        assert_eq!(scheduler.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_stop_twice_deletes_once() {
        let (mut coordinator, scheduler, id) = coordinator_with(3).await;
        coordinator.start(id).await.unwrap();

        assert!(coordinator.stop(id).await.unwrap());
        assert!(!coordinator.stop(id).await.unwrap());
        assert_eq!(scheduler.delete_calls(), 1);
        assert_eq!(scheduler.live_lists().await, 0);
        assert!(coordinator.active().is_none());
    }

    #[tokio::test]
    async fn test_complete_after_stop_marks_completed() {
        let (mut coordinator, scheduler, id) = coordinator_with(2).await;
        coordinator.start(id).await.unwrap();
        coordinator.stop(id).await.unwrap();

        coordinator.complete(id).await.unwrap();
        let record = scheduler.session(id).await.unwrap();
        assert!(record.completed);
        assert_eq!(scheduler.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_starting_another_session_ends_the_first() {
        let (mut coordinator, scheduler, first) = coordinator_with(2).await;
        let second = RehearsalSession::new("Friday run", vec![SongId::new(), SongId::new()]);
        let second_id = second.id;
        scheduler.insert_session(second).await;

        coordinator.start(first).await.unwrap();
        coordinator.start(second_id).await.unwrap();

        assert!(!scheduler.session(first).await.unwrap().is_active);
        assert!(scheduler.session(second_id).await.unwrap().is_active);
        assert_eq!(scheduler.live_lists().await, 1);
        assert_eq!(coordinator.active().map(|a| a.id), Some(second_id));
    }

    #[tokio::test]
    async fn test_restart_same_session_replaces_list() {
        let (mut coordinator, scheduler, id) = coordinator_with(3).await;
        coordinator.start(id).await.unwrap();
        coordinator.start(id).await.unwrap();

        assert_eq!(scheduler.create_calls(), 2);
        assert_eq!(scheduler.live_lists().await, 1);
    }

    #[tokio::test]
    async fn test_empty_session_cannot_start() {
        let (mut coordinator, scheduler, id) = coordinator_with(0).await;
        assert!(matches!(coordinator.start(id).await, Err(Error::EmptyList(_))));
        assert_eq!(scheduler.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_record_position() {
        let (mut coordinator, scheduler, id) = coordinator_with(3).await;
        coordinator.start(id).await.unwrap();
        coordinator.record_position(id, 2).await.unwrap();
        assert_eq!(scheduler.session(id).await.unwrap().current_song_index, Some(2));
    }
}
