//! Rehearsal session operations module
//!
//! **Responsibilities:**
//! - Starting a session and addressing its first song (a session whose
//!   first song cannot be found is ended again)
//! - Stopping/completing a session, unloading first if it is playing

use super::core::PlaybackEngine;
use crate::error::Result;
use crate::playback::navigation::NavigationSequencer;
use crate::playback::session::{ActiveSession, SessionPlan};
use gigbook_common::SessionId;
use tracing::warn;

impl PlaybackEngine {
    /// Start session `id` and play its first song
    ///
    /// Any other running session is ended first.
    pub async fn start_session(&self, id: SessionId) -> Result<()> {
        let mut core = self.core.lock().await;
        let plan = core.sessions.start(id).await?;
        core.reset_to_idle().await;

        let first = match &plan {
            SessionPlan::Sequence { context, songs, .. } => {
                NavigationSequencer::song_at(context, songs)
            }
            SessionPlan::Standalone(song_id) => Ok(*song_id),
        };
        let song = match first {
            Ok(song_id) => core.lookup_song(song_id).await,
            Err(e) => Err(e),
        };
        let song = match song {
            Ok(song) => song,
            Err(e) => {
                warn!("Session {} cannot start: {}", id, e);
                if let Err(stop_err) = core.sessions.stop(id).await {
                    warn!("Could not end session {}: {}", id, stop_err);
                }
                return Err(e);
            }
        };

        match plan {
            SessionPlan::Sequence { context, songs, .. } => {
                core.sequencer.begin(context, songs)?;
                core.load_song(song, Some(context), true).await
            }
            SessionPlan::Standalone(_) => core.load_song(song, None, true).await,
        }
    }

    /// Stop session `id`. Returns whether it was running; stopping again is a no-op.
    pub async fn stop_session(&self, id: SessionId) -> Result<bool> {
        let mut core = self.core.lock().await;
        if core.sessions.active().map(|a| a.id) == Some(id) {
            core.reset_to_idle().await;
        }
        core.sessions.stop(id).await
    }

    /// Stop session `id` and mark it completed
    pub async fn complete_session(&self, id: SessionId) -> Result<bool> {
        let mut core = self.core.lock().await;
        if core.sessions.active().map(|a| a.id) == Some(id) {
            core.reset_to_idle().await;
        }
        core.sessions.complete(id).await
    }

    pub async fn active_session(&self) -> Option<ActiveSession> {
        self.core.lock().await.sessions.active()
    }
}
