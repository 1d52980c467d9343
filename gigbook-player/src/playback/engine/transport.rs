//! Transport operations module
//!
//! **Responsibilities:**
//! - Play/pause/seek/restart on the addressed song
//! - Rate, volume, mute and loop preferences
//! - Scrubbing, backgrounding and the practice loop region
//!
//! Commands that need a handle are no-ops when nothing is loaded; songs
//! without media only track play intent.

use super::core::{EngineCore, PlaybackEngine, PracticeLoop};
use crate::backend::TransportCommand;
use crate::error::{Error, Result};
use crate::playback::resource::SeekOutcome;
use crate::playback::state::StateAction;
use std::sync::atomic::Ordering;
use tracing::{debug, info};

impl EngineCore {
    pub(super) async fn play_current(&mut self) -> Result<()> {
        self.ensure_fresh().await?;
        let Some(song) = self.current_song.as_ref() else {
            debug!("Play ignored, nothing addressed");
            return Ok(());
        };
        if song.audio_reference.is_none() {
            self.state.dispatch(StateAction::PlayIntent(true)).await;
            return Ok(());
        }
        match self.resources.play().await {
            Ok(_) => Ok(()),
            Err(failure) => Err(self.transport_failure(failure, TransportCommand::Play).await),
        }
    }

    pub(super) async fn pause_current(&mut self) -> Result<()> {
        let Some(song) = self.current_song.as_ref() else {
            return Ok(());
        };
        if song.audio_reference.is_none() || self.resources.is_stale() {
            self.state.dispatch(StateAction::PlayIntent(false)).await;
            return Ok(());
        }
        match self.resources.pause().await {
            Ok(_) => Ok(()),
            Err(failure) => Err(self.transport_failure(failure, TransportCommand::Pause).await),
        }
    }
}

impl PlaybackEngine {
    pub async fn play(&self) -> Result<()> {
        self.core.lock().await.play_current().await
    }

    pub async fn pause(&self) -> Result<()> {
        self.core.lock().await.pause_current().await
    }

    pub async fn toggle_play_pause(&self) -> Result<()> {
        let mut core = self.core.lock().await;
        if self.state.playback_state().await.is_playing {
            core.pause_current().await
        } else {
            core.play_current().await
        }
    }

    /// Seek to `target_seconds`
    ///
    /// The last seek wins: a request still waiting for the command path
    /// when a newer one arrives returns [`SeekOutcome::Superseded`] without
    /// reaching the backend.
    pub async fn seek(&self, target_seconds: f64) -> Result<SeekOutcome> {
        let ticket = self.seek_tickets.fetch_add(1, Ordering::AcqRel) + 1;
        let mut core = self.core.lock().await;
        if self.seek_tickets.load(Ordering::Acquire) != ticket {
            debug!("Seek to {:.2}s superseded", target_seconds);
            return Ok(SeekOutcome::Superseded);
        }

        core.ensure_fresh().await?;
        match core.resources.seek(target_seconds).await {
            Ok(outcome) => Ok(outcome),
            Err(failure) => Err(core.transport_failure(failure, TransportCommand::Seek).await),
        }
    }

    /// Seek to the start and play
    pub async fn restart(&self) -> Result<()> {
        let mut core = self.core.lock().await;
        core.ensure_fresh().await?;
        if core.current_song.is_none() {
            return Ok(());
        }
        if core.resources.is_loaded() {
            core.seek_exact(0.0).await?;
        }
        core.play_current().await
    }

    /// User started dragging the position slider; polling pauses
    pub fn begin_scrub(&self) {
        self.gate.set_scrubbing(true);
    }

    /// User released the slider at `target_seconds`
    pub async fn end_scrub(&self, target_seconds: f64) -> Result<SeekOutcome> {
        self.gate.set_scrubbing(false);
        self.seek(target_seconds).await
    }

    /// App moved to or from the background; polling pauses while away
    pub fn set_backgrounded(&self, backgrounded: bool) {
        info!("App {}", if backgrounded { "backgrounded" } else { "foregrounded" });
        self.gate.set_backgrounded(backgrounded);
    }

    /// Returns whether the rate changed
    pub async fn set_rate(&self, rate: f32) -> Result<bool> {
        let mut core = self.core.lock().await;
        match core.resources.set_rate(rate).await {
            Ok(changed) => Ok(changed),
            Err(failure) => Err(core.transport_failure(failure, TransportCommand::Rate).await),
        }
    }

    /// Returns whether the intended volume changed
    pub async fn set_volume(&self, volume: f32) -> Result<bool> {
        let mut core = self.core.lock().await;
        match core.resources.set_volume(volume).await {
            Ok(changed) => Ok(changed),
            Err(failure) => Err(core.transport_failure(failure, TransportCommand::Volume).await),
        }
    }

    pub async fn set_muted(&self, muted: bool) -> Result<bool> {
        let mut core = self.core.lock().await;
        match core.resources.set_muted(muted).await {
            Ok(changed) => Ok(changed),
            Err(failure) => Err(core.transport_failure(failure, TransportCommand::Volume).await),
        }
    }

    /// Returns the new mute state
    pub async fn toggle_mute(&self) -> Result<bool> {
        let mut core = self.core.lock().await;
        let muted = !self.state.playback_state().await.is_muted;
        match core.resources.set_muted(muted).await {
            Ok(_) => Ok(muted),
            Err(failure) => Err(core.transport_failure(failure, TransportCommand::Volume).await),
        }
    }

    pub async fn set_looping(&self, looping: bool) -> Result<bool> {
        let mut core = self.core.lock().await;
        match core.resources.set_looping(looping).await {
            Ok(changed) => Ok(changed),
            Err(failure) => Err(core.transport_failure(failure, TransportCommand::Looping).await),
        }
    }

    /// Repeat `start..end` of the current song until cleared or the track changes
    pub async fn set_practice_loop(&self, start: f64, end: f64) -> Result<PracticeLoop> {
        let mut core = self.core.lock().await;
        let duration = self.state.playback_state().await.duration_seconds;
        let end = if duration > 0.0 { end.min(duration) } else { end };
        if !start.is_finite() || !end.is_finite() || start < 0.0 || end <= start {
            return Err(Error::InvalidLoopRegion { start, end });
        }
        let region = PracticeLoop { start, end };
        info!("Practice loop {:.2}s..{:.2}s", start, end);
        core.practice_loop = Some(region);
        Ok(region)
    }

    pub async fn clear_practice_loop(&self) -> bool {
        self.core.lock().await.practice_loop.take().is_some()
    }
}
