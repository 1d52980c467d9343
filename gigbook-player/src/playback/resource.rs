//! Audio resource manager
//!
//! Sole owner of the native audio handle. At most one handle is alive at
//! any time: `load` always releases the previous handle (and waits for the
//! backend to confirm) before asking for a new one. Each load gets a fresh
//! generation number; status events from older generations are discarded
//! by the engine.
//!
//! Transport commands apply the caller's intent to the shared state,
//! forwarding to the backend only when a handle exists and the value
//! actually changes.

use super::events::{EngineEventSender, SeekEpoch, StatusSink};
use super::poller::{spawn_status_poller, PollGate, PollerContext, PollerTask};
use super::preflight::check_local_media;
use super::state::{StateAction, MAX_RATE, MIN_RATE};
use crate::backend::{AudioBackend, BackendFailure, BackendStatus, HandleId, LoadOptions};
use crate::config::PlaybackConfig;
use crate::state::SharedState;
use gigbook_common::MediaReference;
use std::future::Future;
use std::sync::Arc;
use tokio::time;
use tracing::{debug, info, warn};

type BackendResult<T> = std::result::Result<T, BackendFailure>;

/// Result of a seek request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekOutcome {
    /// Landed at `position` (after clamping)
    Applied { position: f64 },
    /// Too close to the current position, or nothing loaded
    Ignored,
    /// A newer seek arrived before this one ran
    Superseded,
}

/// The one live handle
struct AudioHandle {
    id: HandleId,
    reference: MediaReference,
    generation: u64,
    /// None once polling has been stopped for this handle
    poller: Option<PollerTask>,
}

pub struct AudioResourceManager {
    backend: Arc<dyn AudioBackend>,
    state: Arc<SharedState>,
    events_tx: EngineEventSender,
    epoch: Arc<SeekEpoch>,
    gate: Arc<PollGate>,
    config: PlaybackConfig,
    handle: Option<AudioHandle>,
    next_generation: u64,
    /// Status became unreadable; the handle must be reloaded before use
    stale: bool,
}

impl AudioResourceManager {
    pub(crate) fn new(
        backend: Arc<dyn AudioBackend>,
        state: Arc<SharedState>,
        events_tx: EngineEventSender,
        gate: Arc<PollGate>,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            backend,
            state,
            events_tx,
            epoch: Arc::new(SeekEpoch::new()),
            gate,
            config,
            handle: None,
            next_generation: 0,
            stale: false,
        }
    }

    /// Run a backend call under the configured time bound
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = BackendResult<T>>,
    ) -> BackendResult<T> {
        match time::timeout(self.config.backend_timeout(), call).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Backend {} timed out after {:?}", operation, self.config.backend_timeout());
                Err(BackendFailure::Timeout { operation })
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn reference(&self) -> Option<&MediaReference> {
        self.handle.as_ref().map(|h| &h.reference)
    }

    pub fn generation(&self) -> Option<u64> {
        self.handle.as_ref().map(|h| h.generation)
    }

    /// Whether events stamped with `generation` belong to the live handle
    pub fn owns(&self, generation: u64) -> bool {
        !self.stale && self.generation() == Some(generation)
    }

    /// Whether a position read at `epoch` is still current
    pub fn epoch_is_current(&self, epoch: u64) -> bool {
        self.epoch.accepts(epoch)
    }

    /// Load `reference`, releasing any previous handle first
    ///
    /// `fallback_duration` is used until the backend measures the media.
    pub async fn load(
        &mut self,
        reference: &MediaReference,
        options: LoadOptions,
        fallback_duration: f64,
    ) -> BackendResult<HandleId> {
        self.unload().await;

        if self.config.preflight_local_files {
            check_local_media(reference, self.config.min_media_bytes).await?;
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let sink = StatusSink::new(generation, self.epoch.clone(), self.events_tx.clone());

        let id = self
            .bounded("load", self.backend.load(reference, options, sink))
            .await?;

        let status = match self.bounded("status", self.backend.status(id)).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Initial status for {} unavailable ({}), using catalog duration", id, e);
                BackendStatus::default()
            }
        };
        let duration = status
            .duration_ms
            .filter(|ms| *ms > 0)
            .map(|ms| ms as f64 / 1000.0)
            .unwrap_or(fallback_duration);

        let poller = spawn_status_poller(
            PollerContext {
                backend: self.backend.clone(),
                state: self.state.clone(),
                events_tx: self.events_tx.clone(),
                epoch: self.epoch.clone(),
                gate: self.gate.clone(),
                interval: self.config.status_poll_interval(),
                timeout: self.config.backend_timeout(),
            },
            id,
            generation,
        );

        self.handle = Some(AudioHandle {
            id,
            reference: reference.clone(),
            generation,
            poller: Some(poller),
        });
        self.stale = false;

        self.state
            .dispatch(StateAction::Loaded {
                duration,
                playing: options.autoplay,
            })
            .await;

        info!("Loaded {} as {} (generation {}, {:.1}s)", reference, id, generation, duration);
        Ok(id)
    }

    /// Release the handle. Safe to call with nothing loaded.
    ///
    /// Returns whether a handle was released.
    pub async fn unload(&mut self) -> bool {
        let Some(mut handle) = self.handle.take() else {
            return false;
        };
        self.stale = false;

        // Stop polling before the handle goes away
        handle.poller.take();

        if let Err(e) = self.bounded("pause", self.backend.pause(handle.id)).await {
            debug!("Pause before unload of {} failed: {}", handle.id, e);
        }
        if let Err(e) = self.bounded("unload", self.backend.unload(handle.id)).await {
            warn!("Unload of {} failed: {}", handle.id, e);
        }
        self.state.dispatch(StateAction::Unloaded).await;

        debug!("Unloaded {} (generation {})", handle.id, handle.generation);
        true
    }

    /// Stop polling and treat the handle as unusable until reloaded
    pub fn mark_stale(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.poller.take();
            self.stale = true;
        }
    }

    pub async fn play(&mut self) -> BackendResult<bool> {
        let Some(id) = self.handle.as_ref().map(|h| h.id) else {
            return Ok(false);
        };
        self.state.dispatch(StateAction::PlayIntent(true)).await;
        if let Err(e) = self.bounded("play", self.backend.play(id)).await {
            self.state.dispatch(StateAction::PlayIntent(false)).await;
            return Err(e);
        }
        Ok(true)
    }

    pub async fn pause(&mut self) -> BackendResult<bool> {
        let Some(id) = self.handle.as_ref().map(|h| h.id) else {
            return Ok(false);
        };
        let was_playing = self.state.playback_state().await.is_playing;
        self.state.dispatch(StateAction::PlayIntent(false)).await;
        if let Err(e) = self.bounded("pause", self.backend.pause(id)).await {
            self.state.dispatch(StateAction::PlayIntent(was_playing)).await;
            return Err(e);
        }
        Ok(true)
    }

    /// Seek, unless `target` is within the configured threshold of the
    /// displayed position
    pub async fn seek(&mut self, target: f64) -> BackendResult<SeekOutcome> {
        if self.handle.is_none() {
            return Ok(SeekOutcome::Ignored);
        }
        let current = self.state.playback_state().await;
        let target = clamp_target(target, current.duration_seconds);
        if (target - current.current_time_seconds).abs() < self.config.seek_threshold_seconds {
            debug!(
                "Seek to {:.2}s ignored ({:.2}s displayed)",
                target, current.current_time_seconds
            );
            return Ok(SeekOutcome::Ignored);
        }
        self.seek_exact(target).await
    }

    /// Seek without the threshold check
    pub async fn seek_exact(&mut self, target: f64) -> BackendResult<SeekOutcome> {
        let Some(id) = self.handle.as_ref().map(|h| h.id) else {
            return Ok(SeekOutcome::Ignored);
        };
        let duration = self.state.playback_state().await.duration_seconds;
        let target = clamp_target(target, duration);

        let epoch = self.epoch.begin();
        debug!("Seek to {:.2}s on {} (epoch {})", target, id, epoch);
        let result = self
            .bounded("seek", self.backend.seek(id, (target * 1000.0).round() as u64))
            .await;
        self.epoch.settle();

        result?;
        self.state.dispatch(StateAction::Seeked(target)).await;
        Ok(SeekOutcome::Applied { position: target })
    }

    /// Back to the start and stopped, keeping the handle
    pub async fn rewind(&mut self) -> BackendResult<()> {
        if let Some(id) = self.handle.as_ref().map(|h| h.id) {
            self.bounded("pause", self.backend.pause(id)).await?;
            self.epoch.begin();
            let result = self.bounded("seek", self.backend.seek(id, 0)).await;
            self.epoch.settle();
            result?;
        }
        self.state.dispatch(StateAction::Rewound).await;
        Ok(())
    }

    pub async fn set_rate(&mut self, rate: f32) -> BackendResult<bool> {
        let rate = rate.clamp(MIN_RATE, MAX_RATE);
        if self.state.playback_state().await.playback_rate == rate {
            return Ok(false);
        }
        if let Some(id) = self.handle.as_ref().map(|h| h.id) {
            self.bounded("set_rate", self.backend.set_rate(id, rate)).await?;
        }
        Ok(self.state.dispatch(StateAction::RateSet(rate)).await)
    }

    pub async fn set_volume(&mut self, volume: f32) -> BackendResult<bool> {
        let volume = volume.clamp(0.0, 1.0);
        let current = self.state.playback_state().await;
        if current.volume == volume {
            return Ok(false);
        }
        // While muted only the intended level changes
        if let (Some(id), false) = (self.handle.as_ref().map(|h| h.id), current.is_muted) {
            self.bounded("set_volume", self.backend.set_volume(id, volume)).await?;
        }
        Ok(self.state.dispatch(StateAction::VolumeSet(volume)).await)
    }

    pub async fn set_muted(&mut self, muted: bool) -> BackendResult<bool> {
        let current = self.state.playback_state().await;
        if current.is_muted == muted {
            return Ok(false);
        }
        if let Some(id) = self.handle.as_ref().map(|h| h.id) {
            let level = if muted { 0.0 } else { current.volume };
            self.bounded("set_volume", self.backend.set_volume(id, level)).await?;
        }
        Ok(self.state.dispatch(StateAction::MuteSet(muted)).await)
    }

    pub async fn set_looping(&mut self, looping: bool) -> BackendResult<bool> {
        if self.state.playback_state().await.is_looping == looping {
            return Ok(false);
        }
        if let Some(id) = self.handle.as_ref().map(|h| h.id) {
            self.bounded("set_looping", self.backend.set_looping(id, looping)).await?;
        }
        Ok(self.state.dispatch(StateAction::LoopingSet(looping)).await)
    }

    /// Initial options for the next load, from the current preferences
    pub async fn load_options(&self, autoplay: bool) -> LoadOptions {
        let state = self.state.playback_state().await;
        LoadOptions {
            rate: state.playback_rate,
            looping: state.is_looping,
            volume: state.effective_volume(),
            autoplay,
        }
    }
}

fn clamp_target(target: f64, duration: f64) -> f64 {
    let target = if target.is_finite() { target.max(0.0) } else { 0.0 };
    if duration > 0.0 {
        target.min(duration)
    } else {
        target
    }
}
