//! Core playback engine - lifecycle and orchestration
//!
//! **Responsibilities:**
//! - PlaybackEngine struct definition, construction and shutdown
//! - The serialized command path (`EngineCore` behind an async mutex)
//! - The event pump folding status events into shared state
//! - Failure remediation and end-of-song handling

use crate::backend::{AudioBackend, BackendFailure, BackendStatus, TransportCommand};
use crate::catalog::Catalog;
use crate::config::PlaybackConfig;
use crate::error::{Error, Result};
use crate::playback::events::{engine_channel, EngineEvent, EngineEventReceiver, EngineEventSender, StatusSource};
use crate::playback::failure::{FailurePhase, ResourceFailureClassifier};
use crate::playback::navigation::{CompletionAction, NavigationSequencer};
use crate::playback::poller::PollGate;
use crate::playback::resource::{AudioResourceManager, SeekOutcome};
use crate::playback::session::SessionLifecycleCoordinator;
use crate::playback::state::StateAction;
use crate::scheduler::Scheduler;
use crate::state::SharedState;
use chrono::Utc;
use gigbook_common::events::RemediationAction;
use gigbook_common::{MediaReference, NavigationContext, PlayerEvent, Song, SongId};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Set while an engine exists in this process
static ENGINE_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Claim on the process-wide engine slot, released on drop
pub(super) struct EngineGuard(());

impl EngineGuard {
    fn acquire() -> Result<Self> {
        ENGINE_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| EngineGuard(()))
            .map_err(|_| Error::EngineAlreadyRunning)
    }
}

impl Drop for EngineGuard {
    fn drop(&mut self) {
        ENGINE_ACTIVE.store(false, Ordering::Release);
    }
}

/// A-B repeat region, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PracticeLoop {
    pub start: f64,
    pub end: f64,
}

/// Everything mutated by commands; only ever touched under the engine mutex
pub(super) struct EngineCore {
    pub(super) resources: AudioResourceManager,
    pub(super) sequencer: NavigationSequencer,
    pub(super) sessions: SessionLifecycleCoordinator,
    pub(super) classifier: ResourceFailureClassifier,
    pub(super) catalog: Arc<dyn Catalog>,
    pub(super) state: Arc<SharedState>,
    /// Song currently addressed (loaded, or playing without media)
    pub(super) current_song: Option<Song>,
    pub(super) practice_loop: Option<PracticeLoop>,
}

/// Playback coordination engine
///
/// One per process. All mutating operations are serialized through an
/// internal mutex; status updates are folded by a background pump task.
pub struct PlaybackEngine {
    pub(super) core: Arc<Mutex<EngineCore>>,
    pub(super) state: Arc<SharedState>,
    pub(super) gate: Arc<PollGate>,
    pub(super) events_tx: EngineEventSender,
    /// Latest seek ticket handed out; older tickets are superseded
    pub(super) seek_tickets: AtomicU64,
    pump: JoinHandle<()>,
    _guard: EngineGuard,
}

impl PlaybackEngine {
    /// Create the engine. Must be called from within a tokio runtime.
    ///
    /// Fails with [`Error::EngineAlreadyRunning`] while another engine exists.
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        catalog: Arc<dyn Catalog>,
        scheduler: Arc<dyn Scheduler>,
        config: PlaybackConfig,
    ) -> Result<Self> {
        let guard = EngineGuard::acquire()?;

        let state = Arc::new(SharedState::new());
        let gate = Arc::new(PollGate::default());
        let (events_tx, events_rx) = engine_channel();

        info!(
            "Starting playback engine (poll {}ms, seek threshold {:.1}s, backend timeout {}ms)",
            config.status_poll_interval_ms, config.seek_threshold_seconds, config.backend_timeout_ms
        );

        let core = EngineCore {
            resources: AudioResourceManager::new(
                backend,
                state.clone(),
                events_tx.clone(),
                gate.clone(),
                config,
            ),
            sequencer: NavigationSequencer::new(),
            sessions: SessionLifecycleCoordinator::new(scheduler, state.clone()),
            classifier: ResourceFailureClassifier::new(),
            catalog,
            state: state.clone(),
            current_song: None,
            practice_loop: None,
        };
        let core = Arc::new(Mutex::new(core));
        let pump = tokio::spawn(run_event_pump(core.clone(), events_rx));

        Ok(Self {
            core,
            state,
            gate,
            events_tx,
            seek_tickets: AtomicU64::new(0),
            pump,
            _guard: guard,
        })
    }

    /// Subscribe to player events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PlayerEvent> {
        self.state.subscribe_events()
    }

    pub fn shared_state(&self) -> Arc<SharedState> {
        self.state.clone()
    }

    /// Wait until every status event published so far has been folded
    pub async fn drain_events(&self) {
        let (tx, rx) = oneshot::channel();
        if self.events_tx.send(EngineEvent::Barrier(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Unload, stop background work and release the engine slot
    pub async fn shutdown(self) {
        info!("Shutting down playback engine");
        self.core.lock().await.reset_to_idle().await;
        self.pump.abort();
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn run_event_pump(core: Arc<Mutex<EngineCore>>, mut events_rx: EngineEventReceiver) {
    debug!("Engine event pump started");
    while let Some(event) = events_rx.recv().await {
        match event {
            EngineEvent::Status {
                generation,
                epoch,
                source,
                result,
                ack,
            } => {
                core.lock().await.on_status(generation, epoch, source, result).await;
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
            EngineEvent::Barrier(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("Engine event pump stopped");
}

impl EngineCore {
    pub(super) async fn lookup_song(&self, id: SongId) -> Result<Song> {
        self.catalog.get_song(id).await?.ok_or(Error::SongNotFound(id))
    }

    /// Address `song`, replacing whatever was loaded
    pub(super) async fn load_song(
        &mut self,
        song: Song,
        context: Option<NavigationContext>,
        autoplay: bool,
    ) -> Result<()> {
        self.practice_loop = None;
        self.current_song = None;

        if let Some(NavigationContext::Session { session_id, index }) = context {
            if let Err(e) = self.sessions.record_position(session_id, index).await {
                warn!("Could not record session position: {}", e);
            }
        }

        match song.audio_reference.clone() {
            None => {
                self.resources.unload().await;
                debug!("\"{}\" has no media, timing from catalog only", song.title);
                self.state
                    .dispatch(StateAction::Loaded {
                        duration: song.duration_seconds,
                        playing: autoplay,
                    })
                    .await;
            }
            Some(reference) => {
                let options = self.resources.load_options(autoplay).await;
                if let Err(failure) = self
                    .resources
                    .load(&reference, options, song.duration_seconds)
                    .await
                {
                    self.state.set_now_playing(None, context).await;
                    return Err(self
                        .handle_failure(failure, FailurePhase::Load, Some(song.id), Some(reference))
                        .await);
                }
            }
        }

        info!("Now playing \"{}\" ({:?})", song.title, context);
        self.state.set_now_playing(Some(song.id), context).await;
        self.current_song = Some(song);
        Ok(())
    }

    /// Classify, remediate, and surface exactly one failure event
    pub(super) async fn handle_failure(
        &mut self,
        failure: BackendFailure,
        phase: FailurePhase,
        song_id: Option<SongId>,
        reference: Option<MediaReference>,
    ) -> Error {
        let record = self.classifier.classify(&failure, reference.as_ref(), phase);
        warn!(
            "Playback failure ({}, {:?}) for {:?}: {}",
            record.kind, record.action, reference, record.detail
        );

        match (record.action, phase) {
            (RemediationAction::ClearReference, _) => {
                self.resources.unload().await;
                self.state.dispatch(StateAction::Idle).await;
                if let Some(id) = song_id {
                    if let Err(e) = self.catalog.clear_audio_reference(id).await {
                        error!("Could not clear broken reference on {}: {}", id, e);
                    }
                }
            }
            (RemediationAction::ResetToIdle, _) => self.reset_to_idle().await,
            (RemediationAction::ReportOnly, FailurePhase::Load) => {
                self.state.dispatch(StateAction::Idle).await;
            }
            (RemediationAction::ReportOnly, FailurePhase::Status) => {
                self.resources.mark_stale();
                self.state.dispatch(StateAction::Unloaded).await;
            }
            (RemediationAction::ReportOnly, FailurePhase::Transport(_)) => {}
        }

        let reference = record.offending_reference.clone();
        let kind = record.kind;
        let action = record.action;
        let error = record.into_error(song_id);
        self.state.broadcast_event(PlayerEvent::PlaybackFailed {
            kind,
            action,
            song_id,
            reference,
            message: error.user_message(),
            timestamp: Utc::now(),
        });
        error
    }

    /// Route a transport failure for the current song
    pub(super) async fn transport_failure(&mut self, failure: BackendFailure, command: TransportCommand) -> Error {
        let song_id = self.current_song.as_ref().map(|s| s.id);
        let reference = self.resources.reference().cloned();
        self.handle_failure(failure, FailurePhase::Transport(command), song_id, reference)
            .await
    }

    /// Drop everything: handle, list position, addressed song
    pub(super) async fn reset_to_idle(&mut self) {
        self.resources.unload().await;
        self.sequencer.clear();
        self.current_song = None;
        self.practice_loop = None;
        self.state.set_now_playing(None, None).await;
        self.state.dispatch(StateAction::Idle).await;
        debug!("Engine idle");
    }

    /// Reload the current song if its handle went stale
    pub(super) async fn ensure_fresh(&mut self) -> Result<()> {
        if !self.resources.is_stale() {
            return Ok(());
        }
        let Some(song) = self.current_song.clone() else {
            return Ok(());
        };
        info!("Reloading \"{}\" after lost status", song.title);
        let position = self.state.playback_state().await.current_time_seconds;
        let context = self.sequencer.current();
        self.load_song(song, context, false).await?;
        if position > 0.0 {
            self.seek_exact(position).await?;
        }
        Ok(())
    }

    pub(super) async fn seek_exact(&mut self, target: f64) -> Result<SeekOutcome> {
        match self.resources.seek_exact(target).await {
            Ok(outcome) => Ok(outcome),
            Err(failure) => Err(self.transport_failure(failure, TransportCommand::Seek).await),
        }
    }

    /// Fold one status event
    pub(super) async fn on_status(
        &mut self,
        generation: u64,
        epoch: u64,
        source: StatusSource,
        result: std::result::Result<BackendStatus, BackendFailure>,
    ) {
        if !self.resources.owns(generation) {
            debug!(
                "Discarding {:?} status for generation {} (current {:?})",
                source,
                generation,
                self.resources.generation()
            );
            return;
        }

        let status = match result {
            Ok(status) => status,
            Err(failure) => {
                let song_id = self.current_song.as_ref().map(|s| s.id);
                let reference = self.resources.reference().cloned();
                self.handle_failure(failure, FailurePhase::Status, song_id, reference)
                    .await;
                return;
            }
        };
        trace!("{:?} status: {:?}", source, status);

        // A seek since the read makes its position stale, but a completion
        // is reported once and must still be acted on
        if !self.resources.epoch_is_current(epoch) {
            let state = self.state.playback_state().await;
            if status.just_finished && !state.is_looping {
                debug!("Completion raced a seek (epoch {}), advancing anyway", epoch);
                self.on_completion(state.is_playing).await;
            } else {
                debug!("Discarding {:?} position from epoch {}", source, epoch);
            }
            return;
        }

        let before = self.state.playback_state().await;
        self.state
            .dispatch(StateAction::Snapshot {
                position: status.position_ms as f64 / 1000.0,
                duration: status.duration_ms.map(|ms| ms as f64 / 1000.0),
                playing: status.is_playing,
            })
            .await;

        if status.just_finished && !before.is_looping {
            self.on_completion(before.is_playing).await;
            return;
        }

        if let Some(region) = self.practice_loop {
            let position = status.position_ms as f64 / 1000.0;
            if status.is_playing && position >= region.end {
                debug!("Practice loop: {:.2}s -> {:.2}s", position, region.start);
                let _ = self.seek_exact(region.start).await;
            }
        }
    }

    /// The loaded song reached its end
    pub(super) async fn on_completion(&mut self, was_playing: bool) {
        match self.sequencer.on_completion() {
            CompletionAction::Advance { context, song_id } => {
                info!("Auto-advancing to index {}", context.index());
                match self.lookup_song(song_id).await {
                    Ok(song) => {
                        self.sequencer.next();
                        // Failures were already surfaced
                        let _ = self.load_song(song, Some(context), was_playing).await;
                    }
                    Err(e) => {
                        warn!("Next song unavailable: {}", e);
                        let current = self.sequencer.current();
                        self.rewind_at_end(current).await;
                    }
                }
            }
            CompletionAction::EndOfList { context } => self.rewind_at_end(context).await,
        }
    }

    async fn rewind_at_end(&mut self, context: Option<NavigationContext>) {
        self.practice_loop = None;
        if let Err(failure) = self.resources.rewind().await {
            let _ = self.transport_failure(failure, TransportCommand::Seek).await;
            return;
        }
        if let Some(context) = context {
            info!("Reached end of list at index {}", context.index());
            self.state.broadcast_event(PlayerEvent::ListFinished {
                context,
                timestamp: Utc::now(),
            });
        }
    }
}
