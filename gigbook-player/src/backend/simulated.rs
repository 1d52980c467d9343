//! Clock-driven stand-in for the native audio backend
//!
//! Media is registered up front with a duration (or a load failure).
//! Positions advance with `tokio::time`, so paused-clock tests control
//! playback precisely. Every call is recorded for inspection, and
//! failures can be injected per transport command.

use super::{AudioBackend, BackendFailure, BackendStatus, HandleId, LoadOptions, TransportCommand};
use crate::playback::events::StatusSink;
use async_trait::async_trait;
use gigbook_common::MediaReference;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Load(MediaReference),
    Play(HandleId),
    Pause(HandleId),
    Seek(HandleId, u64),
    SetRate(HandleId, f32),
    SetVolume(HandleId, f32),
    SetLooping(HandleId, bool),
    Status(HandleId),
    Unload(HandleId),
}

#[derive(Debug, Clone)]
enum MediaSpec {
    Playable { duration_ms: u64 },
    Broken(BackendFailure),
}

struct SimHandle {
    duration_ms: u64,
    /// Position at `anchor` (or the frozen position while paused)
    base_ms: u64,
    /// Set while playing
    anchor: Option<Instant>,
    rate: f32,
    volume: f32,
    looping: bool,
    sink: StatusSink,
}

impl SimHandle {
    fn position_ms(&self, now: Instant) -> u64 {
        let Some(anchor) = self.anchor else {
            return self.base_ms;
        };
        let elapsed = now.saturating_duration_since(anchor).as_secs_f64() * 1000.0;
        let advanced = self.base_ms + (elapsed * self.rate as f64) as u64;
        if self.looping && self.duration_ms > 0 {
            advanced % self.duration_ms
        } else {
            advanced.min(self.duration_ms)
        }
    }

    /// Freeze the current position
    fn halt(&mut self, now: Instant) {
        self.base_ms = self.position_ms(now);
        self.anchor = None;
    }

    fn start(&mut self, now: Instant) {
        if self.anchor.is_none() {
            self.anchor = Some(now);
        }
    }

    fn status(&mut self, now: Instant) -> BackendStatus {
        let position_ms = self.position_ms(now);
        let mut just_finished = false;
        if self.anchor.is_some() && !self.looping && position_ms >= self.duration_ms {
            self.base_ms = self.duration_ms;
            self.anchor = None;
            just_finished = true;
        }
        BackendStatus {
            is_loaded: true,
            is_playing: self.anchor.is_some(),
            position_ms,
            duration_ms: Some(self.duration_ms),
            just_finished,
        }
    }
}

#[derive(Default)]
struct Inner {
    media: HashMap<MediaReference, MediaSpec>,
    handles: HashMap<HandleId, SimHandle>,
    /// Sinks of unloaded handles, for replaying late callbacks
    retired: HashMap<HandleId, StatusSink>,
    next_handle: u64,
    max_live: usize,
    calls: Vec<BackendCall>,
    injected: HashMap<TransportCommand, BackendFailure>,
    status_failure: Option<BackendFailure>,
    load_delay: Option<Duration>,
}

/// In-process backend with simulated time
#[derive(Default)]
pub struct SimulatedBackend {
    inner: Mutex<Inner>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panicking test thread must not wedge every later assertion
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make `reference` loadable with the given duration
    pub fn register(&self, reference: impl Into<String>, duration: Duration) {
        self.lock().media.insert(
            MediaReference::new(reference),
            MediaSpec::Playable {
                duration_ms: duration.as_millis() as u64,
            },
        );
    }

    /// Make every load of `reference` fail with `failure`
    pub fn register_broken(&self, reference: impl Into<String>, failure: BackendFailure) {
        self.lock()
            .media
            .insert(MediaReference::new(reference), MediaSpec::Broken(failure));
    }

    /// Fail the next `command` issued against any handle
    pub fn fail_next(&self, command: TransportCommand, failure: BackendFailure) {
        self.lock().injected.insert(command, failure);
    }

    /// Fail every status query until cleared
    pub fn fail_status(&self, failure: Option<BackendFailure>) {
        self.lock().status_failure = failure;
    }

    /// Delay every load, to exercise timeouts
    pub fn set_load_delay(&self, delay: Option<Duration>) {
        self.lock().load_delay = delay;
    }

    /// Handles currently loaded
    pub fn live_handles(&self) -> usize {
        self.lock().handles.len()
    }

    /// Highest number of simultaneously loaded handles ever observed
    pub fn max_live_handles(&self) -> usize {
        self.lock().max_live
    }

    /// The single live handle, if exactly one exists
    pub fn current_handle(&self) -> Option<HandleId> {
        let inner = self.lock();
        if inner.handles.len() == 1 {
            inner.handles.keys().next().copied()
        } else {
            None
        }
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, matches: impl Fn(&BackendCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| matches(call)).count()
    }

    /// Last volume pushed to `handle`
    pub fn volume_of(&self, handle: HandleId) -> Option<f32> {
        self.lock().handles.get(&handle).map(|h| h.volume)
    }

    pub fn is_playing(&self, handle: HandleId) -> bool {
        self.lock()
            .handles
            .get(&handle)
            .map(|h| h.anchor.is_some())
            .unwrap_or(false)
    }

    /// Jump `handle` to its end and push the completion through its sink,
    /// the way a native completion callback fires
    pub fn finish(&self, handle: HandleId) -> bool {
        let mut inner = self.lock();
        let Some(h) = inner.handles.get_mut(&handle) else {
            return false;
        };
        h.base_ms = h.duration_ms;
        h.anchor = None;
        let status = BackendStatus {
            is_loaded: true,
            is_playing: false,
            position_ms: h.duration_ms,
            duration_ms: Some(h.duration_ms),
            just_finished: true,
        };
        h.sink.publish(status)
    }

    /// Deliver a completion for an already unloaded handle, as a native
    /// callback racing the unload would
    pub fn late_completion(&self, handle: HandleId) -> bool {
        let inner = self.lock();
        let Some(sink) = inner.retired.get(&handle) else {
            return false;
        };
        sink.publish(BackendStatus {
            is_loaded: true,
            is_playing: false,
            position_ms: 0,
            duration_ms: None,
            just_finished: true,
        })
    }

    fn take_injected(inner: &mut Inner, command: TransportCommand) -> Result<(), BackendFailure> {
        match inner.injected.remove(&command) {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn with_handle<T>(
        &self,
        handle: HandleId,
        call: BackendCall,
        command: Option<TransportCommand>,
        f: impl FnOnce(&mut SimHandle, Instant) -> T,
    ) -> Result<T, BackendFailure> {
        let mut inner = self.lock();
        inner.calls.push(call);
        if let Some(command) = command {
            Self::take_injected(&mut inner, command)?;
        }
        let now = Instant::now();
        let h = inner
            .handles
            .get_mut(&handle)
            .ok_or(BackendFailure::UnknownHandle(handle))?;
        Ok(f(h, now))
    }
}

#[async_trait]
impl AudioBackend for SimulatedBackend {
    async fn load(
        &self,
        reference: &MediaReference,
        options: LoadOptions,
        sink: StatusSink,
    ) -> Result<HandleId, BackendFailure> {
        let delay = {
            let mut inner = self.lock();
            inner.calls.push(BackendCall::Load(reference.clone()));
            inner.load_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        let duration_ms = match inner.media.get(reference) {
            Some(MediaSpec::Playable { duration_ms }) => *duration_ms,
            Some(MediaSpec::Broken(failure)) => return Err(failure.clone()),
            None => {
                return Err(BackendFailure::NotFound {
                    detail: reference.to_string(),
                })
            }
        };

        inner.next_handle += 1;
        let id = HandleId(inner.next_handle);
        let now = Instant::now();
        inner.handles.insert(
            id,
            SimHandle {
                duration_ms,
                base_ms: 0,
                anchor: options.autoplay.then_some(now),
                rate: options.rate,
                volume: options.volume,
                looping: options.looping,
                sink,
            },
        );
        inner.max_live = inner.max_live.max(inner.handles.len());
        debug!("Simulated load {} -> {} ({}ms)", reference, id, duration_ms);
        Ok(id)
    }

    async fn play(&self, handle: HandleId) -> Result<(), BackendFailure> {
        self.with_handle(handle, BackendCall::Play(handle), Some(TransportCommand::Play), |h, now| {
            h.start(now)
        })
    }

    async fn pause(&self, handle: HandleId) -> Result<(), BackendFailure> {
        self.with_handle(handle, BackendCall::Pause(handle), Some(TransportCommand::Pause), |h, now| {
            h.halt(now)
        })
    }

    async fn seek(&self, handle: HandleId, position_ms: u64) -> Result<(), BackendFailure> {
        self.with_handle(
            handle,
            BackendCall::Seek(handle, position_ms),
            Some(TransportCommand::Seek),
            |h, now| {
                h.base_ms = position_ms.min(h.duration_ms);
                if h.anchor.is_some() {
                    h.anchor = Some(now);
                }
            },
        )
    }

    async fn set_rate(&self, handle: HandleId, rate: f32) -> Result<(), BackendFailure> {
        self.with_handle(handle, BackendCall::SetRate(handle, rate), Some(TransportCommand::Rate), |h, now| {
            let playing = h.anchor.is_some();
            h.halt(now);
            h.rate = rate;
            if playing {
                h.start(now);
            }
        })
    }

    async fn set_volume(&self, handle: HandleId, volume: f32) -> Result<(), BackendFailure> {
        self.with_handle(
            handle,
            BackendCall::SetVolume(handle, volume),
            Some(TransportCommand::Volume),
            |h, _| h.volume = volume,
        )
    }

    async fn set_looping(&self, handle: HandleId, looping: bool) -> Result<(), BackendFailure> {
        self.with_handle(
            handle,
            BackendCall::SetLooping(handle, looping),
            Some(TransportCommand::Looping),
            |h, now| {
                let playing = h.anchor.is_some();
                h.halt(now);
                h.looping = looping;
                if playing {
                    h.start(now);
                }
            },
        )
    }

    async fn status(&self, handle: HandleId) -> Result<BackendStatus, BackendFailure> {
        let mut inner = self.lock();
        inner.calls.push(BackendCall::Status(handle));
        if let Some(failure) = inner.status_failure.clone() {
            return Err(failure);
        }
        let now = Instant::now();
        let h = inner
            .handles
            .get_mut(&handle)
            .ok_or(BackendFailure::UnknownHandle(handle))?;
        let status = h.status(now);
        trace!("Simulated status {}: {:?}", handle, status);
        Ok(status)
    }

    async fn unload(&self, handle: HandleId) -> Result<(), BackendFailure> {
        let mut inner = self.lock();
        inner.calls.push(BackendCall::Unload(handle));
        if let Some(h) = inner.handles.remove(&handle) {
            inner.retired.insert(handle, h.sink);
            debug!("Simulated unload {}", handle);
        }
        Ok(())
    }
}
