//! Test rig for gigbook-player integration tests
//!
//! Wires a [`PlaybackEngine`] to the simulated backend and in-memory
//! collaborators, and offers builders for songs, setlists and sessions.
//! Engines are process-wide singletons, so every test using the rig must
//! be `#[serial]`.

#![allow(dead_code)]

use gigbook_common::events::{FailureKind, RemediationAction};
use gigbook_common::{PlayerEvent, RehearsalSession, Setlist, Song};
use gigbook_player::backend::{BackendCall, BackendFailure, SimulatedBackend};
use gigbook_player::catalog::InMemoryCatalog;
use gigbook_player::config::PlaybackConfig;
use gigbook_player::scheduler::InMemoryScheduler;
use gigbook_player::PlaybackEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};

pub struct TestRig {
    pub engine: PlaybackEngine,
    pub backend: Arc<SimulatedBackend>,
    pub catalog: Arc<InMemoryCatalog>,
    pub scheduler: Arc<InMemoryScheduler>,
    pub events: broadcast::Receiver<PlayerEvent>,
}

/// Media reference the simulated backend knows `title` by
pub fn sim_ref(title: &str) -> String {
    format!("sim://{}", title.to_lowercase().replace(' ', "-"))
}

impl TestRig {
    pub fn new() -> Self {
        Self::with_config(PlaybackConfig::default())
    }

    pub fn with_config(config: PlaybackConfig) -> Self {
        let backend = Arc::new(SimulatedBackend::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let scheduler = Arc::new(InMemoryScheduler::new());
        let engine = PlaybackEngine::new(backend.clone(), catalog.clone(), scheduler.clone(), config)
            .expect("engine should start");
        let events = engine.subscribe();
        Self {
            engine,
            backend,
            catalog,
            scheduler,
            events,
        }
    }

    /// Song with playable simulated media
    pub async fn add_song(&self, title: &str, seconds: f64) -> Song {
        let reference = sim_ref(title);
        self.backend
            .register(reference.clone(), Duration::from_secs_f64(seconds));
        let song = Song::new(title, seconds).with_audio(reference);
        self.catalog.insert_song(song.clone()).await;
        song
    }

    /// Song with no media at all
    pub async fn add_silent_song(&self, title: &str, seconds: f64) -> Song {
        let song = Song::new(title, seconds);
        self.catalog.insert_song(song.clone()).await;
        song
    }

    /// Song whose media fails to load with `failure`
    pub async fn add_broken_song(&self, title: &str, failure: BackendFailure) -> Song {
        let reference = sim_ref(title);
        self.backend.register_broken(reference.clone(), failure);
        let song = Song::new(title, 200.0).with_audio(reference);
        self.catalog.insert_song(song.clone()).await;
        song
    }

    /// Song pointing at an arbitrary reference (local files)
    pub async fn add_song_at(&self, title: &str, reference: &str, seconds: f64) -> Song {
        self.backend
            .register(reference.to_string(), Duration::from_secs_f64(seconds));
        let song = Song::new(title, seconds).with_audio(reference);
        self.catalog.insert_song(song.clone()).await;
        song
    }

    pub async fn add_setlist(&self, songs: &[&Song]) -> Setlist {
        let setlist = Setlist::new("Saturday gig", songs.iter().map(|s| s.id).collect());
        self.catalog.insert_setlist(setlist.clone()).await;
        setlist
    }

    pub async fn add_session(&self, songs: &[&Song]) -> RehearsalSession {
        let session = RehearsalSession::new("Band practice", songs.iter().map(|s| s.id).collect());
        self.scheduler.insert_session(session.clone()).await;
        session
    }

    /// Complete the loaded media, as the backend's completion callback would
    pub async fn finish_current(&self) {
        let handle = self.backend.current_handle().expect("a handle should be loaded");
        assert!(self.backend.finish(handle));
        self.engine.drain_events().await;
    }

    pub fn load_count(&self) -> usize {
        self.backend.count_calls(|c| matches!(c, BackendCall::Load(_)))
    }

    pub fn status_count(&self) -> usize {
        self.backend.count_calls(|c| matches!(c, BackendCall::Status(_)))
    }

    pub fn seek_calls(&self) -> Vec<u64> {
        self.backend
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                BackendCall::Seek(_, ms) => Some(ms),
                _ => None,
            })
            .collect()
    }

    /// Every event received since the last call
    pub fn take_events(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }

    /// Failure events received since the last drain
    pub fn take_failures(&mut self) -> Vec<(FailureKind, RemediationAction, String)> {
        self.take_events()
            .into_iter()
            .filter_map(|e| match e {
                PlayerEvent::PlaybackFailed {
                    kind,
                    action,
                    message,
                    ..
                } => Some((kind, action, message)),
                _ => None,
            })
            .collect()
    }
}

pub fn count_list_finished(events: &[PlayerEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, PlayerEvent::ListFinished { .. }))
        .count()
}
