//! Shared playback state
//!
//! Thread-safe shared state read by every consumer of the engine. Writers
//! go through [`SharedState::dispatch`], which applies a reducer action
//! and broadcasts the new value when it changed.

use crate::playback::state::{reduce, StateAction};
use chrono::Utc;
use gigbook_common::{NavigationContext, PlaybackState, PlayerEvent, SongId};
use tokio::sync::{broadcast, RwLock};
use tracing::trace;

/// Which song is addressed, and in which list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NowPlaying {
    pub song_id: Option<SongId>,
    pub context: Option<NavigationContext>,
}

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes
pub struct SharedState {
    /// Current observable playback attributes
    playback: RwLock<PlaybackState>,

    /// Addressed song and navigation position
    now_playing: RwLock<NowPlaying>,

    /// Event broadcaster for observers
    event_tx: broadcast::Sender<PlayerEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            playback: RwLock::new(PlaybackState::default()),
            now_playing: RwLock::new(NowPlaying::default()),
            event_tx,
        }
    }

    /// Broadcast an event to all subscribers
    pub fn broadcast_event(&self, event: PlayerEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.event_tx.subscribe()
    }

    pub async fn playback_state(&self) -> PlaybackState {
        *self.playback.read().await
    }

    /// Apply `action`; broadcasts `PlaybackStateChanged` if the state changed
    pub async fn dispatch(&self, action: StateAction) -> bool {
        let mut state = self.playback.write().await;
        let changed = reduce(&mut state, &action);
        if changed {
            trace!("{:?} -> {:?}", action, *state);
            self.broadcast_event(PlayerEvent::PlaybackStateChanged {
                state: *state,
                timestamp: Utc::now(),
            });
        }
        changed
    }

    pub async fn now_playing(&self) -> NowPlaying {
        *self.now_playing.read().await
    }

    /// Record the addressed song; broadcasts `TrackChanged` on change
    pub async fn set_now_playing(&self, song_id: Option<SongId>, context: Option<NavigationContext>) {
        let next = NowPlaying { song_id, context };
        let mut current = self.now_playing.write().await;
        if *current == next {
            return;
        }
        *current = next;
        self.broadcast_event(PlayerEvent::TrackChanged {
            song_id,
            context,
            timestamp: Utc::now(),
        });
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
