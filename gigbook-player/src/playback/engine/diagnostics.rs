//! Status accessors
//!
//! Read-only views of the engine for observers and tests.

use super::core::{PlaybackEngine, PracticeLoop};
use crate::state::NowPlaying;
use gigbook_common::{PlaybackState, Song};

impl PlaybackEngine {
    pub async fn playback_state(&self) -> PlaybackState {
        self.state.playback_state().await
    }

    pub async fn now_playing(&self) -> NowPlaying {
        self.state.now_playing().await
    }

    /// Catalog record of the addressed song
    pub async fn current_song(&self) -> Option<Song> {
        self.core.lock().await.current_song.clone()
    }

    pub async fn practice_loop(&self) -> Option<PracticeLoop> {
        self.core.lock().await.practice_loop
    }

    /// Whether a handle is loaded (and still trusted)
    pub async fn is_loaded(&self) -> bool {
        let core = self.core.lock().await;
        core.resources.is_loaded() && !core.resources.is_stale()
    }

    pub fn is_polling_suspended(&self) -> bool {
        !self.gate.allows_polling()
    }
}
