//! Navigation operations module
//!
//! **Responsibilities:**
//! - Addressing a standalone song or a setlist position
//! - Manual next/previous within the active list
//! - Stopping (navigation away from everything)
//!
//! Every operation that changes the addressed song unloads the previous
//! handle before returning. The list position only moves once the target
//! song has been found in the catalog.

use super::core::PlaybackEngine;
use crate::error::{Error, Result};
use crate::playback::navigation::NavigationSequencer;
use gigbook_common::{NavigationContext, SetlistId, SongId};
use tracing::{debug, info};

impl PlaybackEngine {
    /// Address a standalone song (no auto-advance)
    ///
    /// Selecting the song that is already loaded resumes it instead of
    /// reloading.
    pub async fn play_song(&self, id: SongId, autoplay: bool) -> Result<()> {
        let mut core = self.core.lock().await;

        let already_loaded = core.current_song.as_ref().map(|s| s.id) == Some(id)
            && !core.resources.is_stale();
        if already_loaded {
            debug!("Song {} already addressed", id);
            return if autoplay { core.play_current().await } else { Ok(()) };
        }

        let song = core.lookup_song(id).await?;
        core.sequencer.clear();
        core.load_song(song, None, autoplay).await
    }

    /// Play `id` starting at `start_index`
    pub async fn play_setlist(&self, id: SetlistId, start_index: usize) -> Result<()> {
        let mut core = self.core.lock().await;
        let setlist = core
            .catalog
            .get_setlist(id)
            .await?
            .ok_or(Error::SetlistNotFound(id))?;

        let context = NavigationContext::Setlist {
            setlist_id: id,
            index: start_index,
        };
        let song_id = NavigationSequencer::song_at(&context, &setlist.songs)?;
        let song = core.lookup_song(song_id).await?;

        info!("Playing setlist \"{}\" from index {}", setlist.name, start_index);
        core.sequencer.begin(context, setlist.songs)?;
        core.load_song(song, Some(context), true).await
    }

    /// Move to the next song; `false` (and no change) at the end of the list
    pub async fn next(&self) -> Result<bool> {
        let mut core = self.core.lock().await;
        let Some((context, song_id)) = core.sequencer.peek_next() else {
            debug!("Next ignored, at end of list");
            return Ok(false);
        };
        let autoplay = self.state.playback_state().await.is_playing;
        let song = core.lookup_song(song_id).await?;
        core.sequencer.next();
        core.load_song(song, Some(context), autoplay).await?;
        Ok(true)
    }

    /// Move to the previous song; `false` (and no change) at the start
    pub async fn previous(&self) -> Result<bool> {
        let mut core = self.core.lock().await;
        let Some((context, song_id)) = core.sequencer.peek_previous() else {
            debug!("Previous ignored, at start of list");
            return Ok(false);
        };
        let autoplay = self.state.playback_state().await.is_playing;
        let song = core.lookup_song(song_id).await?;
        core.sequencer.previous();
        core.load_song(song, Some(context), autoplay).await?;
        Ok(true)
    }

    /// Unload everything and return to idle
    pub async fn stop(&self) {
        self.core.lock().await.reset_to_idle().await;
    }
}
