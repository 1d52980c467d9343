//! Cursor over the ordered list being played
//!
//! Holds the active [`NavigationContext`] and a snapshot of the list's song
//! order. No wraparound: `next` at the last index and `previous` at index 0
//! refuse to move.
//!
//! Callers peek first and move the cursor only once the target song has
//! been resolved, so a failed lookup never leaves the cursor pointing away
//! from the loaded song.

use crate::error::{Error, Result};
use gigbook_common::{NavigationContext, SongId};

/// What to do when the current song finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAction {
    /// Load `song_id` at `context`
    Advance {
        context: NavigationContext,
        song_id: SongId,
    },
    /// Nothing follows; rewind and stop (`None` for a standalone song)
    EndOfList { context: Option<NavigationContext> },
}

#[derive(Debug, Default)]
pub struct NavigationSequencer {
    context: Option<NavigationContext>,
    songs: Vec<SongId>,
}

impl NavigationSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start navigating `songs` at `context`'s index
    ///
    /// Leaves the sequencer untouched on error.
    pub fn begin(&mut self, context: NavigationContext, songs: Vec<SongId>) -> Result<SongId> {
        let song_id = Self::song_at(&context, &songs)?;
        self.context = Some(context);
        self.songs = songs;
        Ok(song_id)
    }

    /// Song `begin` would start on, without touching the cursor
    pub fn song_at(context: &NavigationContext, songs: &[SongId]) -> Result<SongId> {
        if songs.is_empty() {
            return Err(Error::EmptyList(describe(context)));
        }
        let index = context.index();
        songs.get(index).copied().ok_or(Error::IndexOutOfRange {
            index,
            len: songs.len(),
        })
    }

    /// Forget the list (standalone song or idle)
    pub fn clear(&mut self) {
        self.context = None;
        self.songs.clear();
    }

    pub fn current(&self) -> Option<NavigationContext> {
        self.context
    }

    pub fn has_next(&self) -> bool {
        self.context
            .map(|ctx| ctx.index() + 1 < self.songs.len())
            .unwrap_or(false)
    }

    pub fn has_previous(&self) -> bool {
        self.context.map(|ctx| ctx.index() > 0).unwrap_or(false)
    }

    /// Target of `next` without moving
    pub fn peek_next(&self) -> Option<(NavigationContext, SongId)> {
        if !self.has_next() {
            return None;
        }
        let ctx = self.context?;
        let ctx = ctx.with_index(ctx.index() + 1);
        Some((ctx, self.songs[ctx.index()]))
    }

    /// Advance one position; `None` at the end of the list
    pub fn next(&mut self) -> Option<(NavigationContext, SongId)> {
        let target = self.peek_next()?;
        self.context = Some(target.0);
        Some(target)
    }

    /// Target of `previous` without moving
    pub fn peek_previous(&self) -> Option<(NavigationContext, SongId)> {
        if !self.has_previous() {
            return None;
        }
        let ctx = self.context?;
        let ctx = ctx.with_index(ctx.index() - 1);
        Some((ctx, self.songs[ctx.index()]))
    }

    /// Retreat one position; `None` at the start of the list
    pub fn previous(&mut self) -> Option<(NavigationContext, SongId)> {
        let target = self.peek_previous()?;
        self.context = Some(target.0);
        Some(target)
    }

    /// Decide what follows a finished song. The cursor does not move;
    /// the caller commits an `Advance` with [`NavigationSequencer::next`].
    pub fn on_completion(&self) -> CompletionAction {
        match self.peek_next() {
            Some((context, song_id)) => CompletionAction::Advance { context, song_id },
            None => CompletionAction::EndOfList {
                context: self.context,
            },
        }
    }
}

fn describe(context: &NavigationContext) -> String {
    match context {
        NavigationContext::Setlist { setlist_id, .. } => format!("setlist {}", setlist_id),
        NavigationContext::Session { session_id, .. } => format!("session {}", session_id),
    }
}
