//! Catalog records and identifiers
//!
//! Songs, setlists and rehearsal sessions are owned by external stores
//! (catalog persistence and the rehearsal scheduler). The playback engine
//! only reads them through its collaborator traits, so these types are
//! plain serializable values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Song identifier
    SongId
);
uuid_id!(
    /// Setlist identifier (also used for ephemeral session lists)
    SetlistId
);
uuid_id!(
    /// Rehearsal session identifier
    SessionId
);

/// Opaque locator for a playable media asset
///
/// Usually a file URI or path handed out by the import flow, but the
/// engine never interprets it beyond [`MediaReference::local_path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaReference(String);

impl MediaReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local filesystem path, if this reference points at one
    ///
    /// `file://` URIs and absolute paths resolve; anything else
    /// (content URIs, in-memory test media) returns `None`.
    pub fn local_path(&self) -> Option<PathBuf> {
        if let Some(rest) = self.0.strip_prefix("file://") {
            return Some(PathBuf::from(rest));
        }
        let path = Path::new(&self.0);
        if path.is_absolute() {
            Some(path.to_path_buf())
        } else {
            None
        }
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A song in the musician's catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: SongId,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// Nominal duration in seconds, used when there is no media to measure
    #[serde(default)]
    pub duration_seconds: f64,
    /// Backing track or reference recording, if one was imported
    #[serde(default)]
    pub audio_reference: Option<MediaReference>,
    #[serde(default)]
    pub audio_file_name: Option<String>,
}

impl Song {
    pub fn new(title: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            id: SongId::new(),
            title: title.into(),
            artist: String::new(),
            duration_seconds,
            audio_reference: None,
            audio_file_name: None,
        }
    }

    /// Builder-style helper attaching a media reference
    pub fn with_audio(mut self, reference: impl Into<String>) -> Self {
        self.audio_reference = Some(MediaReference::new(reference));
        self
    }
}

/// Ordered list of songs for a gig
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setlist {
    pub id: SetlistId,
    pub name: String,
    pub songs: Vec<SongId>,
    /// Short-lived list synthesized for a rehearsal session
    #[serde(default)]
    pub ephemeral: bool,
}

impl Setlist {
    pub fn new(name: impl Into<String>, songs: Vec<SongId>) -> Self {
        Self {
            id: SetlistId::new(),
            name: name.into(),
            songs,
            ephemeral: false,
        }
    }
}

/// A planned rehearsal: songs to work through plus goals and notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RehearsalSession {
    pub id: SessionId,
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: u32,
    pub song_ids: Vec<SongId>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub practice_goals: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_song_index: Option<usize>,
    /// List backing navigation while the session runs (multi-song sessions only)
    #[serde(default)]
    pub ephemeral_list_id: Option<SetlistId>,
}

impl RehearsalSession {
    pub fn new(title: impl Into<String>, song_ids: Vec<SongId>) -> Self {
        Self {
            id: SessionId::new(),
            title: title.into(),
            date: Utc::now(),
            duration_minutes: 0,
            song_ids,
            notes: String::new(),
            practice_goals: Vec::new(),
            focus_areas: Vec::new(),
            completed: false,
            is_active: false,
            started_at: None,
            current_song_index: None,
            ephemeral_list_id: None,
        }
    }
}

/// Which ordered list the engine is navigating
///
/// A standalone song has no context at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NavigationContext {
    Setlist { setlist_id: SetlistId, index: usize },
    Session { session_id: SessionId, index: usize },
}

impl NavigationContext {
    pub fn index(&self) -> usize {
        match self {
            NavigationContext::Setlist { index, .. } | NavigationContext::Session { index, .. } => {
                *index
            }
        }
    }

    /// Same list, different position
    pub fn with_index(self, index: usize) -> Self {
        match self {
            NavigationContext::Setlist { setlist_id, .. } => {
                NavigationContext::Setlist { setlist_id, index }
            }
            NavigationContext::Session { session_id, .. } => {
                NavigationContext::Session { session_id, index }
            }
        }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            NavigationContext::Session { session_id, .. } => Some(*session_id),
            NavigationContext::Setlist { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path_resolution() {
        let uri = MediaReference::new("file:///music/intro.mp3");
        assert_eq!(uri.local_path(), Some(PathBuf::from("/music/intro.mp3")));

        let absolute = MediaReference::new("/tmp/take2.wav");
        assert_eq!(absolute.local_path(), Some(PathBuf::from("/tmp/take2.wav")));

        let opaque = MediaReference::new("content://media/42");
        assert!(opaque.local_path().is_none());
    }

    #[test]
    fn test_context_with_index_keeps_list() {
        let setlist_id = SetlistId::new();
        let ctx = NavigationContext::Setlist { setlist_id, index: 0 };
        let moved = ctx.with_index(2);

        assert_eq!(moved.index(), 2);
        assert_eq!(moved, NavigationContext::Setlist { setlist_id, index: 2 });
        assert!(moved.session_id().is_none());
    }

    #[test]
    fn test_song_deserializes_without_optional_fields() {
        let id = SongId::new();
        let json = format!(r#"{{"id":"{}","title":"Wonderwall"}}"#, id);
        let song: Song = serde_json::from_str(&json).unwrap();

        assert_eq!(song.id, id);
        assert!(song.audio_reference.is_none());
        assert_eq!(song.duration_seconds, 0.0);
    }
}
