//! Song catalog collaborator
//!
//! The engine reads songs and setlists through [`Catalog`] and writes back
//! only one thing: dropping a media reference that turned out to be
//! broken. [`Library`] is the JSON file format the demo binary loads into
//! the in-memory implementations.

use crate::error::{Error, Result};
use crate::scheduler::InMemoryScheduler;
use async_trait::async_trait;
use gigbook_common::{RehearsalSession, Setlist, SetlistId, Song, SongId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::info;

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn get_song(&self, id: SongId) -> Result<Option<Song>>;

    async fn get_setlist(&self, id: SetlistId) -> Result<Option<Setlist>>;

    /// Drop the song's media reference
    async fn clear_audio_reference(&self, id: SongId) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryCatalog {
    songs: RwLock<HashMap<SongId, Song>>,
    setlists: RwLock<HashMap<SetlistId, Setlist>>,
    cleared: RwLock<Vec<SongId>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_song(&self, song: Song) {
        self.songs.write().await.insert(song.id, song);
    }

    pub async fn insert_setlist(&self, setlist: Setlist) {
        self.setlists.write().await.insert(setlist.id, setlist);
    }

    pub async fn songs(&self) -> Vec<Song> {
        self.songs.read().await.values().cloned().collect()
    }

    /// Songs whose reference was cleared, in call order (repeats included)
    pub async fn cleared_references(&self) -> Vec<SongId> {
        self.cleared.read().await.clone()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn get_song(&self, id: SongId) -> Result<Option<Song>> {
        Ok(self.songs.read().await.get(&id).cloned())
    }

    async fn get_setlist(&self, id: SetlistId) -> Result<Option<Setlist>> {
        Ok(self.setlists.read().await.get(&id).cloned())
    }

    async fn clear_audio_reference(&self, id: SongId) -> Result<()> {
        let mut songs = self.songs.write().await;
        let song = songs.get_mut(&id).ok_or(Error::SongNotFound(id))?;
        song.audio_reference = None;
        song.audio_file_name = None;
        self.cleared.write().await.push(id);
        Ok(())
    }
}

/// Library file: everything the demo needs in one JSON document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    #[serde(default)]
    pub songs: Vec<Song>,
    #[serde(default)]
    pub setlists: Vec<Setlist>,
    #[serde(default)]
    pub sessions: Vec<RehearsalSession>,
}

impl Library {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(gigbook_common::Error::from)?;
        let library: Library = serde_json::from_str(&content).map_err(gigbook_common::Error::from)?;
        info!(
            "Loaded library {}: {} songs, {} setlists, {} sessions",
            path.display(),
            library.songs.len(),
            library.setlists.len(),
            library.sessions.len()
        );
        Ok(library)
    }

    /// Populate in-memory collaborators from this library
    pub async fn into_collaborators(self) -> (InMemoryCatalog, InMemoryScheduler) {
        let catalog = InMemoryCatalog::new();
        for song in self.songs {
            catalog.insert_song(song).await;
        }
        for setlist in self.setlists {
            catalog.insert_setlist(setlist).await;
        }
        let scheduler = InMemoryScheduler::new();
        for session in self.sessions {
            scheduler.insert_session(session).await;
        }
        (catalog, scheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_clear_audio_reference() {
        let catalog = InMemoryCatalog::new();
        let song = Song::new("Blackbird", 140.0).with_audio("file:///music/blackbird.mp3");
        let id = song.id;
        catalog.insert_song(song).await;

        catalog.clear_audio_reference(id).await.unwrap();

        let song = catalog.get_song(id).await.unwrap().unwrap();
        assert!(song.audio_reference.is_none());
        assert_eq!(catalog.cleared_references().await, vec![id]);
    }

    #[tokio::test]
    async fn test_clear_unknown_song() {
        let catalog = InMemoryCatalog::new();
        let err = catalog.clear_audio_reference(SongId::new()).await.unwrap_err();
        assert!(matches!(err, Error::SongNotFound(_)));
    }

    #[tokio::test]
    async fn test_library_round_trip_through_file() {
        let song = Song::new("Jolene", 162.0);
        let setlist = Setlist::new("Friday", vec![song.id]);
        let session = RehearsalSession::new("Warmup", vec![song.id]);
        let library = Library {
            songs: vec![song.clone()],
            setlists: vec![setlist.clone()],
            sessions: vec![session.clone()],
        };

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&library).unwrap().as_bytes())
            .unwrap();

        let loaded = Library::from_json_file(file.path()).unwrap();
        let (catalog, scheduler) = loaded.into_collaborators().await;

        assert_eq!(catalog.get_song(song.id).await.unwrap(), Some(song));
        assert_eq!(catalog.get_setlist(setlist.id).await.unwrap(), Some(setlist));
        assert_eq!(scheduler.session(session.id).await.map(|s| s.title), Some("Warmup".into()));
    }

    #[test]
    fn test_library_missing_file() {
        let err = Library::from_json_file(Path::new("/nonexistent/library.json")).unwrap_err();
        assert!(matches!(err, Error::Common(gigbook_common::Error::Io(_))));
    }
}
