//! Error types for gigbook-player
//!
//! Media failures carry the classified taxonomy so callers can tell a
//! broken file from a hiccup; everything else covers lookups, the engine
//! guard and collaborator failures.

use gigbook_common::events::FailureKind;
use gigbook_common::{MediaReference, SessionId, SetlistId, SongId};
use thiserror::Error;

/// Main error type for gigbook-player
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced media no longer resolves
    #[error("Media missing: {reference}")]
    ResourceMissing {
        song_id: Option<SongId>,
        reference: MediaReference,
    },

    /// Media resolves but cannot be read
    #[error("Media corrupted: {reference}")]
    ResourceCorrupted {
        song_id: Option<SongId>,
        reference: MediaReference,
    },

    /// Backend cannot decode this media type
    #[error("Unsupported media format: {reference}")]
    FormatUnsupported {
        song_id: Option<SongId>,
        reference: MediaReference,
    },

    /// Load failed for an unclear reason
    #[error("Load failed for {reference}: {reason}")]
    TransientLoadFailure {
        song_id: Option<SongId>,
        reference: MediaReference,
        reason: String,
    },

    /// Seek rejected by the backend; engine was reset to idle
    #[error("Seek failed: {0}")]
    SeekFailed(String),

    /// Backend status unreadable for the loaded handle
    #[error("Status query failed: {0}")]
    StatusQueryFailed(String),

    /// Non-seek transport command rejected by the backend
    #[error("Transport command {command} failed: {reason}")]
    TransportFailed {
        command: &'static str,
        reason: String,
    },

    #[error("Song not found: {0}")]
    SongNotFound(SongId),

    #[error("Setlist not found: {0}")]
    SetlistNotFound(SetlistId),

    #[error("Rehearsal session not found: {0}")]
    SessionNotFound(SessionId),

    /// Tried to navigate a list with no songs
    #[error("Nothing to play: {0}")]
    EmptyList(String),

    #[error("Index {index} out of range for list of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid practice loop {start:.2}s..{end:.2}s")]
    InvalidLoopRegion { start: f64, end: f64 },

    /// A second engine was constructed while one is alive
    #[error("A playback engine is already running in this process")]
    EngineAlreadyRunning,

    #[error(transparent)]
    Common(#[from] gigbook_common::Error),
}

impl Error {
    /// Classified media failure kind, if this error is one
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Error::ResourceMissing { .. } => Some(FailureKind::Missing),
            Error::ResourceCorrupted { .. } => Some(FailureKind::Corrupted),
            Error::FormatUnsupported { .. } => Some(FailureKind::UnsupportedFormat),
            Error::TransientLoadFailure { .. } => Some(FailureKind::TransientLoadFailure),
            Error::SeekFailed(_) | Error::TransportFailed { .. } => {
                Some(FailureKind::TransportFailure)
            }
            Error::StatusQueryFailed(_) => Some(FailureKind::StatusQueryFailed),
            _ => None,
        }
    }

    /// Actionable text for the person on stage
    pub fn user_message(&self) -> String {
        match self {
            Error::ResourceMissing { .. } => {
                "Audio file not found. Please re-import the audio file.".to_string()
            }
            Error::ResourceCorrupted { .. } => {
                "Audio file is corrupted or incompatible. Please re-import the audio.".to_string()
            }
            Error::FormatUnsupported { .. } => {
                "Audio format not supported. Please use MP3, M4A, or WAV files.".to_string()
            }
            Error::TransientLoadFailure { .. } => {
                "Failed to load audio. Please check the file and try again.".to_string()
            }
            Error::SeekFailed(_) => {
                "Could not jump to that position. Playback was stopped.".to_string()
            }
            Error::StatusQueryFailed(_) => {
                "Lost contact with the audio player. Press play to reload the song.".to_string()
            }
            Error::TransportFailed { command, .. } => {
                format!("The audio player rejected the {} change.", command)
            }
            Error::SongNotFound(_) => "That song is no longer in your library.".to_string(),
            Error::SetlistNotFound(_) => "That setlist is no longer available.".to_string(),
            Error::SessionNotFound(_) => "That rehearsal session no longer exists.".to_string(),
            Error::EmptyList(_) => "There are no songs to play.".to_string(),
            Error::InvalidLoopRegion { .. } => {
                "The loop end must come after the loop start.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Convenience Result type using gigbook-player Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_errors_carry_kind() {
        let reference = MediaReference::new("file:///gone.mp3");
        let err = Error::ResourceMissing {
            song_id: None,
            reference,
        };
        assert_eq!(err.failure_kind(), Some(FailureKind::Missing));
        assert!(err.user_message().contains("not found"));
    }

    #[test]
    fn test_lookup_errors_have_no_kind() {
        let err = Error::SongNotFound(SongId::new());
        assert!(err.failure_kind().is_none());
    }

    #[test]
    fn test_seek_failure_is_transport_kind() {
        let err = Error::SeekFailed("rejected".into());
        assert_eq!(err.failure_kind(), Some(FailureKind::TransportFailure));
    }
}
