//! Playback state value and player events
//!
//! `PlaybackState` is the single observable record of what the engine is
//! doing. `PlayerEvent` is what observers receive over the engine's
//! broadcast channel; both serialize to camelCase JSON so a UI layer can
//! forward them unchanged.

use crate::model::{MediaReference, NavigationContext, SessionId, SetlistId, SongId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Observable playback attributes
///
/// `volume` is the level the user asked for and survives muting; what
/// actually reaches the backend is [`PlaybackState::effective_volume`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_time_seconds: f64,
    pub duration_seconds: f64,
    pub is_looping: bool,
    pub playback_rate: f32,
    pub volume: f32,
    pub is_muted: bool,
}

impl PlaybackState {
    /// Output level after applying mute
    pub fn effective_volume(&self) -> f32 {
        if self.is_muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Fraction of the track played, 0.0 when the duration is unknown
    pub fn progress(&self) -> f64 {
        if self.duration_seconds > 0.0 {
            (self.current_time_seconds / self.duration_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_time_seconds: 0.0,
            duration_seconds: 0.0,
            is_looping: false,
            playback_rate: 1.0,
            volume: 1.0,
            is_muted: false,
        }
    }
}

/// Classified cause of a media failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// Reference no longer resolves to any media
    Missing,
    /// Media resolves but is unreadable or truncated
    Corrupted,
    /// Backend cannot decode this media type
    UnsupportedFormat,
    /// Load failed for an unclear reason; retrying may work
    TransientLoadFailure,
    /// A transport command (seek, rate, volume, ...) was rejected
    TransportFailure,
    /// Backend status could not be read for a loaded handle
    StatusQueryFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Missing => "missing",
            FailureKind::Corrupted => "corrupted",
            FailureKind::UnsupportedFormat => "unsupported format",
            FailureKind::TransientLoadFailure => "transient load failure",
            FailureKind::TransportFailure => "transport failure",
            FailureKind::StatusQueryFailed => "status query failed",
        };
        f.write_str(name)
    }
}

/// What the engine does about a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemediationAction {
    /// Strip the broken reference from the owning song
    ClearReference,
    /// Drop everything loaded and return to idle
    ResetToIdle,
    /// Surface the message, change nothing else
    ReportOnly,
}

/// Events broadcast by the playback engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerEvent {
    /// Any observable playback attribute changed
    #[serde(rename_all = "camelCase")]
    PlaybackStateChanged {
        state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The addressed song changed (None = engine went idle)
    #[serde(rename_all = "camelCase")]
    TrackChanged {
        song_id: Option<SongId>,
        context: Option<NavigationContext>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An operation failed; exactly one per failing operation
    #[serde(rename_all = "camelCase")]
    PlaybackFailed {
        kind: FailureKind,
        action: RemediationAction,
        song_id: Option<SongId>,
        reference: Option<MediaReference>,
        /// User-facing, actionable text
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Last song of a list finished without a successor
    #[serde(rename_all = "camelCase")]
    ListFinished {
        context: NavigationContext,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename_all = "camelCase")]
    SessionStarted {
        session_id: SessionId,
        list_id: Option<SetlistId>,
        song_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    #[serde(rename_all = "camelCase")]
    SessionEnded {
        session_id: SessionId,
        completed: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Event name as it appears in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::PlaybackStateChanged { .. } => "playbackStateChanged",
            PlayerEvent::TrackChanged { .. } => "trackChanged",
            PlayerEvent::PlaybackFailed { .. } => "playbackFailed",
            PlayerEvent::ListFinished { .. } => "listFinished",
            PlayerEvent::SessionStarted { .. } => "sessionStarted",
            PlayerEvent::SessionEnded { .. } => "sessionEnded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_volume_respects_mute() {
        let mut state = PlaybackState {
            volume: 0.6,
            ..Default::default()
        };
        assert_eq!(state.effective_volume(), 0.6);

        state.is_muted = true;
        assert_eq!(state.effective_volume(), 0.0);
        assert_eq!(state.volume, 0.6, "muting must not touch the intended level");
    }

    #[test]
    fn test_progress_without_duration() {
        let state = PlaybackState {
            current_time_seconds: 12.0,
            ..Default::default()
        };
        assert_eq!(state.progress(), 0.0);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = PlayerEvent::SessionEnded {
            session_id: SessionId::new(),
            completed: true,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["completed"], true);
        assert!(json.get("sessionId").is_some());
    }

    #[test]
    fn test_playback_state_field_names() {
        let json = serde_json::to_value(PlaybackState::default()).unwrap();
        assert_eq!(json["isPlaying"], false);
        assert_eq!(json["playbackRate"], 1.0);
        assert!(json.get("currentTimeSeconds").is_some());
    }
}
