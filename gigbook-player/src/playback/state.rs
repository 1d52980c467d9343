//! Playback state transitions
//!
//! Every change to [`PlaybackState`] is expressed as a [`StateAction`] and
//! applied by [`reduce`]. Nothing else mutates the state value.

use gigbook_common::PlaybackState;

pub const MIN_RATE: f32 = 0.5;
pub const MAX_RATE: f32 = 2.0;

/// State transitions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateAction {
    /// A song was addressed: position rewinds, duration is known
    Loaded { duration: f64, playing: bool },
    /// Caller intent or backend confirmation of playing/paused
    PlayIntent(bool),
    /// Fold of a backend status report
    Snapshot {
        position: f64,
        duration: Option<f64>,
        playing: bool,
    },
    /// A seek landed at `target`
    Seeked(f64),
    /// Back to the start, stopped
    Rewound,
    /// Handle released; nothing is playing
    Unloaded,
    /// Nothing addressed; user preferences survive
    Idle,
    RateSet(f32),
    VolumeSet(f32),
    MuteSet(bool),
    LoopingSet(bool),
}

fn clamp_position(position: f64, duration: f64) -> f64 {
    let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
    if duration > 0.0 {
        position.min(duration)
    } else {
        position
    }
}

/// Apply `action` to `state`, returning whether anything changed
pub fn reduce(state: &mut PlaybackState, action: &StateAction) -> bool {
    let before = *state;

    match *action {
        StateAction::Loaded { duration, playing } => {
            state.duration_seconds = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
            state.current_time_seconds = 0.0;
            state.is_playing = playing;
        }
        StateAction::PlayIntent(playing) => {
            state.is_playing = playing;
        }
        StateAction::Snapshot {
            position,
            duration,
            playing,
        } => {
            if let Some(duration) = duration.filter(|d| d.is_finite() && *d > 0.0) {
                state.duration_seconds = duration;
            }
            state.current_time_seconds = clamp_position(position, state.duration_seconds);
            state.is_playing = playing;
        }
        StateAction::Seeked(target) => {
            state.current_time_seconds = clamp_position(target, state.duration_seconds);
        }
        StateAction::Rewound => {
            state.current_time_seconds = 0.0;
            state.is_playing = false;
        }
        StateAction::Unloaded => {
            state.is_playing = false;
        }
        StateAction::Idle => {
            state.is_playing = false;
            state.current_time_seconds = 0.0;
            state.duration_seconds = 0.0;
        }
        StateAction::RateSet(rate) => {
            state.playback_rate = rate.clamp(MIN_RATE, MAX_RATE);
        }
        StateAction::VolumeSet(volume) => {
            state.volume = volume.clamp(0.0, 1.0);
        }
        StateAction::MuteSet(muted) => {
            state.is_muted = muted;
        }
        StateAction::LoopingSet(looping) => {
            state.is_looping = looping;
        }
    }

    *state != before
}
