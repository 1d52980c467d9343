//! # gigbook common library
//!
//! Shared code for the gigbook crates:
//! - Identifiers and catalog records (songs, setlists, rehearsal sessions)
//! - The observable playback state value and the player event enum
//! - Failure taxonomy types shared by the engine and its observers
//! - Config file resolution and human-readable time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod model;

pub use error::{Error, Result};
pub use events::{PlaybackState, PlayerEvent};
pub use model::{
    MediaReference, NavigationContext, RehearsalSession, SessionId, Setlist, SetlistId, Song,
    SongId,
};
