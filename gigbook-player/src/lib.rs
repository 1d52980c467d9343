//! # gigbook playback engine (gigbook-player)
//!
//! Playback coordination for live performance and rehearsal.
//!
//! **Purpose:** Own exactly one native audio resource at a time, keep the
//! observable [`PlaybackState`](gigbook_common::PlaybackState) in step with
//! it across song, setlist and rehearsal-session transitions, and recover
//! from missing, corrupted or unsupported media.
//!
//! **Architecture:** One serialized command path (the engine core behind an
//! async mutex), one internal event channel fed by the status poller and
//! backend callbacks, and reducer-style folds into shared state.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod playback;
pub mod scheduler;
pub mod state;

pub use error::{Error, Result};
pub use playback::PlaybackEngine;
pub use state::SharedState;
