//! Playback engine module
//!
//! **Module Structure:**
//! - `core.rs`: Construction, the command path, event pump, failure handling
//! - `transport.rs`: Play/pause/seek and playback preferences
//! - `navigation.rs`: Song and setlist addressing, next/previous, stop
//! - `sessions.rs`: Rehearsal session start/stop/complete
//! - `diagnostics.rs`: Status accessors

mod core;
mod diagnostics;
mod navigation;
mod sessions;
mod transport;

pub use self::core::{PlaybackEngine, PracticeLoop};
