//! Native audio backend seam
//!
//! Decoding, mixing and output belong to the platform's media framework.
//! The engine only needs the narrow handle-based surface below; a
//! production build wires in the platform binding, tests and the demo
//! binary use [`SimulatedBackend`].

mod simulated;

pub use simulated::{BackendCall, SimulatedBackend};

use crate::playback::events::StatusSink;
use async_trait::async_trait;
use gigbook_common::MediaReference;
use std::fmt;

/// Backend-issued identifier for one loaded resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Initial parameters applied atomically with the load
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    pub rate: f32,
    pub looping: bool,
    /// Effective level (already zero when muted)
    pub volume: f32,
    pub autoplay: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            looping: false,
            volume: 1.0,
            autoplay: false,
        }
    }
}

/// Raw status as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BackendStatus {
    pub is_loaded: bool,
    pub is_playing: bool,
    pub position_ms: u64,
    /// None while the backend has not measured the media yet
    pub duration_ms: Option<u64>,
    /// Set on exactly one report after the media reached its end
    pub just_finished: bool,
}

/// Transport commands, for failure attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportCommand {
    Play,
    Pause,
    Seek,
    Rate,
    Volume,
    Looping,
}

impl TransportCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportCommand::Play => "play",
            TransportCommand::Pause => "pause",
            TransportCommand::Seek => "seek",
            TransportCommand::Rate => "playback rate",
            TransportCommand::Volume => "volume",
            TransportCommand::Looping => "loop",
        }
    }
}

/// Failure as the backend reports it, before classification
#[derive(Debug, Clone, PartialEq)]
pub enum BackendFailure {
    /// Nothing at the referenced location
    NotFound { detail: String },
    /// Something is there but cannot be read (truncated, empty, not a file)
    Unreadable { detail: String },
    /// Decoder or media-framework error, with the native code if any
    Decoder { code: Option<i64>, message: String },
    /// Filesystem or platform error while resolving the reference
    Io { detail: String },
    /// Call did not complete within the configured bound
    Timeout { operation: &'static str },
    /// Transport command refused for a loaded handle
    Rejected {
        command: TransportCommand,
        message: String,
    },
    /// Status could not be read
    StatusUnavailable { message: String },
    /// Handle is not (or no longer) known to the backend
    UnknownHandle(HandleId),
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendFailure::NotFound { detail } => write!(f, "not found: {}", detail),
            BackendFailure::Unreadable { detail } => write!(f, "unreadable: {}", detail),
            BackendFailure::Decoder {
                code: Some(code),
                message,
            } => write!(f, "decoder error {}: {}", code, message),
            BackendFailure::Decoder { code: None, message } => {
                write!(f, "decoder error: {}", message)
            }
            BackendFailure::Io { detail } => write!(f, "i/o error: {}", detail),
            BackendFailure::Timeout { operation } => write!(f, "{} timed out", operation),
            BackendFailure::Rejected { command, message } => {
                write!(f, "{} rejected: {}", command.as_str(), message)
            }
            BackendFailure::StatusUnavailable { message } => {
                write!(f, "status unavailable: {}", message)
            }
            BackendFailure::UnknownHandle(handle) => write!(f, "unknown handle {}", handle),
        }
    }
}

/// Handle-based native audio surface
///
/// Implementations must tolerate `unload` of an unknown handle and must
/// stop publishing through the [`StatusSink`] once the handle is unloaded.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Create a resource for `reference`. The sink receives pushed status
    /// updates (completion in particular) for the lifetime of the handle.
    async fn load(
        &self,
        reference: &MediaReference,
        options: LoadOptions,
        sink: StatusSink,
    ) -> Result<HandleId, BackendFailure>;

    async fn play(&self, handle: HandleId) -> Result<(), BackendFailure>;

    async fn pause(&self, handle: HandleId) -> Result<(), BackendFailure>;

    async fn seek(&self, handle: HandleId, position_ms: u64) -> Result<(), BackendFailure>;

    async fn set_rate(&self, handle: HandleId, rate: f32) -> Result<(), BackendFailure>;

    async fn set_volume(&self, handle: HandleId, volume: f32) -> Result<(), BackendFailure>;

    async fn set_looping(&self, handle: HandleId, looping: bool) -> Result<(), BackendFailure>;

    async fn status(&self, handle: HandleId) -> Result<BackendStatus, BackendFailure>;

    /// Release the resource and detach its status sink
    async fn unload(&self, handle: HandleId) -> Result<(), BackendFailure>;
}
