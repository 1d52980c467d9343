//! Backend failure classification
//!
//! Maps a raw [`BackendFailure`] to the small user-facing taxonomy plus
//! the remediation the engine applies. Native media frameworks report
//! format problems through a handful of numeric codes; everything else is
//! recognised by message keywords, and anything unrecognised is treated
//! as transient.

use crate::backend::{BackendFailure, TransportCommand};
use crate::error::Error;
use gigbook_common::events::{FailureKind, RemediationAction};
use gigbook_common::{MediaReference, SongId};

/// Decoder codes meaning "cannot decode this media type"
const UNSUPPORTED_CODES: &[i64] = &[-11800, -11819];
/// Decoder codes meaning "media is damaged"
const CORRUPTED_CODES: &[i64] = &[-17913];

const UNSUPPORTED_KEYWORDS: &[&str] = &["unsupported", "not supported", "unknown format", "codec"];
const CORRUPTED_KEYWORDS: &[&str] = &["corrupt", "truncated", "invalid data", "malformed"];
const MISSING_KEYWORDS: &[&str] = &["not found", "no such file"];

/// Which operation produced the failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    Load,
    Transport(TransportCommand),
    Status,
}

/// Classified failure
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub kind: FailureKind,
    pub offending_reference: Option<MediaReference>,
    pub action: RemediationAction,
    /// Transport command that failed, for transport failures
    pub command: Option<TransportCommand>,
    /// Backend's own description
    pub detail: String,
}

impl FailureRecord {
    /// Engine error for the failing operation
    pub fn into_error(self, song_id: Option<SongId>) -> Error {
        let reference = self
            .offending_reference
            .unwrap_or_else(|| MediaReference::new(""));
        match self.kind {
            FailureKind::Missing => Error::ResourceMissing { song_id, reference },
            FailureKind::Corrupted => Error::ResourceCorrupted { song_id, reference },
            FailureKind::UnsupportedFormat => Error::FormatUnsupported { song_id, reference },
            FailureKind::TransientLoadFailure => Error::TransientLoadFailure {
                song_id,
                reference,
                reason: self.detail,
            },
            FailureKind::TransportFailure => match self.command {
                Some(TransportCommand::Seek) | None => Error::SeekFailed(self.detail),
                Some(command) => Error::TransportFailed {
                    command: command.as_str(),
                    reason: self.detail,
                },
            },
            FailureKind::StatusQueryFailed => Error::StatusQueryFailed(self.detail),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceFailureClassifier;

impl ResourceFailureClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(
        &self,
        failure: &BackendFailure,
        reference: Option<&MediaReference>,
        phase: FailurePhase,
    ) -> FailureRecord {
        let (kind, action, command) = match phase {
            FailurePhase::Load => {
                let kind = Self::load_kind(failure);
                (kind, Self::load_action(kind), None)
            }
            FailurePhase::Transport(TransportCommand::Seek) => (
                FailureKind::TransportFailure,
                RemediationAction::ResetToIdle,
                Some(TransportCommand::Seek),
            ),
            FailurePhase::Transport(command) => (
                FailureKind::TransportFailure,
                RemediationAction::ReportOnly,
                Some(command),
            ),
            FailurePhase::Status => (
                FailureKind::StatusQueryFailed,
                RemediationAction::ReportOnly,
                None,
            ),
        };

        FailureRecord {
            kind,
            offending_reference: reference.cloned(),
            action,
            command,
            detail: failure.to_string(),
        }
    }

    fn load_kind(failure: &BackendFailure) -> FailureKind {
        match failure {
            BackendFailure::NotFound { .. } => FailureKind::Missing,
            BackendFailure::Unreadable { .. } => FailureKind::Corrupted,
            BackendFailure::Decoder { code, message } => {
                if let Some(code) = code {
                    if UNSUPPORTED_CODES.contains(code) {
                        return FailureKind::UnsupportedFormat;
                    }
                    if CORRUPTED_CODES.contains(code) {
                        return FailureKind::Corrupted;
                    }
                }
                Self::kind_from_message(message)
            }
            BackendFailure::Io { .. }
            | BackendFailure::Timeout { .. }
            | BackendFailure::Rejected { .. }
            | BackendFailure::StatusUnavailable { .. }
            | BackendFailure::UnknownHandle(_) => FailureKind::TransientLoadFailure,
        }
    }

    fn kind_from_message(message: &str) -> FailureKind {
        let message = message.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|k| message.contains(k));

        if has(UNSUPPORTED_KEYWORDS) {
            FailureKind::UnsupportedFormat
        } else if has(CORRUPTED_KEYWORDS) {
            FailureKind::Corrupted
        } else if has(MISSING_KEYWORDS) {
            FailureKind::Missing
        } else {
            FailureKind::TransientLoadFailure
        }
    }

    fn load_action(kind: FailureKind) -> RemediationAction {
        match kind {
            FailureKind::Missing | FailureKind::Corrupted | FailureKind::UnsupportedFormat => {
                RemediationAction::ClearReference
            }
            _ => RemediationAction::ReportOnly,
        }
    }
}
