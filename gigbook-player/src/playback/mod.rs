//! Playback coordination
//!
//! The engine serializes every command through one core and folds status
//! reports from the backend into shared state. Supporting pieces:
//! - `resource`: the single native audio handle and its transport
//! - `failure`: backend failure classification
//! - `navigation`: cursor over setlists and session lists
//! - `session`: rehearsal session lifecycle and ephemeral lists
//! - `poller`, `events`: status polling and the internal event channel
//! - `state`: reducer actions for the observable state

pub mod engine;
pub mod events;
pub mod failure;
pub mod navigation;
pub mod poller;
pub mod preflight;
pub mod resource;
pub mod session;
pub mod state;

pub use engine::{PlaybackEngine, PracticeLoop};
pub use failure::{FailurePhase, FailureRecord, ResourceFailureClassifier};
pub use navigation::{CompletionAction, NavigationSequencer};
pub use resource::{AudioResourceManager, SeekOutcome};
pub use session::{ActiveSession, SessionLifecycleCoordinator, SessionPlan};
