//! Internal event channel between status producers and the engine
//!
//! Both the status poller and backend completion callbacks publish
//! [`EngineEvent::Status`] into one unbounded channel. The engine's pump
//! task folds them into [`crate::state::SharedState`] one at a time, so
//! state updates never interleave.
//!
//! Every status event is stamped with the handle generation it was read
//! from and the seek epoch at read time. The pump drops events whose
//! generation is no longer loaded or whose epoch has been superseded by a
//! seek.

use crate::backend::{BackendFailure, BackendStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Where a status report came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    /// Periodic poll
    Poll,
    /// Pushed by the backend (completion callback)
    Callback,
}

/// Events consumed by the engine pump
#[derive(Debug)]
pub(crate) enum EngineEvent {
    Status {
        generation: u64,
        epoch: u64,
        source: StatusSource,
        result: Result<BackendStatus, BackendFailure>,
        /// Signalled once the event has been folded
        ack: Option<oneshot::Sender<()>>,
    },
    /// Signalled once every earlier event has been folded
    Barrier(oneshot::Sender<()>),
}

pub(crate) type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;
pub(crate) type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

pub(crate) fn engine_channel() -> (EngineEventSender, EngineEventReceiver) {
    mpsc::unbounded_channel()
}

/// Seek epoch counter
///
/// Even values mean no seek is outstanding. [`SeekEpoch::begin`] moves to
/// an odd value and [`SeekEpoch::settle`] to the next even one, so any
/// status read before or during a seek carries an epoch that no longer
/// matches once the seek resolves.
#[derive(Debug, Default)]
pub struct SeekEpoch(AtomicU64);

impl SeekEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn is_settled(&self) -> bool {
        self.current() % 2 == 0
    }

    /// Mark a seek as outstanding
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Mark the outstanding seek as resolved (landed or failed)
    pub fn settle(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Whether a status read at `epoch` may still be applied
    pub fn accepts(&self, epoch: u64) -> bool {
        epoch % 2 == 0 && epoch == self.current()
    }
}

/// Publishing end handed to the backend with every load
///
/// Cloneable and cheap. Publishing after the handle was unloaded is
/// harmless: the generation no longer matches and the pump discards it.
#[derive(Debug, Clone)]
pub struct StatusSink {
    generation: u64,
    epoch: Arc<SeekEpoch>,
    tx: EngineEventSender,
}

impl StatusSink {
    pub(crate) fn new(generation: u64, epoch: Arc<SeekEpoch>, tx: EngineEventSender) -> Self {
        Self { generation, epoch, tx }
    }

    /// Generation of the handle this sink belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Push a status report. Returns false once the engine is gone.
    pub fn publish(&self, status: BackendStatus) -> bool {
        self.tx
            .send(EngineEvent::Status {
                generation: self.generation,
                epoch: self.epoch.current(),
                source: StatusSource::Callback,
                result: Ok(status),
                ack: None,
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_rejects_reads_from_before_a_seek() {
        let epoch = SeekEpoch::new();
        let before = epoch.current();
        assert!(epoch.accepts(before));

        let during = epoch.begin();
        assert!(!epoch.is_settled());
        assert!(!epoch.accepts(during), "nothing applies mid-seek");

        let after = epoch.settle();
        assert!(epoch.is_settled());
        assert!(!epoch.accepts(before));
        assert!(epoch.accepts(after));
    }

    #[tokio::test]
    async fn test_sink_stamps_generation_and_epoch() {
        let (tx, mut rx) = engine_channel();
        let epoch = Arc::new(SeekEpoch::new());
        let sink = StatusSink::new(7, epoch.clone(), tx);

        epoch.begin();
        epoch.settle();
        assert!(sink.publish(BackendStatus::default()));

        match rx.recv().await {
            Some(EngineEvent::Status {
                generation,
                epoch: stamped,
                source,
                ..
            }) => {
                assert_eq!(generation, 7);
                assert_eq!(stamped, 2);
                assert_eq!(source, StatusSource::Callback);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_publish_after_engine_dropped() {
        let (tx, rx) = engine_channel();
        let sink = StatusSink::new(1, Arc::new(SeekEpoch::new()), tx);
        drop(rx);
        assert!(!sink.publish(BackendStatus::default()));
    }
}
