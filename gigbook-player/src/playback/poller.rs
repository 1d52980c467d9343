//! Background status polling for the loaded handle
//!
//! One poller task per loaded handle. It reads backend status on a fixed
//! interval while playback is running and forwards each read to the engine
//! pump, waiting for the fold to finish before the next tick so updates
//! can never arrive out of order.

use super::events::{EngineEvent, EngineEventSender, SeekEpoch, StatusSource};
use crate::backend::{AudioBackend, BackendFailure, HandleId};
use crate::state::SharedState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Conditions under which polling is suspended regardless of playback
#[derive(Debug, Default)]
pub struct PollGate {
    scrubbing: AtomicBool,
    backgrounded: AtomicBool,
}

impl PollGate {
    pub fn set_scrubbing(&self, scrubbing: bool) {
        self.scrubbing.store(scrubbing, Ordering::Release);
    }

    pub fn set_backgrounded(&self, backgrounded: bool) {
        self.backgrounded.store(backgrounded, Ordering::Release);
    }

    pub fn is_scrubbing(&self) -> bool {
        self.scrubbing.load(Ordering::Acquire)
    }

    pub fn is_backgrounded(&self) -> bool {
        self.backgrounded.load(Ordering::Acquire)
    }

    pub fn allows_polling(&self) -> bool {
        !self.is_scrubbing() && !self.is_backgrounded()
    }
}

/// Running poller; aborted when dropped
#[derive(Debug)]
pub struct PollerTask(JoinHandle<()>);

impl Drop for PollerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Everything a poller needs, captured at load time
pub(crate) struct PollerContext {
    pub backend: Arc<dyn AudioBackend>,
    pub state: Arc<SharedState>,
    pub events_tx: EngineEventSender,
    pub epoch: Arc<SeekEpoch>,
    pub gate: Arc<PollGate>,
    pub interval: Duration,
    pub timeout: Duration,
}

pub(crate) fn spawn_status_poller(ctx: PollerContext, handle: HandleId, generation: u64) -> PollerTask {
    PollerTask(tokio::spawn(poll_status(ctx, handle, generation)))
}

async fn poll_status(ctx: PollerContext, handle: HandleId, generation: u64) {
    let mut ticker = time::interval_at(Instant::now() + ctx.interval, ctx.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(
        "Status poller started for {} (generation {}, {}ms interval)",
        handle,
        generation,
        ctx.interval.as_millis()
    );

    loop {
        ticker.tick().await;

        if !ctx.gate.allows_polling() || !ctx.epoch.is_settled() {
            continue;
        }
        if !ctx.state.playback_state().await.is_playing {
            continue;
        }

        let epoch = ctx.epoch.current();
        let result = match time::timeout(ctx.timeout, ctx.backend.status(handle)).await {
            Ok(result) => result,
            Err(_) => Err(BackendFailure::Timeout { operation: "status" }),
        };
        let failed = result.is_err();

        let (ack_tx, ack_rx) = oneshot::channel();
        let event = EngineEvent::Status {
            generation,
            epoch,
            source: StatusSource::Poll,
            result,
            ack: Some(ack_tx),
        };
        if ctx.events_tx.send(event).is_err() {
            info!("Engine gone, status poller for {} exiting", handle);
            return;
        }
        let _ = ack_rx.await;

        if failed {
            warn!("Status poller for {} stopped after a failed read", handle);
            return;
        }
    }
}
