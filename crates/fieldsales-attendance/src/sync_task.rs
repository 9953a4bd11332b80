//! Background location sync while the agent is online
//!
//! Handles:
//! - Pushing the latest known position every sync interval
//! - Skipping ticks while no position is known
//! - Arming and disarming the timer on attendance state edges
//!
//! Failed pushes are logged and dropped. The timer keeps running and the
//! next tick pushes whatever position is current by then.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use fieldsales_core::{GeoPosition, ProfileId, ProfileStore, StoreResult};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::event::{AttendanceEvent, SyncTrigger};
use crate::position::PositionState;

/// Counters for the periodic sync, for diagnostics only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Timer ticks observed
    pub ticks: u64,
    /// Pushes accepted by the store
    pub pushed: u64,
    /// Pushes rejected by the store
    pub failed: u64,
    /// Ticks with no position to push
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct SyncCounters {
    ticks: AtomicU64,
    pushed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl SyncCounters {
    fn snapshot(&self) -> SyncStats {
        SyncStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            pushed: self.pushed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Write one position to the store and report the outcome
pub(crate) async fn push_location(
    store: &dyn ProfileStore,
    profile_id: &ProfileId,
    position: GeoPosition,
    trigger: SyncTrigger,
    events: &broadcast::Sender<AttendanceEvent>,
) -> StoreResult<()> {
    match store.set_location(profile_id, position).await {
        Ok(()) => {
            info!(%profile_id, %position, %trigger, "Location synced");
            let _ = events.send(AttendanceEvent::LocationPushed { position, trigger });
            Ok(())
        }
        Err(e) => {
            warn!(%profile_id, %trigger, error = %e, "Failed to sync location");
            let _ = events.send(AttendanceEvent::LocationPushFailed {
                position,
                trigger,
                error: e.clone(),
            });
            Err(e)
        }
    }
}

/// Background location sync task
pub(crate) struct LocationSyncTask {
    /// Profile the positions are written to
    profile_id: ProfileId,
    store: Arc<dyn ProfileStore>,
    /// Latest-position slot
    positions: watch::Receiver<PositionState>,
    /// Sync interval
    sync_interval: Duration,
    /// Deadline of the first tick, one interval after arming
    first_tick: Instant,
    /// Shutdown signal
    shutdown_rx: broadcast::Receiver<()>,
    events: broadcast::Sender<AttendanceEvent>,
    counters: Arc<SyncCounters>,
}

impl LocationSyncTask {
    fn new(scheduler: &SyncScheduler, shutdown_rx: broadcast::Receiver<()>) -> Self {
        Self {
            profile_id: scheduler.profile_id.clone(),
            store: Arc::clone(&scheduler.store),
            positions: scheduler.positions.clone(),
            sync_interval: scheduler.sync_interval,
            first_tick: Instant::now() + scheduler.sync_interval,
            shutdown_rx,
            events: scheduler.events.clone(),
            counters: Arc::clone(&scheduler.counters),
        }
    }

    /// Spawn the sync task as a background task
    fn spawn(scheduler: &SyncScheduler, shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let task = Self::new(scheduler, shutdown_rx);

        tokio::spawn(async move {
            task.run().await;
        })
    }

    /// Run the sync task loop
    async fn run(mut self) {
        info!(
            profile_id = %self.profile_id,
            interval_secs = self.sync_interval.as_secs(),
            "Location sync task started"
        );

        let mut interval = tokio::time::interval_at(self.first_tick, self.sync_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!(profile_id = %self.profile_id, "Location sync task shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&self) {
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);

        // Copy out; the watch borrow must not be held across the push
        let position = self.positions.borrow().position;
        let Some(position) = position else {
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            debug!(profile_id = %self.profile_id, "No position yet, skipping sync tick");
            return;
        };

        let result = push_location(
            self.store.as_ref(),
            &self.profile_id,
            position,
            SyncTrigger::Periodic,
            &self.events,
        )
        .await;

        let counter = match result {
            Ok(()) => &self.counters.pushed,
            Err(_) => &self.counters.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct ArmedTimer {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl ArmedTimer {
    async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}

/// Owner of the single periodic sync timer of a session
pub struct SyncScheduler {
    profile_id: ProfileId,
    store: Arc<dyn ProfileStore>,
    positions: watch::Receiver<PositionState>,
    sync_interval: Duration,
    events: broadcast::Sender<AttendanceEvent>,
    /// Serialises arm/disarm/close
    active: Mutex<Option<ArmedTimer>>,
    /// Set once under the `active` lock; a closed scheduler never arms again
    closed: AtomicBool,
    counters: Arc<SyncCounters>,
    arm_count: AtomicU64,
}

impl SyncScheduler {
    pub fn new(
        profile_id: ProfileId,
        store: Arc<dyn ProfileStore>,
        positions: watch::Receiver<PositionState>,
        sync_interval: Duration,
        events: broadcast::Sender<AttendanceEvent>,
    ) -> Self {
        Self {
            profile_id,
            store,
            positions,
            sync_interval,
            events,
            active: Mutex::new(None),
            closed: AtomicBool::new(false),
            counters: Arc::new(SyncCounters::default()),
            arm_count: AtomicU64::new(0),
        }
    }

    /// Start the periodic timer, replacing any timer already running
    ///
    /// Returns `false` without starting anything once the scheduler is closed.
    pub async fn arm(&self) -> bool {
        let mut active = self.active.lock().await;
        if self.is_closed() {
            debug!(profile_id = %self.profile_id, "Scheduler closed, not arming");
            return false;
        }
        if let Some(previous) = active.take() {
            previous.stop().await;
        }

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = LocationSyncTask::spawn(self, shutdown_rx);
        *active = Some(ArmedTimer {
            shutdown_tx,
            handle,
        });
        self.arm_count.fetch_add(1, Ordering::SeqCst);
        true
    }

    /// Stop the periodic timer; returns whether one was running
    pub async fn disarm(&self) -> bool {
        let timer = self.active.lock().await.take();
        match timer {
            Some(timer) => {
                timer.stop().await;
                true
            }
            None => false,
        }
    }

    /// Stop the timer for good; later `arm` calls are no-ops
    pub async fn close(&self) {
        let mut active = self.active.lock().await;
        self.closed.store(true, Ordering::SeqCst);
        if let Some(timer) = active.take() {
            timer.stop().await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn is_armed(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// How many times a timer has been started
    pub fn arm_count(&self) -> u64 {
        self.arm_count.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> SyncStats {
        self.counters.snapshot()
    }

    pub fn sync_interval(&self) -> Duration {
        self.sync_interval
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.active.get_mut().take() {
            timer.handle.abort();
        }
    }
}
