//! Online/offline attendance state machine
//!
//! A toggle writes the remote `online_stat` flag first and only flips local
//! state once the write succeeded. Going online triggers one out-of-band
//! location push; the periodic timer is armed and disarmed on state edges
//! only.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fieldsales_core::{AttendanceStatus, GeoPosition, ProfileStore};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{AttendanceError, AttendanceResult};
use crate::event::{AttendanceEvent, SyncTrigger};
use crate::position::PositionState;
use crate::session::SessionContext;
use crate::sync_task::{SyncScheduler, push_location};

/// Result of a manual sync request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncOutcome {
    /// Pushed this position
    Synced(GeoPosition),
    /// No position known yet; nothing was sent
    WaitingForLocation,
}

/// Holds an in-flight flag for as long as it lives
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Attendance state for one signed-in agent
pub struct AttendanceMachine {
    session: Arc<SessionContext>,
    store: Arc<dyn ProfileStore>,
    positions: watch::Receiver<PositionState>,
    scheduler: Arc<SyncScheduler>,
    status_tx: watch::Sender<AttendanceStatus>,
    toggle_in_flight: AtomicBool,
    sync_in_flight: AtomicBool,
    events: broadcast::Sender<AttendanceEvent>,
}

impl AttendanceMachine {
    pub fn new(
        session: Arc<SessionContext>,
        store: Arc<dyn ProfileStore>,
        positions: watch::Receiver<PositionState>,
        scheduler: Arc<SyncScheduler>,
        initial: AttendanceStatus,
        events: broadcast::Sender<AttendanceEvent>,
    ) -> Self {
        let (status_tx, _) = watch::channel(initial);
        Self {
            session,
            store,
            positions,
            scheduler,
            status_tx,
            toggle_in_flight: AtomicBool::new(false),
            sync_in_flight: AtomicBool::new(false),
            events,
        }
    }

    /// Arm the periodic timer if the initial state is online
    pub async fn resume(&self) {
        if self.status().is_online() {
            info!(profile_id = %self.session.profile_id(), "Resuming online session");
            self.scheduler.arm().await;
        }
    }

    pub fn status(&self) -> AttendanceStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<AttendanceStatus> {
        self.status_tx.subscribe()
    }

    pub fn is_toggle_in_flight(&self) -> bool {
        self.toggle_in_flight.load(Ordering::SeqCst)
    }

    pub fn is_sync_in_flight(&self) -> bool {
        self.sync_in_flight.load(Ordering::SeqCst)
    }

    /// Whether the attendance switch accepts input right now
    pub fn can_toggle(&self) -> bool {
        !self.session.is_blocked() && !self.is_toggle_in_flight()
    }

    fn latest_position(&self) -> Option<GeoPosition> {
        self.positions.borrow().position
    }

    /// Request a state change
    ///
    /// The remote write is awaited before local state changes. Returns the
    /// new status.
    #[instrument(skip(self), fields(profile_id = %self.session.profile_id()))]
    pub async fn toggle(&self, requested: AttendanceStatus) -> AttendanceResult<AttendanceStatus> {
        if self.session.is_blocked() {
            warn!("Toggle rejected: profile is blocked");
            return Err(AttendanceError::Blocked);
        }
        let _guard =
            InFlightGuard::acquire(&self.toggle_in_flight).ok_or(AttendanceError::ToggleInFlight)?;

        let previous = self.status();
        if let Err(e) = self
            .store
            .set_online(self.session.profile_id(), requested.as_flag())
            .await
        {
            error!(error = %e, %requested, "Status update failed");
            let _ = self.events.send(AttendanceEvent::StatusUpdateFailed {
                requested,
                error: e.clone(),
            });
            return Err(AttendanceError::StatusUpdate(e));
        }

        self.status_tx.send_replace(requested);
        info!(from = %previous, to = %requested, "Attendance status changed");
        let _ = self.events.send(AttendanceEvent::StatusChanged {
            from: previous,
            to: requested,
        });

        match (previous, requested) {
            (AttendanceStatus::Offline, AttendanceStatus::Online) => {
                self.scheduler.arm().await;
            }
            (AttendanceStatus::Online, AttendanceStatus::Offline) => {
                self.scheduler.disarm().await;
            }
            _ => {}
        }

        // the session may have been torn down while the status write was pending
        if self.scheduler.is_closed() {
            info!("Session closed during toggle, immediate location sync skipped");
        } else if requested.is_online() {
            match self.latest_position() {
                Some(position) => self.spawn_immediate_push(position),
                None => debug!("No position yet, immediate location sync skipped"),
            }
        }

        Ok(requested)
    }

    /// Fire-and-forget push after going online; never rolls back the toggle
    fn spawn_immediate_push(&self, position: GeoPosition) {
        let store = Arc::clone(&self.store);
        let profile_id = self.session.profile_id().clone();
        let events = self.events.clone();
        let scheduler = Arc::clone(&self.scheduler);
        tokio::spawn(async move {
            if scheduler.is_closed() {
                return;
            }
            let _ = push_location(
                store.as_ref(),
                &profile_id,
                position,
                SyncTrigger::Immediate,
                &events,
            )
            .await;
        });
    }

    /// Push the latest position right now
    #[instrument(skip(self), fields(profile_id = %self.session.profile_id()))]
    pub async fn sync_now(&self) -> AttendanceResult<SyncOutcome> {
        if !self.status().is_online() {
            return Err(AttendanceError::NotOnline);
        }
        let Some(position) = self.latest_position() else {
            info!("Waiting for GPS location");
            return Ok(SyncOutcome::WaitingForLocation);
        };
        let _guard =
            InFlightGuard::acquire(&self.sync_in_flight).ok_or(AttendanceError::SyncInFlight)?;

        push_location(
            self.store.as_ref(),
            self.session.profile_id(),
            position,
            SyncTrigger::Manual,
            &self.events,
        )
        .await
        .map_err(AttendanceError::LocationPush)?;

        Ok(SyncOutcome::Synced(position))
    }
}
