//! # Fieldsales Attendance
//!
//! Geofenced attendance tracking for a signed-in sales agent.
//!
//! This crate provides [`AttendanceSession`], which ties together:
//! - [`PositionSource`]: continuous device location observation
//! - [`GeofenceMonitor`]: distance to the branch for every new position
//! - [`AttendanceMachine`]: the online/offline toggle
//! - [`SyncScheduler`]: the 30 minute background location push
//!
//! ## Example
//!
//! ```rust,ignore
//! use fieldsales_attendance::{AttendanceConfig, AttendanceSession, SessionContext};
//! use fieldsales_core::AttendanceStatus;
//!
//! let session = AttendanceSession::mount(
//!     AttendanceConfig::default(),
//!     SessionContext::from_profile(&profile),
//!     &profile.online_stat,
//!     store,
//!     location_provider,
//! )
//! .await;
//!
//! session.toggle(AttendanceStatus::Online).await?;
//!
//! let mut events = session.subscribe();
//! while let Ok(event) = events.recv().await {
//!     println!("{}", event.message());
//! }
//! ```

mod config;
mod error;
pub mod event;
pub mod geofence;
pub mod machine;
pub mod position;
pub mod profile_sync;
pub mod session;
pub mod snapshot;
pub mod sync_task;

pub use config::{AttendanceConfig, DEFAULT_SYNC_INTERVAL};
pub use error::{AttendanceError, AttendanceResult};
pub use event::{AttendanceEvent, SyncTrigger};
pub use geofence::GeofenceMonitor;
pub use machine::{AttendanceMachine, SyncOutcome};
pub use position::{PositionSource, PositionState};
pub use profile_sync::{ProfileSync, ProfileSyncOutcome};
pub use session::SessionContext;
pub use snapshot::AttendanceSnapshot;
pub use sync_task::{SyncScheduler, SyncStats};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fieldsales_core::{
    AttendanceStatus, GeofenceResult, LocationProvider, ProfileStore, geo,
};
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{info, instrument};

/// A mounted attendance view for one signed-in agent
///
/// Owns every background task of the session. [`AttendanceSession::teardown`]
/// (or dropping the session) cancels location observation, the geofence
/// monitor and the sync timer.
pub struct AttendanceSession {
    config: AttendanceConfig,
    session: Arc<SessionContext>,
    position: PositionSource,
    geofence: GeofenceMonitor,
    scheduler: Arc<SyncScheduler>,
    machine: AttendanceMachine,
    profile_sync: ProfileSync,
    event_tx: broadcast::Sender<AttendanceEvent>,
    mounted: AtomicBool,
}

impl AttendanceSession {
    /// Mount a session
    ///
    /// `initial_status` is the profile's raw `online_stat`; `"ONLINE"`,
    /// `true` and `"true"` mount the session online and arm the sync timer.
    #[instrument(skip_all, fields(profile_id = %session.profile_id()))]
    pub async fn mount(
        config: AttendanceConfig,
        session: SessionContext,
        initial_status: &Value,
        store: Arc<dyn ProfileStore>,
        provider: Arc<dyn LocationProvider>,
    ) -> Self {
        let session = Arc::new(session);
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);

        let position = PositionSource::new(provider, config.location);
        position.start();

        let geofence = GeofenceMonitor::spawn(config.anchor, position.subscribe());

        let scheduler = Arc::new(SyncScheduler::new(
            session.profile_id().clone(),
            Arc::clone(&store),
            position.subscribe(),
            config.sync_interval,
            event_tx.clone(),
        ));

        let initial = AttendanceStatus::normalize(initial_status);
        let machine = AttendanceMachine::new(
            Arc::clone(&session),
            Arc::clone(&store),
            position.subscribe(),
            Arc::clone(&scheduler),
            initial,
            event_tx.clone(),
        );
        machine.resume().await;

        let profile_sync = ProfileSync::new(store, Arc::clone(&session));

        info!(
            status = %initial,
            blocked = session.is_blocked(),
            radius_meters = config.anchor.radius_meters,
            "Attendance session mounted"
        );

        Self {
            config,
            session,
            position,
            geofence,
            scheduler,
            machine,
            profile_sync,
            event_tx,
            mounted: AtomicBool::new(true),
        }
    }

    /// Cancel every background task of the session
    ///
    /// Safe to call more than once.
    #[instrument(skip(self), fields(profile_id = %self.session.profile_id()))]
    pub async fn teardown(&self) {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return;
        }

        self.scheduler.close().await;
        self.geofence.stop();
        self.position.stop();

        info!("Attendance session torn down");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    fn ensure_mounted(&self) -> AttendanceResult<()> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(AttendanceError::SessionClosed)
        }
    }

    /// Request an online/offline change
    pub async fn toggle(&self, requested: AttendanceStatus) -> AttendanceResult<AttendanceStatus> {
        self.ensure_mounted()?;
        self.machine.toggle(requested).await
    }

    /// Push the latest position immediately
    pub async fn sync_now(&self) -> AttendanceResult<SyncOutcome> {
        self.ensure_mounted()?;
        self.machine.sync_now().await
    }

    /// Refresh block/approval state from the backend
    pub async fn refresh_profile(&self) -> AttendanceResult<ProfileSyncOutcome> {
        self.ensure_mounted()?;
        self.profile_sync.sync().await
    }

    /// Change the accuracy mode of location observation
    pub fn set_high_accuracy(&self, high_accuracy: bool) {
        self.position.set_high_accuracy(high_accuracy);
    }

    pub fn status(&self) -> AttendanceStatus {
        self.machine.status()
    }

    /// Current status summary
    ///
    /// The geofence is evaluated against the latest position directly, so
    /// the snapshot never lags behind the monitor.
    pub fn snapshot(&self) -> AttendanceSnapshot {
        let state = self.position.state();
        let geofence: Option<GeofenceResult> = state
            .position
            .map(|position| geo::evaluate(&position, &self.config.anchor));
        let status = self.machine.status();

        AttendanceSnapshot {
            status,
            location_label: snapshot::location_label(&state, geofence),
            position: state.position,
            geofence,
            in_range: geofence.is_some_and(|g| g.is_within),
            can_toggle: self.is_mounted() && self.machine.can_toggle(),
            can_sync: self.is_mounted()
                && status.is_online()
                && state.position.is_some()
                && !self.machine.is_sync_in_flight(),
        }
    }

    /// Subscribe to transition and push notifications
    pub fn subscribe(&self) -> broadcast::Receiver<AttendanceEvent> {
        self.event_tx.subscribe()
    }

    pub fn positions(&self) -> watch::Receiver<PositionState> {
        self.position.subscribe()
    }

    pub fn geofence(&self) -> watch::Receiver<Option<GeofenceResult>> {
        self.geofence.subscribe()
    }

    pub fn status_updates(&self) -> watch::Receiver<AttendanceStatus> {
        self.machine.subscribe_status()
    }

    pub fn context(&self) -> &SessionContext {
        &self.session
    }

    pub fn config(&self) -> &AttendanceConfig {
        &self.config
    }

    pub async fn is_sync_armed(&self) -> bool {
        self.scheduler.is_armed().await
    }

    pub fn sync_stats(&self) -> SyncStats {
        self.scheduler.stats()
    }
}
