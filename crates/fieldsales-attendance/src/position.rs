//! Continuous device-location observation
//!
//! [`PositionSource`] asks the provider for one fix and opens a watch at
//! the same time, folding every reading into a [`PositionState`] held in a
//! `watch` channel. The channel is the single "latest position" slot the
//! rest of the session reads from.

use std::sync::Arc;

use fieldsales_core::{GeoPosition, LocationError, LocationOptions, LocationProvider, WatchId};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Observable output of a [`PositionSource`]
#[derive(Debug, Clone, PartialEq)]
pub struct PositionState {
    /// Last successful reading
    pub position: Option<GeoPosition>,
    /// Last acquisition failure, cleared by the next successful reading
    pub error: Option<LocationError>,
    /// True until the first reading or failure arrives
    pub loading: bool,
}

impl Default for PositionState {
    fn default() -> Self {
        Self {
            position: None,
            error: None,
            loading: true,
        }
    }
}

impl PositionState {
    /// State after a successful reading
    pub fn located(position: GeoPosition) -> Self {
        Self {
            position: Some(position),
            error: None,
            loading: false,
        }
    }

    fn apply(&mut self, reading: Result<GeoPosition, LocationError>) {
        match reading {
            Ok(position) => *self = Self::located(position),
            Err(error) => {
                self.error = Some(error);
                self.loading = false;
            }
        }
    }
}

struct ActiveWatch {
    id: WatchId,
    task: JoinHandle<()>,
}

/// Device location observer
pub struct PositionSource {
    provider: Arc<dyn LocationProvider>,
    options: Mutex<LocationOptions>,
    state_tx: watch::Sender<PositionState>,
    active: Mutex<Option<ActiveWatch>>,
}

impl PositionSource {
    pub fn new(provider: Arc<dyn LocationProvider>, options: LocationOptions) -> Self {
        let (state_tx, _) = watch::channel(PositionState::default());
        Self {
            provider,
            options: Mutex::new(options),
            state_tx,
            active: Mutex::new(None),
        }
    }

    /// Begin one-shot acquisition and continuous observation
    ///
    /// Restarts observation if it is already running. Failures are folded
    /// into the state, never returned.
    pub fn start(&self) {
        self.stop();

        let options = *self.options.lock();
        let mut watch = match self.provider.watch(&options) {
            Ok(watch) => watch,
            Err(error) => {
                warn!(%error, "Unable to observe location");
                self.state_tx.send_modify(|state| state.apply(Err(error)));
                return;
            }
        };

        let id = watch.id;
        let provider = Arc::clone(&self.provider);
        let state_tx = self.state_tx.clone();

        let task = tokio::spawn(async move {
            let mut first_fix = provider.current_position(&options);
            let mut first_fix_pending = true;

            loop {
                tokio::select! {
                    reading = &mut first_fix, if first_fix_pending => {
                        first_fix_pending = false;
                        record(&state_tx, reading);
                    }
                    reading = watch.updates.recv() => {
                        let Some(reading) = reading else {
                            debug!(watch = %id, "Location watch closed");
                            break;
                        };
                        // a watch reading supersedes a one-shot still in flight
                        first_fix_pending = false;
                        record(&state_tx, reading);
                    }
                }
            }
        });

        info!(watch = %id, high_accuracy = options.high_accuracy, "Location observation started");
        *self.active.lock() = Some(ActiveWatch { id, task });
    }

    /// Stop observing; returns whether observation was running
    pub fn stop(&self) -> bool {
        let Some(active) = self.active.lock().take() else {
            return false;
        };
        self.provider.clear_watch(active.id);
        active.task.abort();
        info!(watch = %active.id, "Location observation stopped");
        true
    }

    /// Change the accuracy mode, restarting observation if it is running
    pub fn set_high_accuracy(&self, high_accuracy: bool) {
        {
            let mut options = self.options.lock();
            if options.high_accuracy == high_accuracy {
                return;
            }
            options.high_accuracy = high_accuracy;
        }
        if self.is_running() {
            self.start();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn options(&self) -> LocationOptions {
        *self.options.lock()
    }

    /// Receiver over the state; always holds the latest value
    pub fn subscribe(&self) -> watch::Receiver<PositionState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> PositionState {
        self.state_tx.borrow().clone()
    }

    pub fn latest(&self) -> Option<GeoPosition> {
        self.state_tx.borrow().position
    }
}

impl Drop for PositionSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn record(state_tx: &watch::Sender<PositionState>, reading: Result<GeoPosition, LocationError>) {
    match &reading {
        Ok(position) => debug!(%position, "Position updated"),
        Err(error) => warn!(%error, "Location acquisition failed"),
    }
    state_tx.send_modify(|state| state.apply(reading));
}
