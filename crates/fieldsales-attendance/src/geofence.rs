//! Live geofence evaluation over the position stream
//!
//! Runs independently of the sync side effects: it only reads positions
//! and republishes a [`GeofenceResult`] for each one.

use fieldsales_core::{GeofenceAnchor, GeofenceResult, geo};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::position::PositionState;

/// Background task keeping the geofence result current
pub struct GeofenceMonitor {
    anchor: GeofenceAnchor,
    result_rx: watch::Receiver<Option<GeofenceResult>>,
    task: JoinHandle<()>,
}

impl GeofenceMonitor {
    /// Spawn the monitor over a position receiver
    pub fn spawn(anchor: GeofenceAnchor, mut positions: watch::Receiver<PositionState>) -> Self {
        let (result_tx, result_rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            loop {
                let position = positions.borrow_and_update().position;
                if let Some(position) = position {
                    let result = geo::evaluate(&position, &anchor);
                    debug!(
                        distance_meters = result.distance_meters,
                        is_within = result.is_within,
                        "Geofence evaluated"
                    );
                    result_tx.send_replace(Some(result));
                }
                if positions.changed().await.is_err() {
                    break;
                }
            }
        });

        Self {
            anchor,
            result_rx,
            task,
        }
    }

    pub fn anchor(&self) -> &GeofenceAnchor {
        &self.anchor
    }

    /// Result for the latest position; `None` before the first fix
    pub fn result(&self) -> Option<GeofenceResult> {
        *self.result_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<GeofenceResult>> {
        self.result_rx.clone()
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for GeofenceMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsales_core::GeoPosition;

    #[tokio::test]
    async fn test_no_result_before_first_fix() {
        let (_tx, rx) = watch::channel(PositionState::default());
        let monitor = GeofenceMonitor::spawn(GeofenceAnchor::default(), rx);
        tokio::task::yield_now().await;
        assert!(monitor.result().is_none());
    }

    #[tokio::test]
    async fn test_result_follows_latest_position() {
        let anchor = GeofenceAnchor::default();
        let (tx, rx) = watch::channel(PositionState::default());
        let monitor = GeofenceMonitor::spawn(anchor, rx);
        let mut results = monitor.subscribe();

        tx.send_replace(PositionState::located(anchor.position()));
        results.changed().await.unwrap();
        assert_eq!(
            *results.borrow_and_update(),
            Some(GeofenceResult {
                distance_meters: 0,
                is_within: true
            })
        );

        let far = anchor.position().destination(0.0, 5000.0);
        tx.send_replace(PositionState::located(far));
        results.changed().await.unwrap();
        let result = results.borrow().unwrap();
        assert!(!result.is_within);
        assert!((4995..=5005).contains(&result.distance_meters));
    }

    #[tokio::test]
    async fn test_stop_ends_task() {
        let (_tx, rx) = watch::channel(PositionState::default());
        let monitor = GeofenceMonitor::spawn(GeofenceAnchor::default(), rx);
        monitor.stop();
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(monitor.is_finished());
    }
}
