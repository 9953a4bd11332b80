//! Location provider replaying a recorded track
//!
//! Stands in for the device's geolocation service when the agent runs
//! headless. Every watch walks the track from the current reading, one
//! reading per step, and then holds the last one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use fieldsales_core::{
    GeoPosition, LocationError, LocationOptions, LocationProvider, LocationWatch, WatchId,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// A [`LocationProvider`] fed from a fixed list of readings
pub struct ReplayLocationProvider {
    track: Arc<Vec<GeoPosition>>,
    step: Duration,
    /// Index of the reading considered current
    cursor: Arc<AtomicUsize>,
    watches: DashMap<WatchId, JoinHandle<()>>,
    next_watch: AtomicU64,
}

impl ReplayLocationProvider {
    pub fn new(track: Vec<GeoPosition>, step: Duration) -> Self {
        Self {
            track: Arc::new(track),
            step,
            cursor: Arc::new(AtomicUsize::new(0)),
            watches: DashMap::new(),
            next_watch: AtomicU64::new(1),
        }
    }

    /// A device that never moves
    pub fn fixed(position: GeoPosition) -> Self {
        Self::new(vec![position], Duration::from_secs(60))
    }

    pub fn current(&self) -> Option<GeoPosition> {
        self.track
            .get(self.cursor.load(Ordering::SeqCst))
            .copied()
    }

    pub fn active_watches(&self) -> usize {
        self.watches.len()
    }
}

#[async_trait]
impl LocationProvider for ReplayLocationProvider {
    async fn current_position(
        &self,
        _options: &LocationOptions,
    ) -> Result<GeoPosition, LocationError> {
        self.current().ok_or_else(|| {
            LocationError::PositionUnavailable("no recorded positions to replay".into())
        })
    }

    fn watch(&self, _options: &LocationOptions) -> Result<LocationWatch, LocationError> {
        if self.track.is_empty() {
            return Err(LocationError::PositionUnavailable(
                "no recorded positions to replay".into(),
            ));
        }

        let id = WatchId(self.next_watch.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::channel(16);
        let track = Arc::clone(&self.track);
        let cursor = Arc::clone(&self.cursor);
        let step = self.step;

        let handle = tokio::spawn(async move {
            let start = cursor.load(Ordering::SeqCst);
            for (index, position) in track.iter().enumerate().skip(start) {
                cursor.store(index, Ordering::SeqCst);
                if tx.send(Ok(*position)).await.is_err() {
                    return;
                }
                if index + 1 < track.len() {
                    tokio::time::sleep(step).await;
                }
            }
            debug!(watch = %id, "Replay track finished, holding last position");
            // Keep the stream open so the observer keeps its position
            tx.closed().await;
        });

        self.watches.insert(id, handle);
        Ok(LocationWatch { id, updates: rx })
    }

    fn clear_watch(&self, id: WatchId) {
        if let Some((_, handle)) = self.watches.remove(&id) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Vec<GeoPosition> {
        vec![
            GeoPosition::new(-6.1, 106.8),
            GeoPosition::new(-6.2, 106.8),
            GeoPosition::new(-6.3, 106.8),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_replays_track_in_steps() {
        let provider = ReplayLocationProvider::new(track(), Duration::from_secs(10));
        let mut watch = provider.watch(&LocationOptions::default()).unwrap();

        let start = tokio::time::Instant::now();
        for expected in track() {
            assert_eq!(watch.updates.recv().await, Some(Ok(expected)));
        }
        assert_eq!(start.elapsed(), Duration::from_secs(20));
        assert_eq!(provider.current(), Some(GeoPosition::new(-6.3, 106.8)));
    }

    #[tokio::test]
    async fn test_one_shot_and_empty_track() {
        let provider = ReplayLocationProvider::fixed(GeoPosition::new(1.0, 2.0));
        let options = LocationOptions::default();
        assert_eq!(
            provider.current_position(&options).await,
            Ok(GeoPosition::new(1.0, 2.0))
        );

        let empty = ReplayLocationProvider::new(Vec::new(), Duration::from_secs(1));
        assert!(matches!(
            empty.current_position(&options).await,
            Err(LocationError::PositionUnavailable(_))
        ));
        assert!(empty.watch(&options).is_err());
    }

    #[tokio::test]
    async fn test_clear_watch_stops_replay() {
        let provider = ReplayLocationProvider::new(track(), Duration::from_secs(3600));
        let mut watch = provider.watch(&LocationOptions::default()).unwrap();
        assert_eq!(provider.active_watches(), 1);

        provider.clear_watch(watch.id);
        assert_eq!(provider.active_watches(), 0);
        // at most the first reading got through before the abort
        while let Some(reading) = watch.updates.recv().await {
            assert_eq!(reading, Ok(GeoPosition::new(-6.1, 106.8)));
        }
    }
}
