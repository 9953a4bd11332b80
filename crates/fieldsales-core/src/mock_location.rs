//! Scriptable geolocation service for testing
//!
//! Tests drive the device by calling [`MockLocationProvider::emit`] and
//! [`MockLocationProvider::emit_error`]; every active watch receives the
//! reading. Cleared watches stop receiving and are no longer counted, so
//! tests can assert that teardown released the sensor.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::LocationError;
use crate::geo::GeoPosition;
use crate::location::{LocationOptions, LocationProvider, LocationWatch, WatchId};

type Reading = Result<GeoPosition, LocationError>;

/// An in-memory [`LocationProvider`]
pub struct MockLocationProvider {
    /// Answer for one-shot requests; `None` waits out the timeout
    current: Mutex<Option<Reading>>,
    watches: DashMap<WatchId, mpsc::Sender<Reading>>,
    next_watch: AtomicU64,
    supported: AtomicBool,
    /// Options passed to the most recent `watch` call
    last_options: Mutex<Option<LocationOptions>>,
    buffer_size: usize,
}

impl Default for MockLocationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLocationProvider {
    /// A provider with no fix yet
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            watches: DashMap::new(),
            next_watch: AtomicU64::new(1),
            supported: AtomicBool::new(true),
            last_options: Mutex::new(None),
            buffer_size: 64,
        }
    }

    /// A provider whose one-shot request returns `position`
    pub fn with_fix(position: GeoPosition) -> Self {
        let provider = Self::new();
        provider.set_current(Ok(position));
        provider
    }

    /// A device without any geolocation support
    pub fn unsupported() -> Self {
        let provider = Self::new();
        provider.supported.store(false, Ordering::SeqCst);
        provider
    }

    /// Set what one-shot requests return
    pub fn set_current(&self, reading: Reading) {
        *self.current.lock() = Some(reading);
    }

    /// Deliver a reading to every active watch
    pub fn emit(&self, position: GeoPosition) {
        self.set_current(Ok(position));
        self.broadcast(Ok(position));
    }

    /// Deliver an error to every active watch
    pub fn emit_error(&self, error: LocationError) {
        self.broadcast(Err(error));
    }

    /// Number of watches that have not been cleared
    pub fn active_watches(&self) -> usize {
        self.watches.len()
    }

    pub fn last_options(&self) -> Option<LocationOptions> {
        *self.last_options.lock()
    }

    fn broadcast(&self, reading: Reading) {
        for entry in self.watches.iter() {
            if entry.value().try_send(reading.clone()).is_err() {
                tracing::warn!(watch = %entry.key(), "Mock watch buffer full or closed");
            }
        }
    }
}

#[async_trait]
impl LocationProvider for MockLocationProvider {
    async fn current_position(&self, options: &LocationOptions) -> Result<GeoPosition, LocationError> {
        if !self.supported.load(Ordering::SeqCst) {
            return Err(LocationError::Unsupported);
        }
        let reading = self.current.lock().clone();
        match reading {
            Some(reading) => reading,
            None => {
                tokio::time::sleep(options.timeout).await;
                Err(LocationError::Timeout(options.timeout.as_millis() as u64))
            }
        }
    }

    fn watch(&self, options: &LocationOptions) -> Result<LocationWatch, LocationError> {
        if !self.supported.load(Ordering::SeqCst) {
            return Err(LocationError::Unsupported);
        }
        let id = WatchId(self.next_watch.fetch_add(1, Ordering::SeqCst));
        let (tx, rx) = mpsc::channel(self.buffer_size);
        self.watches.insert(id, tx);
        *self.last_options.lock() = Some(*options);
        Ok(LocationWatch { id, updates: rx })
    }

    fn clear_watch(&self, id: WatchId) {
        self.watches.remove(&id);
    }
}
