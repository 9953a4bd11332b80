//! Platform geolocation contract
//!
//! [`LocationProvider`] models what the attendance core needs from the
//! device: a one-shot fix, a continuous watch, and a way to cancel that
//! watch so the sensor is released.

use std::time::Duration;

use async_trait::async_trait;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::LocationError;
use crate::geo::GeoPosition;

/// Default acquisition timeout for a single observation
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_millis(5000);

/// Options applied to every observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationOptions {
    /// Trade battery for precision
    pub high_accuracy: bool,
    /// Give up on a single observation after this long
    #[serde(with = "millis")]
    pub timeout: Duration,
    /// Oldest cached OS fix that may be reused; zero means never reuse
    #[serde(with = "millis")]
    pub maximum_age: Duration,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: DEFAULT_LOCATION_TIMEOUT,
            maximum_age: Duration::ZERO,
        }
    }
}

impl LocationOptions {
    pub fn with_high_accuracy(mut self, high_accuracy: bool) -> Self {
        self.high_accuracy = high_accuracy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Handle identifying an active watch subscription
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("watch#{_0}")]
pub struct WatchId(pub u64);

/// A live watch: its id plus the stream of readings and errors
#[derive(Debug)]
pub struct LocationWatch {
    pub id: WatchId,
    pub updates: mpsc::Receiver<Result<GeoPosition, LocationError>>,
}

/// Device geolocation service
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Acquire one fix, honouring the options' timeout
    async fn current_position(
        &self,
        options: &LocationOptions,
    ) -> Result<GeoPosition, LocationError>;

    /// Start a continuous watch
    ///
    /// Returns [`LocationError::Unsupported`] if the device has no
    /// location capability at all.
    fn watch(&self, options: &LocationOptions) -> Result<LocationWatch, LocationError>;

    /// Stop a watch and release the sensor. Unknown ids are ignored.
    fn clear_watch(&self, id: WatchId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = LocationOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.timeout, Duration::from_millis(5000));
        assert_eq!(options.maximum_age, Duration::ZERO);
    }

    #[test]
    fn test_options_serde_in_millis() {
        let options = LocationOptions::default().with_high_accuracy(false);
        let value = serde_json::to_value(options).unwrap();
        assert_eq!(value["timeout"], 5000);
        assert_eq!(value["maximum_age"], 0);
        let back: LocationOptions = serde_json::from_value(value).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn test_watch_id_display() {
        assert_eq!(WatchId(3).to_string(), "watch#3");
    }
}
