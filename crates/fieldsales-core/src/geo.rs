//! Geofence evaluation
//!
//! Great-circle distance between two coordinates on a spherical earth and
//! a circular geofence check against a branch anchor. Everything in this
//! module is pure and cheap enough to run on every position update.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FieldError;

/// Earth radius in meters used for all distance math.
///
/// Equatorial WGS-84 radius, matching what common geodesic libraries use
/// for their spherical approximation.
pub const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Radius used when a geofence is configured without one.
pub const DEFAULT_RADIUS_METERS: u64 = 500;

/// A single reading from the position source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a position, rejecting out-of-range or non-finite coordinates
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, FieldError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(FieldError::InvalidCoordinate(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(FieldError::InvalidCoordinate(format!(
                "longitude {longitude} outside [-180, 180]"
            )));
        }
        Ok(Self::new(latitude, longitude))
    }

    /// Great-circle distance to another position, in meters (unrounded)
    pub fn distance_to(&self, other: &GeoPosition) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        // Clamp guards against a > 1.0 from floating point noise near antipodes.
        let c = 2.0 * a.sqrt().min(1.0).asin();
        EARTH_RADIUS_METERS * c
    }

    /// The position reached by travelling `distance_m` meters along `bearing_deg`
    pub fn destination(&self, bearing_deg: f64, distance_m: f64) -> GeoPosition {
        let delta = distance_m / EARTH_RADIUS_METERS;
        let theta = bearing_deg.to_radians();
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lon2 = lon1
            + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

        // Normalise longitude back into [-180, 180)
        let lon2 = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;
        GeoPosition::new(lat2.to_degrees(), lon2)
    }
}

impl fmt::Display for GeoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Static reference point (a branch location) with an inclusive radius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeofenceAnchor {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius")]
    pub radius_meters: u64,
}

fn default_radius() -> u64 {
    DEFAULT_RADIUS_METERS
}

impl GeofenceAnchor {
    /// Create an anchor with the default 500 m radius
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_meters: DEFAULT_RADIUS_METERS,
        }
    }

    /// Set the radius in meters
    pub fn with_radius(mut self, radius_meters: u64) -> Self {
        self.radius_meters = radius_meters;
        self
    }

    pub fn position(&self) -> GeoPosition {
        GeoPosition::new(self.latitude, self.longitude)
    }
}

impl Default for GeofenceAnchor {
    /// The Jakarta branch office
    fn default() -> Self {
        Self::new(-6.175392, 106.827153)
    }
}

/// Outcome of one geofence check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeofenceResult {
    pub distance_meters: u64,
    pub is_within: bool,
}

/// Distance between two positions, rounded to the nearest meter
pub fn distance(a: &GeoPosition, b: &GeoPosition) -> u64 {
    a.distance_to(b).round() as u64
}

/// Evaluate a position against an anchor.
///
/// The boundary is inclusive: a position exactly `radius_meters` away is
/// within the fence.
pub fn evaluate(current: &GeoPosition, anchor: &GeofenceAnchor) -> GeofenceResult {
    let distance_meters = distance(current, &anchor.position());
    GeofenceResult {
        distance_meters,
        is_within: distance_meters <= anchor.radius_meters,
    }
}
