//! # Fieldsales Core
//!
//! Core types, geofence math, traits and errors for the Fieldsales
//! attendance stack.
//!
//! This crate holds everything that does not depend on a runtime session:
//! the pure geofence evaluator, status normalisation, and the two seams the
//! attendance core talks through.
//!
//! ## Key Traits
//!
//! - [`ProfileStore`]: remote sales-profile store (HTTP in production)
//! - [`LocationProvider`]: platform geolocation service
//!
//! ## Key Types
//!
//! - [`GeoPosition`], [`GeofenceAnchor`], [`GeofenceResult`]
//! - [`AttendanceStatus`]: online/offline work-session state
//! - [`Profile`], [`ProfileId`], [`ProfileUpdate`]

pub mod error;
pub mod geo;
pub mod location;
pub mod mock_location;
pub mod mock_store;
pub mod profile;
pub mod status;
pub mod store;

// Re-export main types
pub use error::*;
pub use geo::*;
pub use location::*;
pub use mock_location::*;
pub use mock_store::*;
pub use profile::*;
pub use status::*;
pub use store::*;
