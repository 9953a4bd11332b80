//! Remote profile store abstraction
//!
//! The [`ProfileStore`] trait is the only way the attendance core talks to
//! the backend. This lets the state machine and sync loop run against the
//! real HTTP client or an in-memory mock.
//!
//! ## Implementations
//!
//! - [`MockProfileStore`](crate::MockProfileStore): in-memory store for testing
//! - `HttpProfileStore`: REST client (in the fieldsales-client crate)

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::geo::GeoPosition;
use crate::profile::{Profile, ProfileId, ProfileUpdate};

/// Remote store holding sales profiles
///
/// Any non-2xx response surfaces as a [`StoreError`](crate::StoreError).
/// Implementations never retry; the caller decides.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up the profile registered for an email address
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Profile>>;

    /// Apply a partial update to a profile
    async fn update(&self, id: &ProfileId, update: ProfileUpdate) -> StoreResult<()>;

    /// Write the attendance flag
    async fn set_online(&self, id: &ProfileId, online: bool) -> StoreResult<()> {
        self.update(id, ProfileUpdate::OnlineStat(online)).await
    }

    /// Write the last known location
    async fn set_location(&self, id: &ProfileId, position: GeoPosition) -> StoreResult<()> {
        self.update(id, ProfileUpdate::Location(position)).await
    }
}
