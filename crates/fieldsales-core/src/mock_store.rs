//! In-memory profile store for testing
//!
//! Records every write so tests can assert exactly which network calls the
//! attendance core made, and lets tests inject failures and latency.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fieldsales_core::{MockProfileStore, Profile, ProfileId, ProfileStore};
//!
//! let store = MockProfileStore::new();
//! store.insert(Profile::new(7u64).with_email("agent@example.com"));
//!
//! store.set_online(&ProfileId::from(7u64), true).await.unwrap();
//! assert_eq!(store.online_writes(), vec![true]);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::geo::GeoPosition;
use crate::profile::{Profile, ProfileId, ProfileUpdate};
use crate::store::ProfileStore;

/// A write the mock has accepted or rejected
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub id: ProfileId,
    pub update: ProfileUpdate,
    pub accepted: bool,
}

/// An in-memory [`ProfileStore`]
#[derive(Default)]
pub struct MockProfileStore {
    /// Profiles keyed by email
    profiles: DashMap<String, Profile>,
    /// Every write attempt, in arrival order
    writes: Mutex<Vec<RecordedWrite>>,
    fail_status_writes: AtomicBool,
    fail_location_writes: AtomicBool,
    forbidden: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile (keyed by its email)
    pub fn insert(&self, profile: Profile) {
        let key = profile.email.clone().unwrap_or_default();
        self.profiles.insert(key, profile);
    }

    /// Make every `online_stat` write fail with a 500
    pub fn fail_status_writes(&self, fail: bool) {
        self.fail_status_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every `location` write fail with a 500
    pub fn fail_location_writes(&self, fail: bool) {
        self.fail_location_writes.store(fail, Ordering::SeqCst);
    }

    /// Answer every request with 403
    pub fn set_forbidden(&self, forbidden: bool) {
        self.forbidden.store(forbidden, Ordering::SeqCst);
    }

    /// Delay every request by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// All write attempts so far
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().clone()
    }

    /// Number of write attempts (accepted or not)
    pub fn write_count(&self) -> usize {
        self.writes.lock().len()
    }

    /// Attendance flags that were attempted, in order
    pub fn online_writes(&self) -> Vec<bool> {
        self.writes
            .lock()
            .iter()
            .filter_map(|w| match w.update {
                ProfileUpdate::OnlineStat(online) => Some(online),
                ProfileUpdate::Location(_) => None,
            })
            .collect()
    }

    /// Locations that were attempted, in order
    pub fn location_writes(&self) -> Vec<GeoPosition> {
        self.writes
            .lock()
            .iter()
            .filter_map(|w| match w.update {
                ProfileUpdate::Location(pos) => Some(pos),
                ProfileUpdate::OnlineStat(_) => None,
            })
            .collect()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().clear();
    }

    /// Current stored profile for an email
    pub fn profile(&self, email: &str) -> Option<Profile> {
        self.profiles.get(email).map(|p| p.value().clone())
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn apply(&self, id: &ProfileId, update: ProfileUpdate) {
        for mut entry in self.profiles.iter_mut() {
            let profile = entry.value_mut();
            if &profile.id != id && profile.document_id.as_deref() != Some(id.as_str()) {
                continue;
            }
            match update {
                ProfileUpdate::OnlineStat(online) => {
                    profile.online_stat = serde_json::Value::Bool(online)
                }
                ProfileUpdate::Location(pos) => profile.location = Some(pos),
            }
        }
    }
}

#[async_trait]
impl ProfileStore for MockProfileStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Profile>> {
        self.simulate_latency().await;
        if self.forbidden.load(Ordering::SeqCst) {
            return Err(StoreError::Forbidden);
        }
        Ok(self.profile(email))
    }

    async fn update(&self, id: &ProfileId, update: ProfileUpdate) -> StoreResult<()> {
        self.simulate_latency().await;

        let result = if self.forbidden.load(Ordering::SeqCst) {
            Err(StoreError::Forbidden)
        } else {
            let fail = match update {
                ProfileUpdate::OnlineStat(_) => self.fail_status_writes.load(Ordering::SeqCst),
                ProfileUpdate::Location(_) => self.fail_location_writes.load(Ordering::SeqCst),
            };
            if fail {
                Err(StoreError::Status {
                    status: 500,
                    message: "Internal Server Error".into(),
                })
            } else {
                Ok(())
            }
        };

        self.writes.lock().push(RecordedWrite {
            id: id.clone(),
            update,
            accepted: result.is_ok(),
        });

        if result.is_ok() {
            self.apply(id, update);
        }
        result
    }
}
