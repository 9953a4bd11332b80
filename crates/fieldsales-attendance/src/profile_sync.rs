//! Re-validation of the signed-in profile against the backend
//!
//! Admins can block or approve an agent at any time. [`ProfileSync`]
//! refetches the profile and tells the caller whether the session may
//! continue.

use std::sync::Arc;

use fieldsales_core::ProfileStore;
use tracing::{error, info, instrument, warn};

use crate::error::{AttendanceError, AttendanceResult};
use crate::session::SessionContext;

/// What a profile refresh found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSyncOutcome {
    /// Session has no email to look up; nothing was fetched
    Skipped,
    /// Profile is in good standing and nothing changed
    Unchanged,
    /// Approval flag changed and the session was updated
    ApprovalChanged { approved: bool },
    /// Blocked by an admin; the caller must terminate the session
    Blocked,
    /// The backend refused the request (403); the caller must sign out
    SessionExpired,
    /// No profile is registered for the session's email
    NotFound,
}

impl ProfileSyncOutcome {
    /// Whether the caller has to end the session
    pub fn terminates_session(&self) -> bool {
        matches!(
            self,
            ProfileSyncOutcome::Blocked | ProfileSyncOutcome::SessionExpired
        )
    }
}

/// Refreshes block and approval state for a session
pub struct ProfileSync {
    store: Arc<dyn ProfileStore>,
    session: Arc<SessionContext>,
}

impl ProfileSync {
    pub fn new(store: Arc<dyn ProfileStore>, session: Arc<SessionContext>) -> Self {
        Self { store, session }
    }

    #[instrument(skip(self), fields(email = %self.session.email()))]
    pub async fn sync(&self) -> AttendanceResult<ProfileSyncOutcome> {
        if self.session.email().is_empty() {
            return Ok(ProfileSyncOutcome::Skipped);
        }

        let profile = match self.store.find_by_email(self.session.email()).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                warn!("No sales profile registered for this email");
                return Ok(ProfileSyncOutcome::NotFound);
            }
            Err(e) if e.is_forbidden() => {
                warn!("Session expired or permission denied");
                return Ok(ProfileSyncOutcome::SessionExpired);
            }
            Err(e) => {
                error!(error = %e, "Profile sync failed");
                return Err(AttendanceError::Store(e));
            }
        };

        if profile.is_blocked() {
            warn!(profile_id = %profile.id, "Session terminated: profile blocked by admin");
            return Ok(ProfileSyncOutcome::Blocked);
        }

        let approved = profile.is_approved();
        if approved != self.session.is_approved() {
            self.session.set_approved(approved);
            info!(approved, "Approval status changed");
            return Ok(ProfileSyncOutcome::ApprovalChanged { approved });
        }

        Ok(ProfileSyncOutcome::Unchanged)
    }
}
