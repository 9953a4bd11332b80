//! Per-login session context
//!
//! Passed explicitly to every component instead of living in a global
//! store. Only the approval flag may change during a session, and only
//! through [`SessionContext::set_approved`].

use std::sync::atomic::{AtomicBool, Ordering};

use fieldsales_core::{Profile, ProfileId};

/// Identity and permissions of the signed-in agent
#[derive(Debug)]
pub struct SessionContext {
    profile_id: ProfileId,
    email: String,
    blocked: bool,
    approved: AtomicBool,
}

impl SessionContext {
    pub fn new(profile_id: impl Into<ProfileId>, email: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            email: email.into(),
            blocked: false,
            approved: AtomicBool::new(false),
        }
    }

    /// Build a context from a freshly fetched profile
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            profile_id: profile.write_id(),
            email: profile.email.clone().unwrap_or_default(),
            blocked: profile.is_blocked(),
            approved: AtomicBool::new(profile.is_approved()),
        }
    }

    pub fn with_blocked(mut self, blocked: bool) -> Self {
        self.blocked = blocked;
        self
    }

    pub fn with_approved(self, approved: bool) -> Self {
        self.approved.store(approved, Ordering::SeqCst);
        self
    }

    /// Identifier used for every write on behalf of this agent
    pub fn profile_id(&self) -> &ProfileId {
        &self.profile_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn is_approved(&self) -> bool {
        self.approved.load(Ordering::SeqCst)
    }

    /// Record a new approval state; returns the previous one
    pub fn set_approved(&self, approved: bool) -> bool {
        self.approved.swap(approved, Ordering::SeqCst)
    }
}
