//! Session context injection
//!
//! Thread-local storage for the agent's profile identity, so every span
//! opened while a [`SessionContextGuard`] is alive carries the profile id.

use std::cell::RefCell;

use fieldsales_core::ProfileId;
use uuid::Uuid;

/// Session context data stored in thread-local storage
#[derive(Debug, Clone)]
pub struct SessionContextData {
    /// The agent's profile id
    pub profile_id: String,
    /// Whether the session talks to a real backend
    pub mode: SessionMode,
    /// Unique id for this attendance session
    pub instance_id: Uuid,
}

/// What the session is connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Real backend and device location
    Live,
    /// Mock store or replayed location feed
    Simulated,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Live => write!(f, "live"),
            SessionMode::Simulated => write!(f, "simulated"),
        }
    }
}

thread_local! {
    static SESSION_CONTEXT: RefCell<Option<SessionContextData>> = const { RefCell::new(None) };
}

/// RAII guard for session context
///
/// Sets the session context for the current thread on creation and restores
/// the previous context (if any) on drop.
///
/// # Example
///
/// ```ignore
/// use fieldsales_logging::context::{SessionContextGuard, SessionMode};
///
/// let _guard = SessionContextGuard::new(&profile_id, SessionMode::Live);
/// tracing::info!("Attendance session mounted");
/// ```
pub struct SessionContextGuard {
    previous: Option<SessionContextData>,
}

impl SessionContextGuard {
    /// Set the session context for the current scope with a fresh instance id
    pub fn new(profile_id: &ProfileId, mode: SessionMode) -> Self {
        Self::with_instance_id(profile_id, mode, Uuid::new_v4())
    }

    /// Set the session context with a specific instance id
    pub fn with_instance_id(profile_id: &ProfileId, mode: SessionMode, instance_id: Uuid) -> Self {
        let previous = SESSION_CONTEXT.with(|ctx| ctx.borrow().clone());

        let new_ctx = SessionContextData {
            profile_id: profile_id.to_string(),
            mode,
            instance_id,
        };

        SESSION_CONTEXT.with(|ctx| *ctx.borrow_mut() = Some(new_ctx));

        Self { previous }
    }

    /// Get the current session context (if any)
    pub fn current() -> Option<SessionContextData> {
        SESSION_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the current profile id (if set)
    pub fn current_profile_id() -> Option<String> {
        Self::current().map(|ctx| ctx.profile_id)
    }
}

impl Drop for SessionContextGuard {
    fn drop(&mut self) {
        SESSION_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}
