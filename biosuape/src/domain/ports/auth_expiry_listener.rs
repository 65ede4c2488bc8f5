//! Callback port notified when the active session is torn down by the API.
//!
//! Listeners are registered on the session manager at construction time, so no
//! global sign-out hook has to be wired before the first request.

/// Observer of session expiry.
#[cfg_attr(test, mockall::automock)]
pub trait AuthExpiryListener: Send + Sync {
    /// Called once per invalidation, after the session store was cleared.
    fn on_auth_expired(&self);
}

