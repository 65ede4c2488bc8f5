//! Driven port for persisting the opaque session token.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::SessionToken;

use super::define_port_error;

define_port_error! {
    /// Errors raised by session store adapters.
    pub enum SessionStoreError {
        /// Reading or writing the backing storage failed.
        Io { message: String } => "session store I/O failed: {message}",
        /// Stored content could not be interpreted as a token.
        Corrupt { message: String } => "stored session is unreadable: {message}",
    }
}

/// Port for the secure token store. At most one token is held at a time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist `token`, replacing any previous one.
    async fn set(&self, token: &SessionToken) -> Result<(), SessionStoreError>;

    /// Read the stored token, if any.
    async fn get(&self) -> Result<Option<SessionToken>, SessionStoreError>;

    /// Remove the stored token. Clearing an empty store succeeds.
    async fn clear(&self) -> Result<(), SessionStoreError>;
}

/// In-memory store for tests and ephemeral CLI sessions.
#[derive(Debug, Default)]
pub struct FixtureSessionStore {
    token: Mutex<Option<SessionToken>>,
}

impl FixtureSessionStore {
    /// Start with `token` already stored, as after a previous login.
    #[must_use]
    pub fn with_token(token: SessionToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<SessionToken>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionStore for FixtureSessionStore {
    async fn set(&self, token: &SessionToken) -> Result<(), SessionStoreError> {
        *self.slot() = Some(token.clone());
        Ok(())
    }

    async fn get(&self) -> Result<Option<SessionToken>, SessionStoreError> {
        Ok(self.slot().clone())
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        *self.slot() = None;
        Ok(())
    }
}
