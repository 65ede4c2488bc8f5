//! Session lifecycle: one active token per client instance.
//!
//! The manager is constructed once and handed to the HTTP adapter and to the
//! services. The adapter reads the bearer token from it and calls
//! [`SessionManager::invalidate`] on an authorisation failure; listeners
//! registered at construction hear about the expiry. There is no global
//! "current token".

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::ports::{AuthExpiryListener, SessionStore, SessionStoreError};
use super::{Error, SessionToken};

fn map_store_error(error: &SessionStoreError) -> Error {
    Error::internal(format!("session storage failed: {error}"))
}

/// Owner of the active session token.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    token: RwLock<Option<SessionToken>>,
    listeners: Mutex<Vec<Arc<dyn AuthExpiryListener>>>,
}

impl SessionManager {
    /// Create a manager with no active session.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use biosuape::domain::SessionManager;
    /// use biosuape::domain::ports::FixtureSessionStore;
    ///
    /// let session = SessionManager::new(Arc::new(FixtureSessionStore::default()));
    /// # let _ = session;
    /// ```
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            token: RwLock::new(None),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Register `listener` for expiry notifications.
    #[must_use]
    pub fn with_listener(self, listener: Arc<dyn AuthExpiryListener>) -> Self {
        self.listeners_guard().push(listener);
        self
    }

    fn listeners_guard(&self) -> std::sync::MutexGuard<'_, Vec<Arc<dyn AuthExpiryListener>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a previously persisted token. Returns whether a session is active.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with `InternalError` when the store cannot be read.
    pub async fn restore(&self) -> Result<bool, Error> {
        let stored = self
            .store
            .get()
            .await
            .map_err(|err| map_store_error(&err))?;
        let active = stored.is_some();
        *self.token.write().await = stored;
        debug!(active, "session restored from store");
        Ok(active)
    }

    /// Persist and activate `token` after a successful login.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with `InternalError` when the token cannot be
    /// persisted; the in-memory session is left unchanged in that case.
    pub async fn begin(&self, token: SessionToken) -> Result<(), Error> {
        self.store
            .set(&token)
            .await
            .map_err(|err| map_store_error(&err))?;
        *self.token.write().await = Some(token);
        info!("session started");
        Ok(())
    }

    /// End the session on user request.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with `InternalError` when the store cannot be cleared.
    /// The in-memory session is dropped regardless.
    pub async fn end(&self) -> Result<(), Error> {
        self.token.write().await.take();
        self.store
            .clear()
            .await
            .map_err(|err| map_store_error(&err))?;
        info!("session ended");
        Ok(())
    }

    /// Token to attach to the next authenticated call.
    pub async fn bearer_token(&self) -> Option<SessionToken> {
        self.token.read().await.clone()
    }

    /// Whether a session is active.
    pub async fn is_active(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Tear the session down after the server rejected the token.
    ///
    /// Clears memory and the store, then notifies listeners. Store failures
    /// are logged; the in-memory session is gone either way so no further
    /// authenticated calls go out until a new login.
    pub async fn invalidate(&self) {
        let had_session = self.token.write().await.take().is_some();
        if let Err(err) = self.store.clear().await {
            warn!(error = %err, "failed to clear session store after expiry");
        }
        if !had_session {
            debug!("session already invalidated");
            return;
        }
        warn!("session expired; re-authentication required");
        let listeners = self.listeners_guard().clone();
        for listener in listeners {
            listener.on_auth_expired();
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}
