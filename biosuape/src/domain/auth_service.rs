//! Login, registration, and logout on top of the session manager.

use std::sync::Arc;

use tracing::{info, warn};

use super::ports::{AuthApi, AuthApiError};
use super::{AuthenticatedUser, Error, LoginCredentials, Registration, SessionManager};

fn map_auth_error(error: AuthApiError) -> Error {
    match error {
        AuthApiError::InvalidCredentials { message } => {
            Error::invalid_request(format!("Invalid email or password: {message}"))
        }
        AuthApiError::Rejected { status, message } => {
            Error::invalid_request(format!("Request rejected: {message}"))
                .with_details(serde_json::json!({ "status": status }))
        }
        AuthApiError::Transport { message } | AuthApiError::Timeout { message } => {
            Error::fetch_failed(format!("authentication service unreachable: {message}"))
        }
        AuthApiError::Decode { message } => {
            Error::internal(format!("unexpected authentication response: {message}"))
        }
    }
}

/// Account operations that start and end sessions.
pub struct AuthService<A> {
    api: Arc<A>,
    session: Arc<SessionManager>,
}

impl<A> Clone for AuthService<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            session: Arc::clone(&self.session),
        }
    }
}

impl<A> AuthService<A>
where
    A: AuthApi,
{
    /// Create a service over `api` that records sessions in `session`.
    pub fn new(api: Arc<A>, session: Arc<SessionManager>) -> Self {
        Self { api, session }
    }

    /// Exchange credentials for a token and start a session.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` when the server refuses the credentials.
    /// - `FetchFailed` when the server cannot be reached.
    /// - `InternalError` when the response carries no usable token or the
    ///   token cannot be persisted.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthenticatedUser, Error> {
        let grant = self.api.login(credentials).await.map_err(|err| {
            warn!(error = %err, "login failed");
            map_auth_error(err)
        })?;
        self.session.begin(grant.token).await?;
        info!(user_id = %grant.user.id, "logged in");
        Ok(grant.user)
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Same mapping as [`Self::login`]; a duplicate account surfaces as
    /// `InvalidRequest` with the HTTP status in the details.
    pub async fn register(&self, registration: &Registration) -> Result<String, Error> {
        self.api.register(registration).await.map_err(|err| {
            warn!(error = %err, "registration failed");
            map_auth_error(err)
        })
    }

    /// End the active session.
    ///
    /// # Errors
    ///
    /// Returns `InternalError` when the stored token cannot be removed.
    pub async fn logout(&self) -> Result<(), Error> {
        self.session.end().await
    }
}
