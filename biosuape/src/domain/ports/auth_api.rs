//! Driven port for the remote login and registration endpoints.

use async_trait::async_trait;

use crate::domain::{AuthenticatedUser, LoginCredentials, LoginGrant, Registration, SessionToken};

use super::define_port_error;

define_port_error! {
    /// Errors raised by authentication API adapters.
    pub enum AuthApiError {
        /// The server refused the credentials.
        InvalidCredentials { message: String } => "login refused: {message}",
        /// The server rejected the request (duplicate email, weak password).
        Rejected { status: u16, message: String } => "request rejected with status {status}: {message}",
        /// The server could not be reached.
        Transport { message: String } => "authentication transport failed: {message}",
        /// The request exceeded its time budget.
        Timeout { message: String } => "authentication request timed out: {message}",
        /// The response body could not be decoded or lacked a token.
        Decode { message: String } => "authentication response invalid: {message}",
    }
}

/// Port for account endpoints. Calls are unauthenticated.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a session token and user profile.
    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginGrant, AuthApiError>;

    /// Create an account and return the server's confirmation message.
    async fn register(&self, registration: &Registration) -> Result<String, AuthApiError>;
}

/// Email accepted by [`FixtureAuthApi`].
pub const FIXTURE_EMAIL: &str = "admin@suape.org";
/// Password accepted by [`FixtureAuthApi`].
pub const FIXTURE_PASSWORD: &str = "password";
/// Token issued by [`FixtureAuthApi`].
pub const FIXTURE_TOKEN: &str = "fixture-session-token";

/// In-memory authenticator: `admin@suape.org` / `password` logs in.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureAuthApi;

#[async_trait]
impl AuthApi for FixtureAuthApi {
    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginGrant, AuthApiError> {
        if credentials.email() != FIXTURE_EMAIL || credentials.password() != FIXTURE_PASSWORD {
            return Err(AuthApiError::invalid_credentials("invalid email or password"));
        }
        let token = SessionToken::new(FIXTURE_TOKEN)
            .map_err(|err| AuthApiError::decode(format!("invalid fixture token: {err}")))?;
        Ok(LoginGrant {
            token,
            user: AuthenticatedUser {
                id: "123e4567-e89b-12d3-a456-426614174000".to_owned(),
                name: "suape_user".to_owned(),
                email: FIXTURE_EMAIL.to_owned(),
                registered_at: None,
            },
        })
    }

    async fn register(&self, registration: &Registration) -> Result<String, AuthApiError> {
        if registration.credentials().email() == FIXTURE_EMAIL {
            return Err(AuthApiError::rejected(409_u16, "email already registered"));
        }
        Ok(format!("account created for {}", registration.name()))
    }
}
