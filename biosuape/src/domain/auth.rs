//! Authentication primitives: credentials, registrations, and session tokens.
//!
//! Constructors validate raw form inputs so services only ever see
//! well-formed values. Secrets live in zeroizing buffers.

use std::fmt;

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

/// Domain error returned when login or registration inputs are invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialsValidationError {
    /// Email was missing or blank once trimmed.
    #[error("email must not be empty")]
    EmptyEmail,
    /// Email lacked an `@` separating local part and domain.
    #[error("email must contain '@'")]
    MalformedEmail,
    /// Password was blank.
    #[error("password must not be empty")]
    EmptyPassword,
    /// Display name was missing or blank once trimmed.
    #[error("name must not be empty")]
    EmptyName,
    /// Session token was blank.
    #[error("session token must not be empty")]
    EmptyToken,
}

fn normalise_email(email: &str) -> Result<String, CredentialsValidationError> {
    let normalised = email.trim();
    if normalised.is_empty() {
        return Err(CredentialsValidationError::EmptyEmail);
    }
    match normalised.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            Ok(normalised.to_owned())
        }
        _ => Err(CredentialsValidationError::MalformedEmail),
    }
}

/// Validated login credentials.
///
/// ## Invariants
/// - `email` is trimmed and contains a non-empty local part and domain.
/// - `password` is non-empty but keeps caller-provided whitespace.
///
/// # Examples
/// ```
/// use biosuape::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" ana@suape.org ", "secret").unwrap();
/// assert_eq!(creds.email(), "ana@suape.org");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw email/password inputs.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsValidationError`] for blank or malformed inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, CredentialsValidationError> {
        let email = normalise_email(email)?;
        if password.is_empty() {
            return Err(CredentialsValidationError::EmptyPassword);
        }
        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password as provided by the caller.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated sign-up request.
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    name: String,
    credentials: LoginCredentials,
}

impl Registration {
    /// Construct a registration from raw form inputs.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsValidationError`] for a blank name or invalid
    /// credentials.
    pub fn try_from_parts(
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Self, CredentialsValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CredentialsValidationError::EmptyName);
        }
        Ok(Self {
            name: name.to_owned(),
            credentials: LoginCredentials::try_from_parts(email, password)?,
        })
    }

    /// Display name, trimmed.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Email and password of the new account.
    #[must_use]
    pub fn credentials(&self) -> &LoginCredentials {
        &self.credentials
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Opaque bearer token identifying the active session.
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(Zeroizing<String>);

impl SessionToken {
    /// Wrap a raw token.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsValidationError::EmptyToken`] for blank tokens.
    pub fn new(raw: impl Into<String>) -> Result<Self, CredentialsValidationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(CredentialsValidationError::EmptyToken);
        }
        Ok(Self(Zeroizing::new(raw)))
    }

    /// Raw token for the `Authorization` header or the session store.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Profile of the logged-in user as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Server-side user identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Registration timestamp, when the server reports it.
    pub registered_at: Option<DateTime<Utc>>,
}

/// Successful login: the token to persist and the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    /// Bearer token for subsequent calls.
    pub token: SessionToken,
    /// Authenticated user profile.
    pub user: AuthenticatedUser,
}
