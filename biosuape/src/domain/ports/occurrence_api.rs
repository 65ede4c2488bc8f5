//! Driven port for the remote occurrence collection.
//!
//! Adapters attach the active session token themselves and tear the session
//! down before reporting [`OccurrenceApiError::Unauthorized`].

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Occurrence, OccurrencePayload};

use super::define_port_error;

define_port_error! {
    /// Errors raised by occurrence API adapters.
    pub enum OccurrenceApiError {
        /// No session, or the server rejected the token.
        Unauthorized { message: String } => "not authorised: {message}",
        /// The server answered with a non-success status.
        Rejected { status: u16, message: String } => "server rejected request with status {status}: {message}",
        /// The server could not be reached.
        Transport { message: String } => "occurrence transport failed: {message}",
        /// The request exceeded its time budget.
        Timeout { message: String } => "occurrence request timed out: {message}",
        /// The response body could not be decoded.
        Decode { message: String } => "occurrence response invalid: {message}",
    }
}

impl OccurrenceApiError {
    /// Whether the failure happened below HTTP semantics (network, timeout).
    #[must_use]
    pub fn is_network_class(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

/// Port for creating and listing occurrences. All calls are authenticated.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OccurrenceApi: Send + Sync {
    /// Store a new occurrence and return the server representation.
    async fn create(&self, payload: &OccurrencePayload) -> Result<Occurrence, OccurrenceApiError>;

    /// Fetch every visible occurrence in server order.
    async fn list(&self) -> Result<Vec<Occurrence>, OccurrenceApiError>;

    /// Fetch the occurrences submitted by the logged-in user.
    async fn list_mine(&self) -> Result<Vec<Occurrence>, OccurrenceApiError>;
}

/// Author id stamped on occurrences stored by [`FixtureOccurrenceApi`].
pub const FIXTURE_AUTHOR_ID: &str = "fixture-author";

/// In-memory occurrence collection behaving like the remote API.
#[derive(Debug, Default)]
pub struct FixtureOccurrenceApi {
    stored: Mutex<Vec<Occurrence>>,
}

impl FixtureOccurrenceApi {
    /// Start with `occurrences` already stored.
    #[must_use]
    pub fn seeded(occurrences: Vec<Occurrence>) -> Self {
        Self {
            stored: Mutex::new(occurrences),
        }
    }

    fn stored(&self) -> std::sync::MutexGuard<'_, Vec<Occurrence>> {
        self.stored.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OccurrenceApi for FixtureOccurrenceApi {
    async fn create(&self, payload: &OccurrencePayload) -> Result<Occurrence, OccurrenceApiError> {
        let occurrence = Occurrence::from_payload(
            Uuid::new_v4().to_string(),
            FIXTURE_AUTHOR_ID,
            payload.clone(),
            Utc::now(),
        );
        self.stored().push(occurrence.clone());
        Ok(occurrence)
    }

    async fn list(&self) -> Result<Vec<Occurrence>, OccurrenceApiError> {
        Ok(self.stored().clone())
    }

    async fn list_mine(&self) -> Result<Vec<Occurrence>, OccurrenceApiError> {
        Ok(self
            .stored()
            .iter()
            .filter(|occurrence| occurrence.author_id == FIXTURE_AUTHOR_ID)
            .cloned()
            .collect())
    }
}
