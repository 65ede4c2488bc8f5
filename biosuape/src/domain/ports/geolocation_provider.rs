//! Driven port for the platform geolocation service.
//!
//! The location acquisition service consumes this narrow interface instead of a
//! platform SDK, so the fallback order can be tested without a device.

use async_trait::async_trait;

use crate::domain::Coordinates;

use super::define_port_error;

define_port_error! {
    /// Errors raised by geolocation adapters.
    pub enum GeolocationProviderError {
        /// The platform could not produce a position in time.
        Unavailable { message: String } => "position unavailable: {message}",
        /// The platform service itself failed (disabled radio, crashed service).
        Platform { message: String } => "geolocation service failed: {message}",
    }
}

/// Outcome of a foreground permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// The user allowed foreground location access.
    Granted,
    /// The user or platform refused access.
    Denied,
}

/// Port for querying device position.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// Ask for foreground location permission.
    async fn request_permission(&self) -> Result<PermissionStatus, GeolocationProviderError>;

    /// Query a fresh, high-accuracy position.
    async fn current_position(&self) -> Result<Coordinates, GeolocationProviderError>;

    /// Read the platform's cached last-known position, if any.
    async fn last_known_position(&self) -> Result<Option<Coordinates>, GeolocationProviderError>;
}

/// Fixture provider that always grants permission and reports a fixed fix.
///
/// The default position is the Suape estuary, where the field programme runs.
#[derive(Debug, Clone, Copy)]
pub struct FixtureGeolocationProvider {
    position: Coordinates,
}

impl FixtureGeolocationProvider {
    /// Report `position` for both current and last-known queries.
    #[must_use]
    pub fn at(position: Coordinates) -> Self {
        Self { position }
    }
}

impl Default for FixtureGeolocationProvider {
    fn default() -> Self {
        Self::at(crate::domain::DEFAULT_MAP_CENTRE)
    }
}

#[async_trait]
impl GeolocationProvider for FixtureGeolocationProvider {
    async fn request_permission(&self) -> Result<PermissionStatus, GeolocationProviderError> {
        Ok(PermissionStatus::Granted)
    }

    async fn current_position(&self) -> Result<Coordinates, GeolocationProviderError> {
        Ok(self.position)
    }

    async fn last_known_position(&self) -> Result<Option<Coordinates>, GeolocationProviderError> {
        Ok(Some(self.position))
    }
}
