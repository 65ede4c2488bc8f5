//! Geolocation provider for hosts without a positioning device.
//!
//! The CLI runs on workstations and field laptops, so "current position" and
//! "last-known position" come from configuration. An absent current position
//! behaves like a GPS that cannot get a fix.

use async_trait::async_trait;

use crate::domain::Coordinates;
use crate::domain::ports::{GeolocationProvider, GeolocationProviderError, PermissionStatus};

/// [`GeolocationProvider`] answering from configured values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfiguredGeolocationProvider {
    permission: PermissionStatus,
    current: Option<Coordinates>,
    last_known: Option<Coordinates>,
}

impl ConfiguredGeolocationProvider {
    /// Build a provider from the configured permission and positions.
    #[must_use]
    pub fn new(
        permission: PermissionStatus,
        current: Option<Coordinates>,
        last_known: Option<Coordinates>,
    ) -> Self {
        Self {
            permission,
            current,
            last_known,
        }
    }
}

#[async_trait]
impl GeolocationProvider for ConfiguredGeolocationProvider {
    async fn request_permission(&self) -> Result<PermissionStatus, GeolocationProviderError> {
        Ok(self.permission)
    }

    async fn current_position(&self) -> Result<Coordinates, GeolocationProviderError> {
        self.current
            .ok_or_else(|| GeolocationProviderError::unavailable("no device position configured"))
    }

    async fn last_known_position(&self) -> Result<Option<Coordinates>, GeolocationProviderError> {
        Ok(self.last_known)
    }
}
