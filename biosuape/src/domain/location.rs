//! Location acquisition with a two-tier fallback.
//!
//! The order is fixed: permission, fresh high-accuracy fix, cached last-known
//! fix. A stale cached fix is preferred over no geotag at all.

use std::sync::Arc;

use tracing::{debug, warn};

use super::ports::{
    GeolocationProvider, GeolocationProviderError, PermissionStatus, define_port_error,
};
use super::{Coordinates, Error};

define_port_error! {
    /// Failure to obtain a usable position.
    pub enum LocationError {
        /// The user refused foreground location access.
        PermissionDenied { message: String } => "{message}",
        /// Asking for permission failed before the user could answer.
        RequestFailed { message: String } => "{message}",
        /// Neither a fresh nor a cached position is available.
        LocationUnavailable { message: String } => "{message}",
    }
}

impl From<LocationError> for Error {
    fn from(value: LocationError) -> Self {
        match value {
            LocationError::PermissionDenied { message } => Self::permission_denied(message),
            LocationError::RequestFailed { message }
            | LocationError::LocationUnavailable { message } => {
                Self::location_unavailable(message)
            }
        }
    }
}

const PERMISSION_DENIED_MESSAGE: &str = "Permission to access location was denied.";
const UNAVAILABLE_MESSAGE: &str = "Could not determine your location. Please try again.";

/// Resolves the device position for geotagging occurrences.
pub struct LocationAcquisitionService<G> {
    provider: Arc<G>,
}

impl<G> Clone for LocationAcquisitionService<G> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<G> LocationAcquisitionService<G>
where
    G: GeolocationProvider,
{
    /// Create a service over `provider`.
    pub fn new(provider: Arc<G>) -> Self {
        Self { provider }
    }

    /// Acquire coordinates, falling back to the last-known fix.
    ///
    /// No retries are made beyond the two tiers; callers decide whether to
    /// offer a manual retry.
    ///
    /// # Errors
    ///
    /// - [`LocationError::PermissionDenied`] when access is refused.
    /// - [`LocationError::RequestFailed`] when the permission prompt fails.
    /// - [`LocationError::LocationUnavailable`] when both position queries fail.
    pub async fn acquire(&self) -> Result<Coordinates, LocationError> {
        match self.provider.request_permission().await {
            Ok(PermissionStatus::Granted) => {}
            Ok(PermissionStatus::Denied) => {
                debug!("location permission denied");
                return Err(LocationError::permission_denied(PERMISSION_DENIED_MESSAGE));
            }
            Err(err) => {
                warn!(error = %err, "location permission request failed");
                return Err(LocationError::request_failed(format!(
                    "Could not request location permission: {err}"
                )));
            }
        }

        let current_failure = match self.provider.current_position().await {
            Ok(coordinates) => {
                debug!(%coordinates, "acquired high-accuracy position");
                return Ok(coordinates);
            }
            Err(err) => err,
        };

        match self.provider.last_known_position().await {
            Ok(Some(coordinates)) => {
                warn!(
                    error = %current_failure,
                    %coordinates,
                    "high-accuracy fix failed; using last-known position"
                );
                Ok(coordinates)
            }
            Ok(None) => Err(unavailable(&current_failure, None)),
            Err(cached_failure) => Err(unavailable(&current_failure, Some(&cached_failure))),
        }
    }
}

fn unavailable(
    current: &GeolocationProviderError,
    cached: Option<&GeolocationProviderError>,
) -> LocationError {
    match cached {
        Some(cached) => warn!(current = %current, cached = %cached, "no position available"),
        None => warn!(current = %current, "no position available and no cached fix"),
    }
    LocationError::location_unavailable(UNAVAILABLE_MESSAGE)
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockGeolocationProvider;
    use rstest::rstest;

    fn fresh() -> Coordinates {
        Coordinates::new(-8.05, -34.88).expect("valid coordinates")
    }

    fn cached() -> Coordinates {
        Coordinates::new(-8.30, -34.91).expect("valid coordinates")
    }

    fn granted() -> MockGeolocationProvider {
        let mut provider = MockGeolocationProvider::new();
        provider
            .expect_request_permission()
            .times(1)
            .return_once(|| Ok(PermissionStatus::Granted));
        provider
    }

    fn service(provider: MockGeolocationProvider) -> LocationAcquisitionService<MockGeolocationProvider> {
        LocationAcquisitionService::new(Arc::new(provider))
    }

    #[tokio::test]
    async fn returns_fresh_fix_without_touching_cache() {
        let mut provider = granted();
        provider
            .expect_current_position()
            .times(1)
            .return_once(|| Ok(fresh()));
        provider.expect_last_known_position().times(0);

        let coords = service(provider).acquire().await.expect("fresh fix");
        assert_eq!(coords, fresh());
    }

    #[tokio::test]
    async fn falls_back_to_last_known_position() {
        let mut provider = granted();
        provider
            .expect_current_position()
            .times(1)
            .return_once(|| Err(GeolocationProviderError::unavailable("no satellites")));
        provider
            .expect_last_known_position()
            .times(1)
            .return_once(|| Ok(Some(cached())));

        let coords = service(provider).acquire().await.expect("cached fix");
        assert_eq!(coords, cached());
    }

    #[rstest]
    #[case::no_cached_fix(Ok(None))]
    #[case::cache_read_failed(Err(GeolocationProviderError::platform("service crashed")))]
    #[tokio::test]
    async fn fails_unavailable_when_both_tiers_fail(
        #[case] cached: Result<Option<Coordinates>, GeolocationProviderError>,
    ) {
        let mut provider = granted();
        provider
            .expect_current_position()
            .times(1)
            .return_once(|| Err(GeolocationProviderError::unavailable("timeout")));
        provider
            .expect_last_known_position()
            .times(1)
            .return_once(move || cached);

        let err = service(provider).acquire().await.expect_err("must fail");
        assert!(matches!(err, LocationError::LocationUnavailable { .. }));
        assert_eq!(Error::from(err).code(), ErrorCode::LocationUnavailable);
    }

    #[tokio::test]
    async fn denied_permission_skips_position_queries() {
        let mut provider = MockGeolocationProvider::new();
        provider
            .expect_request_permission()
            .times(1)
            .return_once(|| Ok(PermissionStatus::Denied));
        provider.expect_current_position().times(0);
        provider.expect_last_known_position().times(0);

        let err = service(provider).acquire().await.expect_err("must fail");
        assert!(matches!(err, LocationError::PermissionDenied { .. }));
        assert_eq!(Error::from(err).code(), ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn failing_permission_prompt_is_request_failed() {
        let mut provider = MockGeolocationProvider::new();
        provider
            .expect_request_permission()
            .times(1)
            .return_once(|| Err(GeolocationProviderError::platform("prompt crashed")));
        provider.expect_current_position().times(0);

        let err = service(provider).acquire().await.expect_err("must fail");
        assert!(matches!(err, LocationError::RequestFailed { .. }));
    }
}
