//! WGS84 coordinates attached to occurrences.

use serde::{Deserialize, Serialize};

/// Validation errors returned by [`Coordinates::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatesValidationError {
    /// Latitude or longitude was NaN or infinite.
    #[error("coordinates must be finite")]
    NonFinite,
    /// Latitude fell outside [-90, 90].
    #[error("latitude must be within [-90, 90]")]
    LatitudeOutOfRange,
    /// Longitude fell outside [-180, 180].
    #[error("longitude must be within [-180, 180]")]
    LongitudeOutOfRange,
}

/// Centre of the Suape estuary monitoring area, used when no fix is available
/// for map centring.
pub const DEFAULT_MAP_CENTRE: Coordinates = Coordinates {
    latitude: -8.3075,
    longitude: -34.9125,
};

/// A geographic position in decimal degrees.
///
/// ## Invariants
/// - Both components are finite.
/// - `latitude` lies within [-90, 90] and `longitude` within [-180, 180].
///
/// # Examples
/// ```
/// use biosuape::domain::Coordinates;
///
/// let suape = Coordinates::new(-8.3075, -34.9125).unwrap();
/// assert_eq!(suape.latitude(), -8.3075);
/// assert!(Coordinates::new(91.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinates", into = "RawCoordinates")]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Validate and construct coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatesValidationError`] for non-finite or out-of-range
    /// components.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinatesValidationError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinatesValidationError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinatesValidationError::LatitudeOutOfRange);
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinatesValidationError::LongitudeOutOfRange);
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawCoordinates {
    latitude: f64,
    longitude: f64,
}

impl From<Coordinates> for RawCoordinates {
    fn from(value: Coordinates) -> Self {
        Self {
            latitude: value.latitude,
            longitude: value.longitude,
        }
    }
}

impl TryFrom<RawCoordinates> for Coordinates {
    type Error = CoordinatesValidationError;

    fn try_from(value: RawCoordinates) -> Result<Self, Self::Error> {
        Self::new(value.latitude, value.longitude)
    }
}
