//! Client configuration loaded via OrthoConfig.
//!
//! Values come from `BIOSUAPE_*` environment variables and configuration
//! files. Every field is optional; accessors apply the defaults and validate.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;

use crate::domain::ports::PermissionStatus;
use crate::domain::{Coordinates, CoordinatesValidationError};
use crate::outbound::geolocation::ConfiguredGeolocationProvider;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";
const DEFAULT_SESSION_FILE: &str = ".biosuape/session";

/// Invalid configuration value.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// `api_base_url` is not an absolute URL.
    #[error("invalid api_base_url {value:?}: {source}")]
    InvalidUrl {
        /// Configured value.
        value: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// Only one half of a latitude/longitude pair was set.
    #[error("{name}_latitude and {name}_longitude must be set together")]
    PartialPosition {
        /// Position prefix, such as `device`.
        name: &'static str,
    },
    /// A configured position is out of range.
    #[error("invalid {name} position: {source}")]
    InvalidPosition {
        /// Position prefix, such as `device`.
        name: &'static str,
        /// Range failure.
        #[source]
        source: CoordinatesValidationError,
    },
    /// `location_permission` is neither `granted` nor `denied`.
    #[error("location_permission must be \"granted\" or \"denied\", got {0:?}")]
    UnknownPermission(String),
    /// `log_format` is neither `text` nor `json`.
    #[error("log_format must be \"text\" or \"json\", got {0:?}")]
    UnknownLogFormat(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Configuration of the field client.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "BIOSUAPE")]
pub struct ClientSettings {
    /// Base URL of the REST API, including the version prefix.
    pub api_base_url: Option<String>,
    /// Per-request timeout in seconds.
    #[ortho_config(default = 15)]
    pub request_timeout_secs: u64,
    /// Where the session token is persisted.
    pub session_file: Option<PathBuf>,
    /// Latitude reported as the current device position.
    pub device_latitude: Option<f64>,
    /// Longitude reported as the current device position.
    pub device_longitude: Option<f64>,
    /// Latitude of the cached last-known position.
    pub last_known_latitude: Option<f64>,
    /// Longitude of the cached last-known position.
    pub last_known_longitude: Option<f64>,
    /// `granted` (default) or `denied`.
    pub location_permission: Option<String>,
    /// `text` (default) or `json`.
    pub log_format: Option<String>,
}

impl ClientSettings {
    /// Parsed API base URL.
    ///
    /// # Errors
    ///
    /// [`SettingsError::InvalidUrl`] when the value does not parse.
    pub fn api_base_url(&self) -> Result<Url, SettingsError> {
        let value = self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL);
        Url::parse(value).map_err(|source| SettingsError::InvalidUrl {
            value: value.to_owned(),
            source,
        })
    }

    /// Per-request timeout; zero is raised to one second.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Session token file.
    #[must_use]
    pub fn session_file(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE))
    }

    /// Configured current position, if any.
    ///
    /// # Errors
    ///
    /// When only one coordinate is set or the pair is out of range.
    pub fn device_position(&self) -> Result<Option<Coordinates>, SettingsError> {
        position("device", self.device_latitude, self.device_longitude)
    }

    /// Configured last-known position, if any.
    ///
    /// # Errors
    ///
    /// When only one coordinate is set or the pair is out of range.
    pub fn last_known_position(&self) -> Result<Option<Coordinates>, SettingsError> {
        position("last_known", self.last_known_latitude, self.last_known_longitude)
    }

    /// Permission answer given to location prompts.
    ///
    /// # Errors
    ///
    /// [`SettingsError::UnknownPermission`] for unrecognised values.
    pub fn location_permission(&self) -> Result<PermissionStatus, SettingsError> {
        match self.location_permission.as_deref().map(str::trim) {
            None => Ok(PermissionStatus::Granted),
            Some(value) if value.eq_ignore_ascii_case("granted") => Ok(PermissionStatus::Granted),
            Some(value) if value.eq_ignore_ascii_case("denied") => Ok(PermissionStatus::Denied),
            Some(value) => Err(SettingsError::UnknownPermission(value.to_owned())),
        }
    }

    /// Log output format.
    ///
    /// # Errors
    ///
    /// [`SettingsError::UnknownLogFormat`] for unrecognised values.
    pub fn log_format(&self) -> Result<LogFormat, SettingsError> {
        match self.log_format.as_deref().map(str::trim) {
            None => Ok(LogFormat::Text),
            Some(value) if value.eq_ignore_ascii_case("text") => Ok(LogFormat::Text),
            Some(value) if value.eq_ignore_ascii_case("json") => Ok(LogFormat::Json),
            Some(value) => Err(SettingsError::UnknownLogFormat(value.to_owned())),
        }
    }

    /// Geolocation provider answering from the configured values.
    ///
    /// # Errors
    ///
    /// Any error from the position and permission accessors.
    pub fn geolocation_provider(&self) -> Result<ConfiguredGeolocationProvider, SettingsError> {
        Ok(ConfiguredGeolocationProvider::new(
            self.location_permission()?,
            self.device_position()?,
            self.last_known_position()?,
        ))
    }
}

fn position(
    name: &'static str,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<Coordinates>, SettingsError> {
    match (latitude, longitude) {
        (None, None) => Ok(None),
        (Some(latitude), Some(longitude)) => Coordinates::new(latitude, longitude)
            .map(Some)
            .map_err(|source| SettingsError::InvalidPosition { name, source }),
        _ => Err(SettingsError::PartialPosition { name }),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for client configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 9] = [
        "BIOSUAPE_API_BASE_URL",
        "BIOSUAPE_REQUEST_TIMEOUT_SECS",
        "BIOSUAPE_SESSION_FILE",
        "BIOSUAPE_DEVICE_LATITUDE",
        "BIOSUAPE_DEVICE_LONGITUDE",
        "BIOSUAPE_LAST_KNOWN_LATITUDE",
        "BIOSUAPE_LAST_KNOWN_LONGITUDE",
        "BIOSUAPE_LOCATION_PERMISSION",
        "BIOSUAPE_LOG_FORMAT",
    ];

    fn load_from_empty_args() -> ClientSettings {
        ClientSettings::load_from_iter([OsString::from("biosuape")]).expect("config should load")
    }

    fn env_with(overrides: &[(&'static str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(env_with(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.api_base_url().expect("default URL").as_str(),
            "http://localhost:8080/api/v1"
        );
        assert_eq!(settings.request_timeout(), Duration::from_secs(15));
        assert_eq!(settings.session_file(), PathBuf::from(".biosuape/session"));
        assert_eq!(settings.device_position().expect("valid"), None);
        assert_eq!(
            settings.location_permission().expect("valid"),
            PermissionStatus::Granted
        );
        assert_eq!(settings.log_format().expect("valid"), LogFormat::Text);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(env_with(&[
            ("BIOSUAPE_API_BASE_URL", "https://api.suape.example/v2"),
            ("BIOSUAPE_REQUEST_TIMEOUT_SECS", "30"),
            ("BIOSUAPE_DEVICE_LATITUDE", "-8.05"),
            ("BIOSUAPE_DEVICE_LONGITUDE", "-34.88"),
            ("BIOSUAPE_LOCATION_PERMISSION", "denied"),
            ("BIOSUAPE_LOG_FORMAT", "json"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.api_base_url().expect("valid URL").host_str(),
            Some("api.suape.example")
        );
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        let position = settings.device_position().expect("valid").expect("set");
        assert_eq!(position.latitude(), -8.05);
        assert_eq!(
            settings.location_permission().expect("valid"),
            PermissionStatus::Denied
        );
        assert_eq!(settings.log_format().expect("valid"), LogFormat::Json);
    }

    #[rstest]
    fn half_a_position_is_rejected() {
        let _guard = lock_env(env_with(&[("BIOSUAPE_LAST_KNOWN_LATITUDE", "-8.3")]));

        let settings = load_from_empty_args();
        assert!(matches!(
            settings.last_known_position(),
            Err(SettingsError::PartialPosition { name: "last_known" })
        ));
        assert!(settings.geolocation_provider().is_err());
    }

    #[rstest]
    fn zero_timeout_is_raised_to_one_second() {
        let settings = ClientSettings {
            request_timeout_secs: 0,
            ..blank()
        };
        assert_eq!(settings.request_timeout(), Duration::from_secs(1));
    }

    #[rstest]
    #[case("maybe")]
    #[case("")]
    fn unknown_permission_is_rejected(#[case] value: &str) {
        let settings = ClientSettings {
            location_permission: Some(value.to_owned()),
            ..blank()
        };
        assert!(matches!(
            settings.location_permission(),
            Err(SettingsError::UnknownPermission(_))
        ));
    }

    fn blank() -> ClientSettings {
        ClientSettings {
            api_base_url: None,
            request_timeout_secs: 15,
            session_file: None,
            device_latitude: None,
            device_longitude: None,
            last_known_latitude: None,
            last_known_longitude: None,
            location_permission: None,
            log_format: None,
        }
    }
}
