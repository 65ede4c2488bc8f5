//! Ports for the external collaborators of the field client.
//!
//! Each port ships a fixture implementation usable by the CLI's offline mode
//! and by tests, plus a `mockall` mock under `cfg(test)`.

mod macros;
pub(crate) use macros::define_port_error;

mod auth_api;
mod auth_expiry_listener;
mod bioindicator_catalogue;
mod geolocation_provider;
mod occurrence_api;
mod session_store;

#[cfg(test)]
pub use auth_api::MockAuthApi;
pub use auth_api::{
    AuthApi, AuthApiError, FIXTURE_EMAIL, FIXTURE_PASSWORD, FIXTURE_TOKEN, FixtureAuthApi,
};
#[cfg(test)]
pub use auth_expiry_listener::MockAuthExpiryListener;
pub use auth_expiry_listener::AuthExpiryListener;
#[cfg(test)]
pub use bioindicator_catalogue::MockBioindicatorCatalogue;
pub use bioindicator_catalogue::{
    BioindicatorCatalogue, BioindicatorCatalogueError, FixtureBioindicatorCatalogue,
};
#[cfg(test)]
pub use geolocation_provider::MockGeolocationProvider;
pub use geolocation_provider::{
    FixtureGeolocationProvider, GeolocationProvider, GeolocationProviderError, PermissionStatus,
};
#[cfg(test)]
pub use occurrence_api::MockOccurrenceApi;
pub use occurrence_api::{
    FIXTURE_AUTHOR_ID, FixtureOccurrenceApi, OccurrenceApi, OccurrenceApiError,
};
#[cfg(test)]
pub use session_store::MockSessionStore;
pub use session_store::{FixtureSessionStore, SessionStore, SessionStoreError};
