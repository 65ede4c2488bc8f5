//! Local read cache of occurrences and the refresh operation that fills it.
//!
//! A refresh replaces the cache wholesale with the server's list in server
//! order. Overlapping refreshes are not coordinated: the last response to
//! arrive wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::ports::{OccurrenceApi, OccurrenceApiError};
use super::{Error, Occurrence};

/// Shared read cache of server-confirmed occurrences.
#[derive(Debug, Default)]
pub struct OccurrenceCache {
    items: RwLock<Vec<Occurrence>>,
    generation: AtomicU64,
}

impl OccurrenceCache {
    /// Replace the cached list. Returns the new generation.
    pub async fn replace(&self, occurrences: Vec<Occurrence>) -> u64 {
        let mut items = self.items.write().await;
        *items = occurrences;
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Copy of the cached list.
    pub async fn snapshot(&self) -> Vec<Occurrence> {
        self.items.read().await.clone()
    }

    /// Number of completed replacements since construction.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

pub(crate) fn map_fetch_error(error: OccurrenceApiError) -> Error {
    match error {
        OccurrenceApiError::Unauthorized { message } => {
            Error::auth_expired(format!("Your session has expired. Please log in again. ({message})"))
        }
        other => Error::fetch_failed(format!("Could not load occurrences: {other}")),
    }
}

/// Refreshes the community and profile caches from the remote API.
pub struct OccurrenceListRefresh<A> {
    api: Arc<A>,
    all: Arc<OccurrenceCache>,
    mine: Arc<OccurrenceCache>,
}

impl<A> Clone for OccurrenceListRefresh<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            all: Arc::clone(&self.all),
            mine: Arc::clone(&self.mine),
        }
    }
}

impl<A> OccurrenceListRefresh<A>
where
    A: OccurrenceApi,
{
    /// Create a refresher with fresh, empty caches.
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            all: Arc::new(OccurrenceCache::default()),
            mine: Arc::new(OccurrenceCache::default()),
        }
    }

    /// Community cache filled by [`Self::refresh`].
    #[must_use]
    pub fn cache(&self) -> &Arc<OccurrenceCache> {
        &self.all
    }

    /// Profile cache filled by [`Self::refresh_mine`].
    #[must_use]
    pub fn mine_cache(&self) -> &Arc<OccurrenceCache> {
        &self.mine
    }

    /// Fetch every occurrence and replace the community cache.
    ///
    /// # Errors
    ///
    /// `AuthExpired` on an authorisation failure, `FetchFailed` otherwise. The
    /// cache keeps its previous contents on error.
    pub async fn refresh(&self) -> Result<Vec<Occurrence>, Error> {
        let occurrences = self.api.list().await.map_err(|err| {
            warn!(error = %err, "occurrence list refresh failed");
            map_fetch_error(err)
        })?;
        let generation = self.all.replace(occurrences.clone()).await;
        debug!(count = occurrences.len(), generation, "occurrence cache replaced");
        Ok(occurrences)
    }

    /// Fetch the logged-in user's occurrences and replace the profile cache.
    ///
    /// # Errors
    ///
    /// Same as [`Self::refresh`].
    pub async fn refresh_mine(&self) -> Result<Vec<Occurrence>, Error> {
        let occurrences = self.api.list_mine().await.map_err(|err| {
            warn!(error = %err, "own occurrence refresh failed");
            map_fetch_error(err)
        })?;
        let generation = self.mine.replace(occurrences.clone()).await;
        debug!(count = occurrences.len(), generation, "profile cache replaced");
        Ok(occurrences)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{FixtureOccurrenceApi, MockOccurrenceApi};
    use crate::domain::{Coordinates, OccurrencePayload};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn occurrence(id: &str) -> Occurrence {
        let payload = OccurrencePayload {
            species_id: "sp1".to_owned(),
            notes: None,
            ph: None,
            water_temperature: None,
            image_ref: None,
            coordinates: Coordinates::new(-8.05, -34.88).expect("valid coordinates"),
        };
        let now = Utc
            .with_ymd_and_hms(2024, 3, 5, 14, 30, 0)
            .single()
            .expect("valid timestamp");
        Occurrence::from_payload(id, "author", payload, now)
    }

    #[tokio::test]
    async fn refresh_replaces_cache_in_server_order() {
        let api = FixtureOccurrenceApi::seeded(vec![occurrence("b"), occurrence("a")]);
        let refresh = OccurrenceListRefresh::new(Arc::new(api));
        refresh.cache().replace(vec![occurrence("stale")]).await;

        let listed = refresh.refresh().await.expect("refresh succeeds");

        let ids: Vec<_> = listed.iter().map(|o| o.id.clone()).collect();
        assert_eq!(ids, vec!["b".to_owned(), "a".to_owned()]);
        assert_eq!(refresh.cache().snapshot().await, listed);
        assert_eq!(refresh.cache().generation(), 2);
    }

    #[tokio::test]
    async fn last_completed_refresh_wins() {
        let mut api = MockOccurrenceApi::new();
        let mut responses = vec![vec![occurrence("second")], vec![occurrence("first")]];
        api.expect_list()
            .times(2)
            .returning(move || Ok(responses.pop().unwrap_or_default()));
        let refresh = OccurrenceListRefresh::new(Arc::new(api));

        refresh.refresh().await.expect("first refresh");
        refresh.refresh().await.expect("second refresh");

        let ids: Vec<_> = refresh
            .cache()
            .snapshot()
            .await
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec!["second".to_owned()]);
    }

    #[rstest]
    #[case(OccurrenceApiError::unauthorized("token expired"), ErrorCode::AuthExpired)]
    #[case(OccurrenceApiError::transport("offline"), ErrorCode::FetchFailed)]
    #[case(OccurrenceApiError::rejected(500_u16, "boom"), ErrorCode::FetchFailed)]
    #[tokio::test]
    async fn failures_keep_previous_cache(
        #[case] failure: OccurrenceApiError,
        #[case] code: ErrorCode,
    ) {
        let mut api = MockOccurrenceApi::new();
        api.expect_list().times(1).return_once(move || Err(failure));
        let refresh = OccurrenceListRefresh::new(Arc::new(api));
        refresh.cache().replace(vec![occurrence("kept")]).await;

        let err = refresh.refresh().await.expect_err("must fail");

        assert_eq!(err.code(), code);
        assert_eq!(refresh.cache().snapshot().await.len(), 1);
        assert_eq!(refresh.cache().generation(), 1);
    }

    #[tokio::test]
    async fn refresh_mine_fills_profile_cache_only() {
        let mut api = MockOccurrenceApi::new();
        api.expect_list_mine()
            .times(1)
            .return_once(|| Ok(vec![occurrence("mine")]));
        let refresh = OccurrenceListRefresh::new(Arc::new(api));

        refresh.refresh_mine().await.expect("refresh succeeds");

        assert_eq!(refresh.mine_cache().snapshot().await.len(), 1);
        assert!(refresh.cache().snapshot().await.is_empty());
    }
}
