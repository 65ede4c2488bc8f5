//! Bioindicator species and catalogue search.

use std::sync::Arc;

use tracing::warn;

use super::Error;
use super::ports::BioindicatorCatalogue;

/// A species whose presence or health signals environmental conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bioindicator {
    /// Catalogue identifier, used as `speciesId` on occurrences.
    pub id: String,
    /// Common Portuguese name.
    pub popular_name: String,
    /// Binomial name.
    pub scientific_name: String,
    /// Field-guide description.
    pub description: String,
    /// What the species indicates about the environment.
    pub indicator_role: String,
    /// Illustration URL, when the catalogue has one.
    pub image_url: Option<String>,
}

impl Bioindicator {
    /// Case-insensitive match against popular or scientific name.
    ///
    /// A blank query matches everything.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        needle.is_empty()
            || self.popular_name.to_lowercase().contains(&needle)
            || self.scientific_name.to_lowercase().contains(&needle)
    }
}

/// Catalogue browsing service.
pub struct CatalogueService<C> {
    catalogue: Arc<C>,
}

impl<C> Clone for CatalogueService<C> {
    fn clone(&self) -> Self {
        Self {
            catalogue: Arc::clone(&self.catalogue),
        }
    }
}

impl<C> CatalogueService<C>
where
    C: BioindicatorCatalogue,
{
    /// Create a service over `catalogue`.
    pub fn new(catalogue: Arc<C>) -> Self {
        Self { catalogue }
    }

    /// Species whose popular or scientific name contains `query`.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with `FetchFailed` when the catalogue cannot be read.
    pub async fn search(&self, query: &str) -> Result<Vec<Bioindicator>, Error> {
        let species = self.catalogue.list().await.map_err(|err| {
            warn!(error = %err, "bioindicator catalogue read failed");
            Error::fetch_failed(format!("could not load bioindicators: {err}"))
        })?;
        Ok(species
            .into_iter()
            .filter(|species| species.matches(query))
            .collect())
    }

    /// Look up one species by catalogue id.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] with `FetchFailed` when the catalogue cannot be read.
    pub async fn find(&self, id: &str) -> Result<Option<Bioindicator>, Error> {
        let species = self.search("").await?;
        Ok(species.into_iter().find(|species| species.id == id))
    }
}
