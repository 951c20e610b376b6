use tracing::{debug, warn};

use super::cache::{CacheKey, CacheStore};
use super::tvdb::{
    check_root, decode_episodes, decode_series_id, CatalogParseError, CatalogService,
};
use crate::domain::models::{CatalogEpisode, CatalogId};
use crate::domain::normalize::normalize;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0:#}")]
    Service(anyhow::Error),

    #[error(transparent)]
    Parse(#[from] CatalogParseError),
}

/// Show lookups as seen by the reconciler.
pub trait Catalog {
    /// `Ok(None)` when the catalog knows no show by that name.
    fn resolve_show_id(
        &self,
        show_name: &str,
        language: &str,
    ) -> Result<Option<CatalogId>, CatalogError>;

    fn fetch_episodes(
        &self,
        show_name: &str,
        series_id: &CatalogId,
        language: &str,
    ) -> Result<Vec<CatalogEpisode>, CatalogError>;
}

/// Serves catalog lookups from the cache, falling back to the service and
/// storing what it fetched before decoding it.
pub struct CatalogClient<S, C> {
    service: S,
    cache: C,
}

impl<S: CatalogService, C: CacheStore> CatalogClient<S, C> {
    pub fn new(service: S, cache: C) -> Self {
        Self { service, cache }
    }

    #[cfg(test)]
    pub fn into_service(self) -> S {
        self.service
    }

    #[cfg(test)]
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Error pages and other documents not rooted at `root` are never cached.
    fn cached_or_fetch(
        &self,
        key: &CacheKey,
        root: &str,
        fetch: impl FnOnce(&S) -> anyhow::Result<Vec<u8>>,
    ) -> Result<Vec<u8>, CatalogError> {
        match self.cache.get(key) {
            Ok(Some(bytes)) => {
                debug!(file = %key.file_name(), "Reading catalog response from cache");
                return Ok(bytes);
            }
            Ok(None) => {}
            Err(e) => warn!(file = %key.file_name(), error = %e, "Unreadable cache entry, refetching"),
        }

        let bytes = fetch(&self.service).map_err(CatalogError::Service)?;
        check_root(&bytes, root)?;

        if let Err(e) = self.cache.put(key, &bytes) {
            warn!(file = %key.file_name(), error = %e, "Failed to write cache entry");
        }
        Ok(bytes)
    }
}

impl<S: CatalogService, C: CacheStore> Catalog for CatalogClient<S, C> {
    fn resolve_show_id(
        &self,
        show_name: &str,
        language: &str,
    ) -> Result<Option<CatalogId>, CatalogError> {
        // "Not found" answers are cached like any other response
        let key = CacheKey::search(language, &normalize(show_name));
        let bytes = self.cached_or_fetch(&key, "Data", |service| {
            service.search_series(show_name, language)
        })?;
        Ok(decode_series_id(&bytes)?)
    }

    fn fetch_episodes(
        &self,
        show_name: &str,
        series_id: &CatalogId,
        language: &str,
    ) -> Result<Vec<CatalogEpisode>, CatalogError> {
        let key = CacheKey::episodes(language, &normalize(show_name), series_id);
        let bytes = self.cached_or_fetch(&key, "Data", |service| {
            service.series_episodes(series_id, language)
        })?;
        Ok(decode_episodes(&bytes, show_name)?)
    }
}
