//! Dashboard filter handling: the one place that writes the series cache.

use polisa_core::{DateRange, FilterSelection, NetworkError, SeriesQuery, SeriesResponse};
use std::sync::Arc;

use crate::cache::{CacheKey, TtlCache};
use crate::collaborators::SeriesSource;
use crate::zoom::{ZoomController, ZoomLevel, ZoomOutcome};

/// Base series plus drill-down state for one dashboard mode.
pub struct Dashboard {
    source: Arc<dyn SeriesSource>,
    cache: Arc<TtlCache<SeriesResponse>>,
    zoom: ZoomController,
}

impl Dashboard {
    pub fn new(
        source: Arc<dyn SeriesSource>,
        cache: Arc<TtlCache<SeriesResponse>>,
        mode: impl Into<String>,
        range: DateRange,
    ) -> Self {
        let query = SeriesQuery::new(mode, ZoomLevel::for_range(&range).granularity(), range);
        let zoom = ZoomController::new(source.clone(), cache.clone(), query);
        Self {
            source,
            cache,
            zoom,
        }
    }

    pub fn zoom(&self) -> &ZoomController {
        &self.zoom
    }

    pub fn query(&self) -> &SeriesQuery {
        self.zoom.base_query()
    }

    /// Switch to a new range/filter selection and load its base series.
    ///
    /// Drill-down state is reset first. The series comes from the cache when
    /// a fresh entry exists; otherwise it is fetched and stored.
    pub async fn apply_filters(
        &mut self,
        range: DateRange,
        filters: FilterSelection,
    ) -> Result<SeriesResponse, NetworkError> {
        let level = ZoomLevel::for_range(&range);
        let query = SeriesQuery::new(self.query().mode.clone(), level.granularity(), range)
            .with_filters(filters);
        self.zoom.rebase(query.clone());
        self.load(&query).await
    }

    /// Reload the current base series, using the cache when possible.
    pub async fn refresh(&mut self) -> Result<SeriesResponse, NetworkError> {
        let query = self.query().clone();
        self.load(&query).await
    }

    async fn load(&self, query: &SeriesQuery) -> Result<SeriesResponse, NetworkError> {
        let key = CacheKey::for_query(query);
        if let Some(series) = self.cache.get(key.as_str()) {
            tracing::debug!(%key, "dashboard cache hit");
            return Ok(series);
        }
        tracing::debug!(%key, "dashboard cache miss");
        let series = self.source.fetch_series(query).await?;
        self.cache.set(key, series.clone());
        Ok(series)
    }

    /// Series to draw: the zoomed month's days, or the cached base series.
    pub fn displayed(&self) -> Option<SeriesResponse> {
        match &self.zoom.current_frame().context {
            Some(context) => Some(context.daily.clone()),
            None => self.cache.get(CacheKey::for_query(self.query()).as_str()),
        }
    }

    pub async fn zoom_in(&mut self, index: usize) -> Result<ZoomOutcome, NetworkError> {
        self.zoom.zoom_in(index).await
    }

    pub fn zoom_out(&mut self) -> ZoomOutcome {
        self.zoom.zoom_out()
    }
}
