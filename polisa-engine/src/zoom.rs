//! Month → day drill-down with undo history.
//!
//! The controller has two levels. From `Month` a bar can be zoomed into,
//! which loads that month's daily series; `zoom_out` walks back through
//! the frames that were current before each zoom-in. Invalid transitions
//! (zooming past `Day`, undoing with nothing to undo) return
//! [`ZoomOutcome::Ignored`] instead of failing, since double clicks reach
//! them routinely.
//!
//! Zooming in is split in two so a caller can drop stale responses:
//! [`ZoomController::begin_zoom_in`] hands out a [`ZoomTicket`], and
//! [`ZoomController::complete_zoom_in`] applies the fetched series only if
//! no reset, zoom-out or newer zoom-in happened in between.

use polisa_core::{DateRange, Granularity, NetworkError, SeriesQuery, SeriesResponse};
use std::sync::Arc;

use crate::cache::{CacheKey, TtlCache};
use crate::collaborators::SeriesSource;

/// Ranges up to this many days open at day level.
pub const DAY_LEVEL_MAX_SPAN_DAYS: i64 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoomLevel {
    Month,
    Day,
}

impl ZoomLevel {
    /// Level a fresh view opens at for `range`.
    pub fn for_range(range: &DateRange) -> Self {
        if range.span_days() <= DAY_LEVEL_MAX_SPAN_DAYS {
            Self::Day
        } else {
            Self::Month
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Self::Month => Granularity::Month,
            Self::Day => Granularity::Day,
        }
    }
}

/// The month being inspected and its daily series.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomContext {
    pub year: i32,
    pub month: u32,
    pub daily: SeriesResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoomFrame {
    pub level: ZoomLevel,
    pub context: Option<ZoomContext>,
}

impl ZoomFrame {
    pub fn base(level: ZoomLevel) -> Self {
        Self {
            level,
            context: None,
        }
    }
}

/// Why a transition was not taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoomRejection {
    /// Already at `Day`; there is no finer level.
    AlreadyAtDay,
    /// The clicked index is not a point of the displayed series.
    IndexOutOfRange { index: usize, len: usize },
    /// The point has no usable month.
    InvalidMonth { year: i32, month: u32 },
    /// Nothing on the stack to return to.
    NothingToUndo,
    /// The view changed while the request was in flight.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoomOutcome {
    Applied,
    Ignored(ZoomRejection),
}

impl ZoomOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// An in-flight zoom-in request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoomTicket {
    generation: u64,
    year: i32,
    month: u32,
    query: SeriesQuery,
}

impl ZoomTicket {
    /// Query for the daily series of the chosen month.
    pub fn query(&self) -> &SeriesQuery {
        &self.query
    }

    pub fn month(&self) -> (i32, u32) {
        (self.year, self.month)
    }
}

/// Drill-down state for one dashboard.
pub struct ZoomController {
    source: Arc<dyn SeriesSource>,
    cache: Arc<TtlCache<SeriesResponse>>,
    query: SeriesQuery,
    current: ZoomFrame,
    stack: Vec<ZoomFrame>,
    generation: u64,
    pending: Option<u64>,
}

impl ZoomController {
    /// Start at the base level for `query`'s range.
    pub fn new(
        source: Arc<dyn SeriesSource>,
        cache: Arc<TtlCache<SeriesResponse>>,
        query: SeriesQuery,
    ) -> Self {
        let level = ZoomLevel::for_range(&query.range);
        Self {
            source,
            cache,
            query: SeriesQuery {
                granularity: level.granularity(),
                ..query
            },
            current: ZoomFrame::base(level),
            stack: Vec::new(),
            generation: 0,
            pending: None,
        }
    }

    pub fn current_frame(&self) -> &ZoomFrame {
        &self.current
    }

    pub fn level(&self) -> ZoomLevel {
        self.current.level
    }

    /// Query of the base (un-zoomed) series.
    pub fn base_query(&self) -> &SeriesQuery {
        &self.query
    }

    /// Number of zoom-ins not yet undone.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn can_zoom_out(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn can_zoom_in(&self) -> bool {
        self.current.level == ZoomLevel::Month
    }

    /// True while a zoom-in ticket is outstanding and still current.
    pub fn is_loading(&self) -> bool {
        self.pending == Some(self.generation)
    }

    /// Reopen at the base level for `range`, dropping history and context.
    pub fn reset(&mut self, range: DateRange) {
        let level = ZoomLevel::for_range(&range);
        self.query.range = range;
        self.query.granularity = level.granularity();
        self.current = ZoomFrame::base(level);
        self.stack.clear();
        self.invalidate_pending();
        tracing::debug!(?level, span_days = range.span_days(), "zoom reset");
    }

    /// Reset for a new filter selection.
    pub fn rebase(&mut self, query: SeriesQuery) {
        let range = query.range;
        self.query = query;
        self.reset(range);
    }

    /// Restore the frame that was current before the last zoom-in.
    pub fn zoom_out(&mut self) -> ZoomOutcome {
        match self.stack.pop() {
            Some(previous) => {
                self.current = previous;
                self.invalidate_pending();
                ZoomOutcome::Applied
            }
            None => ZoomOutcome::Ignored(ZoomRejection::NothingToUndo),
        }
    }

    /// Resolve `index` against the displayed base series and issue a ticket.
    pub fn begin_zoom_in(
        &mut self,
        index: usize,
        displayed: &SeriesResponse,
    ) -> Result<ZoomTicket, ZoomRejection> {
        if self.current.level != ZoomLevel::Month {
            return Err(ZoomRejection::AlreadyAtDay);
        }
        let point = displayed
            .points
            .get(index)
            .ok_or(ZoomRejection::IndexOutOfRange {
                index,
                len: displayed.points.len(),
            })?;
        let (year, month) = (point.bucket.year, point.bucket.month);
        let month_range =
            DateRange::month(year, month).ok_or(ZoomRejection::InvalidMonth { year, month })?;
        let range = month_range.intersect(&self.query.range).unwrap_or(month_range);

        self.generation += 1;
        self.pending = Some(self.generation);
        Ok(ZoomTicket {
            generation: self.generation,
            year,
            month,
            query: self.query.narrowed(Granularity::Day, range),
        })
    }

    /// Apply the daily series fetched for `ticket`.
    ///
    /// A superseded ticket is ignored whatever its result. A failed fetch
    /// leaves the current frame and history untouched.
    pub fn complete_zoom_in(
        &mut self,
        ticket: ZoomTicket,
        fetched: Result<SeriesResponse, NetworkError>,
    ) -> Result<ZoomOutcome, NetworkError> {
        if ticket.generation != self.generation || self.current.level != ZoomLevel::Month {
            tracing::debug!(year = ticket.year, month = ticket.month, "discarding stale zoom response");
            return Ok(ZoomOutcome::Ignored(ZoomRejection::Superseded));
        }
        self.pending = None;
        let daily = fetched?;
        let previous = std::mem::replace(
            &mut self.current,
            ZoomFrame {
                level: ZoomLevel::Day,
                context: Some(ZoomContext {
                    year: ticket.year,
                    month: ticket.month,
                    daily,
                }),
            },
        );
        self.stack.push(previous);
        Ok(ZoomOutcome::Applied)
    }

    /// Zoom into the month at `index` of the displayed base series.
    ///
    /// The base series is read from the cache; if it has expired it is
    /// fetched again (without writing it back).
    pub async fn zoom_in(&mut self, index: usize) -> Result<ZoomOutcome, NetworkError> {
        if !self.can_zoom_in() {
            return Ok(ZoomOutcome::Ignored(ZoomRejection::AlreadyAtDay));
        }
        let key = CacheKey::for_query(&self.query);
        let displayed = match self.cache.get(key.as_str()) {
            Some(series) => series,
            None => self.source.fetch_series(&self.query).await?,
        };
        let ticket = match self.begin_zoom_in(index, &displayed) {
            Ok(ticket) => ticket,
            Err(rejection) => return Ok(ZoomOutcome::Ignored(rejection)),
        };
        let fetched = self.source.fetch_series(ticket.query()).await;
        if let Err(err) = &fetched {
            tracing::warn!(error = %err, year = ticket.year, month = ticket.month, "daily series fetch failed");
        }
        self.complete_zoom_in(ticket, fetched)
    }

    fn invalidate_pending(&mut self) {
        self.generation += 1;
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use polisa_core::{PeriodBucket, SeriesPoint};

    struct NoSource;

    #[async_trait]
    impl SeriesSource for NoSource {
        async fn fetch_series(&self, _query: &SeriesQuery) -> Result<SeriesResponse, NetworkError> {
            Err(NetworkError::Transport {
                endpoint: "/series".to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        )
        .unwrap()
    }

    fn controller(range: DateRange) -> ZoomController {
        ZoomController::new(
            Arc::new(NoSource),
            Arc::new(TtlCache::default()),
            SeriesQuery::new("production", Granularity::Month, range),
        )
    }

    fn monthly() -> SeriesResponse {
        SeriesResponse {
            granularity: Granularity::Month,
            points: (1..=6)
                .map(|m| SeriesPoint {
                    bucket: PeriodBucket::month(2024, m),
                    label: format!("2024-{:02}", m),
                    metrics: Default::default(),
                })
                .collect(),
        }
    }

    #[test]
    fn base_level_follows_span() {
        assert_eq!(controller(range((2024, 1, 1), (2024, 1, 31))).level(), ZoomLevel::Day);
        assert_eq!(controller(range((2024, 1, 1), (2024, 6, 30))).level(), ZoomLevel::Month);
    }

    #[test]
    fn ticket_targets_clicked_month_within_range() {
        let mut zoom = controller(range((2024, 1, 15), (2024, 6, 30)));
        let ticket = zoom.begin_zoom_in(0, &monthly()).unwrap();
        assert_eq!(ticket.month(), (2024, 1));
        assert_eq!(ticket.query().granularity, Granularity::Day);
        assert_eq!(ticket.query().range, range((2024, 1, 15), (2024, 1, 31)));
        assert!(zoom.is_loading());
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let mut zoom = controller(range((2024, 1, 1), (2024, 6, 30)));
        assert_eq!(
            zoom.begin_zoom_in(9, &monthly()),
            Err(ZoomRejection::IndexOutOfRange { index: 9, len: 6 })
        );
        assert!(!zoom.is_loading());
    }

    #[test]
    fn stale_ticket_is_discarded_after_reset() {
        let mut zoom = controller(range((2024, 1, 1), (2024, 6, 30)));
        let ticket = zoom.begin_zoom_in(2, &monthly()).unwrap();
        zoom.reset(range((2024, 1, 1), (2024, 12, 31)));
        let outcome = zoom
            .complete_zoom_in(ticket, Ok(SeriesResponse::empty(Granularity::Day)))
            .unwrap();
        assert_eq!(outcome, ZoomOutcome::Ignored(ZoomRejection::Superseded));
        assert_eq!(zoom.depth(), 0);
        assert_eq!(zoom.level(), ZoomLevel::Month);
    }

    #[test]
    fn newer_ticket_wins() {
        let mut zoom = controller(range((2024, 1, 1), (2024, 6, 30)));
        let first = zoom.begin_zoom_in(1, &monthly()).unwrap();
        let second = zoom.begin_zoom_in(4, &monthly()).unwrap();
        let stale = zoom
            .complete_zoom_in(first, Ok(SeriesResponse::empty(Granularity::Day)))
            .unwrap();
        assert!(!stale.is_applied());
        let applied = zoom
            .complete_zoom_in(second, Ok(SeriesResponse::empty(Granularity::Day)))
            .unwrap();
        assert!(applied.is_applied());
        let context = zoom.current_frame().context.as_ref().unwrap();
        assert_eq!((context.year, context.month), (2024, 5));
    }

    #[test]
    fn failed_fetch_keeps_prior_frame() {
        let mut zoom = controller(range((2024, 1, 1), (2024, 6, 30)));
        let before = zoom.current_frame().clone();
        let ticket = zoom.begin_zoom_in(2, &monthly()).unwrap();
        let err = NetworkError::Transport {
            endpoint: "/series".to_string(),
            reason: "timeout".to_string(),
        };
        assert!(zoom.complete_zoom_in(ticket, Err(err)).is_err());
        assert_eq!(zoom.current_frame(), &before);
        assert_eq!(zoom.depth(), 0);
        assert!(!zoom.is_loading());
    }

    #[test]
    fn zoom_out_on_empty_stack_is_noop() {
        let mut zoom = controller(range((2024, 1, 1), (2024, 6, 30)));
        let before = zoom.current_frame().clone();
        assert_eq!(zoom.zoom_out(), ZoomOutcome::Ignored(ZoomRejection::NothingToUndo));
        assert_eq!(zoom.current_frame(), &before);
    }

    #[tokio::test]
    async fn zoom_in_at_day_is_ignored_without_fetching() {
        let mut zoom = controller(range((2024, 1, 1), (2024, 1, 31)));
        let outcome = zoom.zoom_in(0).await.unwrap();
        assert_eq!(outcome, ZoomOutcome::Ignored(ZoomRejection::AlreadyAtDay));
    }
}
