//! Date ranges and id-list filter selections used by dashboard queries.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationError;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct UncheckedRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<UncheckedRange> for DateRange {
    type Error = ValidationError;

    fn try_from(raw: UncheckedRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// The whole calendar month. `None` for an invalid year/month pair.
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let end = next.pred_opt()?;
        Some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Days between start and end. 2024-01-01..2024-01-31 spans 30.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(DateRange { start, end })
    }

    /// (year, month) of every calendar month the range touches, in order.
    pub fn months(&self) -> Vec<(i32, u32)> {
        let mut months = Vec::new();
        let (mut year, mut month) = (self.start.year(), self.start.month());
        let last = (self.end.year(), self.end.month());
        loop {
            months.push((year, month));
            if (year, month) == last {
                break;
            }
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }
        months
    }
}

/// Named id lists chosen in the dashboard filter dropdowns
/// (branch ids, company ids, employee ids).
///
/// Lists are kept in insertion order; anything that needs a canonical form
/// (cache keys, equality) goes through [`FilterSelection::normalized`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    lists: BTreeMap<String, Vec<i64>>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, ids: impl IntoIterator<Item = i64>) -> Self {
        self.set(name, ids);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, ids: impl IntoIterator<Item = i64>) {
        self.lists.insert(name.into(), ids.into_iter().collect());
    }

    pub fn ids(&self, name: &str) -> &[i64] {
        self.lists.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Lists in name order.
    pub fn lists(&self) -> impl Iterator<Item = (&str, &[i64])> {
        self.lists.iter().map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.lists.values().all(Vec::is_empty)
    }

    /// Copy with every list sorted ascending and deduplicated.
    pub fn normalized(&self) -> Self {
        let lists = self
            .lists
            .iter()
            .map(|(name, ids)| {
                let mut ids = ids.clone();
                ids.sort_unstable();
                ids.dedup();
                (name.clone(), ids)
            })
            .collect();
        Self { lists }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(DateRange::new(date(2024, 2, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn deserialized_ranges_are_checked() {
        let range: DateRange =
            serde_json::from_str(r#"{"start": "2024-01-01", "end": "2024-06-30"}"#).unwrap();
        assert_eq!(range.span_days(), 181);

        let err = serde_json::from_str::<DateRange>(r#"{"start": "2024-02-01", "end": "2024-01-01"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("2024-02-01"));
    }

    #[test]
    fn span_counts_days_between_endpoints() {
        let january = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(january.span_days(), 30);
        let half_year = DateRange::new(date(2024, 1, 1), date(2024, 6, 30)).unwrap();
        assert_eq!(half_year.span_days(), 181);
    }

    #[test]
    fn month_handles_leap_february_and_december() {
        let feb = DateRange::month(2024, 2).unwrap();
        assert_eq!(feb.end(), date(2024, 2, 29));
        let dec = DateRange::month(2023, 12).unwrap();
        assert_eq!(dec.end(), date(2023, 12, 31));
        assert!(DateRange::month(2024, 13).is_none());
    }

    #[test]
    fn months_walks_across_year_boundary() {
        let range = DateRange::new(date(2023, 11, 15), date(2024, 2, 3)).unwrap();
        assert_eq!(range.months(), vec![(2023, 11), (2023, 12), (2024, 1), (2024, 2)]);
    }

    #[test]
    fn normalized_selection_ignores_order() {
        let a = FilterSelection::new().with("branchIds", [3, 1, 2]);
        let b = FilterSelection::new().with("branchIds", [1, 2, 3]);
        assert_ne!(a, b);
        assert_eq!(a.normalized(), b.normalized());
    }
}
