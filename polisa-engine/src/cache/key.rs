//! Deterministic cache keys for dashboard queries.

use chrono::NaiveDate;
use polisa_core::SeriesQuery;
use std::fmt;

const SEGMENT_SEPARATOR: char = '|';
const ID_SEPARATOR: char = ',';

/// Cache key derived from mode, date range and filter id lists.
///
/// Id lists are sorted before they are joined, so two selections holding
/// the same ids in a different order produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from its parts. Each id list is sorted ascending.
    pub fn build<I, L>(mode: &str, start: NaiveDate, end: NaiveDate, id_lists: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[i64]>,
    {
        let mut key = String::with_capacity(64);
        key.push_str(mode);
        key.push(SEGMENT_SEPARATOR);
        key.push_str(&start.format("%Y-%m-%d").to_string());
        key.push(SEGMENT_SEPARATOR);
        key.push_str(&end.format("%Y-%m-%d").to_string());
        for ids in id_lists {
            let mut sorted = ids.as_ref().to_vec();
            sorted.sort_unstable();
            key.push(SEGMENT_SEPARATOR);
            let joined: Vec<String> = sorted.iter().map(i64::to_string).collect();
            key.push_str(&joined.join(&ID_SEPARATOR.to_string()));
        }
        Self(key)
    }

    /// Key for a series query. The mode segment carries the granularity and
    /// the list names so that `branchIds=[1]` and `companyIds=[1]` differ.
    /// Repeated ids collapse, matching what the request sends.
    pub fn for_query(query: &SeriesQuery) -> Self {
        let filters = query.filters.normalized();
        let names: Vec<&str> = filters.lists().map(|(name, _)| name).collect();
        let mode = format!("{}:{}[{}]", query.mode, query.granularity, names.join(","));
        Self::build(
            &mode,
            query.range.start(),
            query.range.end(),
            filters.lists().map(|(_, ids)| ids),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polisa_core::{DateRange, FilterSelection, Granularity};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn selection_order_does_not_change_key() {
        let a = CacheKey::build("production", date(2024, 1, 1), date(2024, 6, 30), [vec![3i64, 1, 2]]);
        let b = CacheKey::build("production", date(2024, 1, 1), date(2024, 6, 30), [vec![1i64, 2, 3]]);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "production|2024-01-01|2024-06-30|1,2,3");
    }

    #[test]
    fn empty_lists_keep_their_slot() {
        let key = CacheKey::build("m", date(2024, 1, 1), date(2024, 1, 2), [Vec::<i64>::new(), vec![5]]);
        assert_eq!(key.as_str(), "m|2024-01-01|2024-01-02||5");
    }

    #[test]
    fn query_keys_distinguish_list_names() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 6, 30)).unwrap();
        let branch = SeriesQuery::new("production", Granularity::Month, range)
            .with_filters(FilterSelection::new().with("branchIds", [1]));
        let company = SeriesQuery::new("production", Granularity::Month, range)
            .with_filters(FilterSelection::new().with("companyIds", [1]));
        assert_ne!(CacheKey::for_query(&branch), CacheKey::for_query(&company));
    }

    #[test]
    fn query_keys_distinguish_granularity() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let monthly = SeriesQuery::new("production", Granularity::Month, range);
        let daily = SeriesQuery::new("production", Granularity::Day, range);
        assert_ne!(CacheKey::for_query(&monthly), CacheKey::for_query(&daily));
    }
}
