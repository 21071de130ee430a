//! Record filtering.

use polisa_core::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::comparator::fold_case;

/// Filter key that triggers free-text search instead of an exact match.
pub const DEFAULT_SEARCH_KEY: &str = "search";

/// Which fields a page searches, and under which filter key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub search_key: String,
    /// Fields joined into the synthesized search string, in order.
    pub searchable_fields: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            search_key: DEFAULT_SEARCH_KEY.to_string(),
            searchable_fields: Vec::new(),
        }
    }
}

impl FilterConfig {
    pub fn searching<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            searchable_fields: fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Lowercased text that free-text search runs against.
    pub fn search_text(&self, record: &Record) -> String {
        let parts: Vec<String> = self
            .searchable_fields
            .iter()
            .filter_map(|field| record.get(field).display_text())
            .collect();
        fold_case(&parts.join(" "))
    }

    /// True when `record` satisfies every non-empty filter.
    ///
    /// The search key matches case-insensitively anywhere in the search text;
    /// every other key must equal the field's display text exactly.
    pub fn matches(&self, record: &Record, filters: &BTreeMap<String, String>) -> bool {
        filters.iter().all(|(key, wanted)| {
            let wanted = wanted.trim();
            if wanted.is_empty() {
                return true;
            }
            if *key == self.search_key {
                return self.search_text(record).contains(&fold_case(wanted));
            }
            record
                .get(key)
                .display_text()
                .is_some_and(|actual| actual == wanted)
        })
    }

    /// Records passing [`FilterConfig::matches`], copied into a new sequence.
    pub fn apply(&self, records: &[Record], filters: &BTreeMap<String, String>) -> Vec<Record> {
        records
            .iter()
            .filter(|record| self.matches(record, filters))
            .cloned()
            .collect()
    }
}
