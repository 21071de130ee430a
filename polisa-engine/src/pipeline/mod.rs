//! Filter → sort → paginate over an in-memory record set.
//!
//! Every list page (captured policies, my policies, the transfer pool)
//! holds one [`ListView`]: the records it fetched plus a [`PipelineState`].
//! Each run copies the records into a fresh sequence, so stages never
//! share a mutable alias.

pub mod comparator;
pub mod filter;
pub mod paginate;

pub use comparator::{compare_records, compare_values, natural_cmp, FieldKind, SortDirection};
pub use filter::{FilterConfig, DEFAULT_SEARCH_KEY};
pub use paginate::{paginate, total_pages, PageResult};

use polisa_core::{Record, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// What the user has chosen on a list page.
///
/// Changing filters or sort sends the page back to 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    pub filters: BTreeMap<String, String>,
    pub sort: Option<SortState>,
    pub pagination: Pagination,
}

impl PipelineState {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            pagination: Pagination {
                page: 1,
                page_size: page_size.max(1),
            },
            ..Self::default()
        }
    }

    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.filters.insert(key.into(), value.into());
        self.pagination.page = 1;
    }

    pub fn clear_filter(&mut self, key: &str) {
        self.filters.remove(key);
        self.pagination.page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.pagination.page = 1;
    }

    pub fn set_sort(&mut self, field: impl Into<String>, direction: SortDirection) {
        self.sort = Some(SortState::new(field, direction));
        self.pagination.page = 1;
    }

    /// Header-click behaviour: same field flips direction, a new field starts ascending.
    pub fn toggle_sort(&mut self, field: &str) {
        let direction = match &self.sort {
            Some(current) if current.field == field => current.direction.flipped(),
            _ => SortDirection::Asc,
        };
        self.set_sort(field, direction);
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
        self.pagination.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.pagination.page = page.max(1);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.pagination.page_size = page_size.max(1);
        self.pagination.page = 1;
    }
}

/// Stateless filter/sort/paginate configured for one page's fields.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    filter: FilterConfig,
    kinds: HashMap<String, FieldKind>,
}

impl Pipeline {
    pub fn new(filter: FilterConfig) -> Self {
        Self {
            filter,
            kinds: HashMap::new(),
        }
    }

    /// Declare how a field is compared when sorting.
    pub fn with_kind(mut self, field: impl Into<String>, kind: FieldKind) -> Self {
        self.kinds.insert(field.into(), kind);
        self
    }

    pub fn filter_config(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn kind_of(&self, field: &str) -> FieldKind {
        self.kinds.get(field).copied().unwrap_or_default()
    }

    pub fn filter(&self, records: &[Record], filters: &BTreeMap<String, String>) -> Vec<Record> {
        self.filter.apply(records, filters)
    }

    /// Stable sort; equal keys keep their relative order.
    ///
    /// A field without a declared kind is read as the type most of its
    /// values have, so stray unparsable text sorts with the nulls.
    pub fn sort(&self, mut records: Vec<Record>, sort: Option<&SortState>) -> Vec<Record> {
        if let Some(sort) = sort {
            let kind = match self.kind_of(&sort.field) {
                FieldKind::Auto => FieldKind::infer(records.iter().map(|r| r.get(&sort.field))),
                declared => declared,
            };
            records.sort_by(|a, b| compare_records(a, b, &sort.field, kind, sort.direction));
        }
        records
    }

    pub fn run(&self, records: &[Record], state: &PipelineState) -> PageResult<Record> {
        let filtered = self.filter(records, &state.filters);
        let sorted = self.sort(filtered, state.sort.as_ref());
        paginate(&sorted, state.pagination.page, state.pagination.page_size)
    }
}

/// One list page: its records, its pipeline and the user's current choices.
#[derive(Debug, Clone)]
pub struct ListView {
    pipeline: Pipeline,
    records: Vec<Record>,
    state: PipelineState,
}

impl ListView {
    pub fn new(pipeline: Pipeline, state: PipelineState) -> Self {
        Self {
            pipeline,
            records: Vec::new(),
            state,
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Run the pipeline and store the clamped page number back into the state.
    pub fn run(&mut self) -> PageResult<Record> {
        let result = self.pipeline.run(&self.records, &self.state);
        self.state.pagination.page = result.current_page;
        result
    }

    pub fn replace_all(&mut self, records: Vec<Record>) -> PageResult<Record> {
        self.records = records;
        self.run()
    }

    /// Insert or replace the record with the same id.
    pub fn upsert(&mut self, record: Record) -> PageResult<Record> {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        self.run()
    }

    pub fn remove(&mut self, id: &RecordId) -> PageResult<Record> {
        self.records.retain(|r| &r.id != id);
        self.run()
    }

    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<String>) -> PageResult<Record> {
        self.state.set_filter(key, value);
        self.run()
    }

    pub fn clear_filters(&mut self) -> PageResult<Record> {
        self.state.clear_filters();
        self.run()
    }

    pub fn set_sort(&mut self, field: impl Into<String>, direction: SortDirection) -> PageResult<Record> {
        self.state.set_sort(field, direction);
        self.run()
    }

    pub fn toggle_sort(&mut self, field: &str) -> PageResult<Record> {
        self.state.toggle_sort(field);
        self.run()
    }

    pub fn go_to_page(&mut self, page: usize) -> PageResult<Record> {
        self.state.set_page(page);
        self.run()
    }

    pub fn set_page_size(&mut self, page_size: usize) -> PageResult<Record> {
        self.state.set_page_size(page_size);
        self.run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polisa_core::FieldValue;

    fn pool() -> Vec<Record> {
        vec![
            Record::new(1).with_field("policyNo", "Item 10").with_field("premium", 300.0),
            Record::new(2).with_field("policyNo", "Item 2").with_field("premium", FieldValue::Null),
            Record::new(3).with_field("policyNo", "item 2").with_field("premium", 100.0),
            Record::new(4).with_field("policyNo", "Item 1").with_field("premium", 200.0),
        ]
    }

    fn ids(page: &PageResult<Record>) -> Vec<String> {
        page.items.iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let pipeline = Pipeline::default();
        let mut state = PipelineState::default();
        state.set_sort("policyNo", SortDirection::Asc);
        let page = pipeline.run(&pool(), &state);
        assert_eq!(ids(&page), vec!["4", "2", "3", "1"]);
    }

    #[test]
    fn desc_keeps_nulls_last() {
        let pipeline = Pipeline::default().with_kind("premium", FieldKind::Number);
        let mut state = PipelineState::default();
        state.set_sort("premium", SortDirection::Desc);
        let page = pipeline.run(&pool(), &state);
        assert_eq!(ids(&page), vec!["1", "4", "3", "2"]);
    }

    #[test]
    fn filter_or_sort_change_resets_page() {
        let mut state = PipelineState::with_page_size(2);
        state.set_page(2);
        state.set_filter("branch", "Kadikoy");
        assert_eq!(state.pagination.page, 1);
        state.set_page(3);
        state.toggle_sort("premium");
        assert_eq!(state.pagination.page, 1);
        state.toggle_sort("premium");
        assert_eq!(state.sort.as_ref().map(|s| s.direction), Some(SortDirection::Desc));
    }

    #[test]
    fn list_view_clamps_page_after_shrinking() {
        let mut view = ListView::new(Pipeline::default(), PipelineState::with_page_size(2));
        view.replace_all(pool());
        let page = view.go_to_page(2);
        assert_eq!(page.current_page, 2);
        view.remove(&RecordId::Int(1));
        let page = view.remove(&RecordId::Int(2));
        assert_eq!(page.current_page, 1);
        assert_eq!(view.state().pagination.page, 1);
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut view = ListView::new(Pipeline::default(), PipelineState::default());
        view.replace_all(pool());
        let page = view.upsert(Record::new(2).with_field("policyNo", "Item 99"));
        assert_eq!(page.total_items, 4);
        let updated = view.records().iter().find(|r| r.id == RecordId::Int(2)).unwrap();
        assert_eq!(updated.get("policyNo").as_text(), Some("Item 99"));
    }
}
