//! Page slicing.

use serde::{Deserialize, Serialize};

/// One page of a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> PageResult<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }
}

/// Number of pages for `total_items`. Never less than one.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    total_items.div_ceil(page_size).max(1)
}

/// Clamp `page` into `[1, total_pages]` and return that page's items.
///
/// An empty input yields an empty page 1 of 1.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> PageResult<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_pages(total_items, page_size);
    let current_page = page.clamp(1, total_pages);
    let start = ((current_page - 1) * page_size).min(total_items);
    let end = (start + page_size).min(total_items);
    PageResult {
        items: items[start..end].to_vec(),
        current_page,
        total_pages,
        total_items,
    }
}
