use std::ops::Range;

use serde::Serialize;

pub const PAGE_SIZE: usize = 18;
pub const VISIBLE_PAGES: usize = 5;

pub fn page_count(items: usize, page_size: usize) -> usize {
    if page_size == 0 { 0 } else { items.div_ceil(page_size) }
}

/// Clamp to `[1, page_count]`; an empty listing still has page 1.
pub fn clamp_page(page: usize, items: usize, page_size: usize) -> usize {
    page.clamp(1, page_count(items, page_size).max(1))
}

/// Index range of `page` (1-based) within the filtered list.
pub fn page_range(page: usize, items: usize, page_size: usize) -> Range<usize> {
    let page = clamp_page(page, items, page_size);
    let start = ((page - 1) * page_size).min(items);
    start..(start + page_size).min(items)
}

/// Up to `VISIBLE_PAGES` page numbers around `current`, shifted to stay within bounds.
pub fn window(current: usize, total_pages: usize) -> Vec<usize> {
    if total_pages == 0 { return Vec::new(); }
    let mut start = current.saturating_sub(VISIBLE_PAGES / 2).max(1);
    let end = (start + VISIBLE_PAGES - 1).min(total_pages);
    if end + 1 - start < VISIBLE_PAGES {
        start = (end + 1).saturating_sub(VISIBLE_PAGES).max(1);
    }
    (start..=end).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageInfo {
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    /// 1-based bounds of the visible slice; both 0 when nothing matches.
    pub first: usize,
    pub last: usize,
    pub total: usize,
    pub window: Vec<usize>,
}

impl PageInfo {
    pub fn new(page: usize, items: usize, page_size: usize) -> Self {
        let page = clamp_page(page, items, page_size);
        let range = page_range(page, items, page_size);
        let total_pages = page_count(items, page_size);
        PageInfo {
            page,
            total_pages,
            page_size,
            first: if range.is_empty() { 0 } else { range.start + 1 },
            last: range.end,
            total: items,
            window: window(page, total_pages),
        }
    }

    pub fn label(&self) -> String {
        format!("Showing {}-{} of {} courses", self.first, self.last, self.total)
    }
}
