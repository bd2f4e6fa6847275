use crate::snapshot::Snapshot;

use super::course::{Course, Shaper};
use super::facets::Facets;
use super::filter::CatalogFilter;
use super::paginate::{clamp_page, page_range, PageInfo, PAGE_SIZE};

pub const LOAD_ERROR_MESSAGE: &str = "Unable to load course data.";

/// In-memory catalog state: courses, derived facets, the active filter and page.
#[derive(Debug, Clone)]
pub struct CatalogView {
    courses: Vec<Course>,
    facets: Facets,
    filter: CatalogFilter,
    page: usize,
    page_size: usize,
    error: Option<String>,
}

impl CatalogView {
    pub fn from_snapshot(snapshot: &Snapshot, shaper: &Shaper) -> Self {
        let courses = shaper.shape_all(&snapshot.items);
        let facets = Facets::derive(&courses, &snapshot.filters);
        CatalogView { courses, facets, filter: CatalogFilter::default(), page: 1, page_size: PAGE_SIZE, error: None }
    }

    /// Empty catalog carrying the user-facing load failure message.
    pub fn unavailable() -> Self {
        CatalogView {
            courses: Vec::new(),
            facets: Facets::default(),
            filter: CatalogFilter::default(),
            page: 1,
            page_size: PAGE_SIZE,
            error: Some(LOAD_ERROR_MESSAGE.to_string()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn error(&self) -> Option<&str> { self.error.as_deref() }
    pub fn courses(&self) -> &[Course] { &self.courses }
    pub fn facets(&self) -> &Facets { &self.facets }
    pub fn filter(&self) -> &CatalogFilter { &self.filter }

    /// Any change to the criteria sends the view back to page 1.
    pub fn set_filter(&mut self, filter: CatalogFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.page = 1;
        }
    }

    pub fn set_search(&mut self, term: &str) {
        let next = CatalogFilter { search: term.to_string(), ..self.filter.clone() };
        self.set_filter(next);
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = clamp_page(page, self.filtered().len(), self.page_size);
    }

    pub fn page(&self) -> usize { self.page }

    pub fn filtered(&self) -> Vec<&Course> {
        self.filter.apply(&self.courses)
    }

    pub fn visible(&self) -> Vec<&Course> {
        let filtered = self.filtered();
        let range = page_range(self.page, filtered.len(), self.page_size);
        filtered[range].to_vec()
    }

    pub fn page_info(&self) -> PageInfo {
        PageInfo::new(self.page, self.filtered().len(), self.page_size)
    }

    pub fn find(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.matches_id(id))
    }
}
