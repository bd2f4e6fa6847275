use serde::Serialize;

use super::course::Course;
use super::jurisdiction::course_mentions_any;

/// Conjunction of every active criterion. Empty lists and unset/zero bounds are inactive.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogFilter {
    pub search: String,
    pub categories: Vec<String>,
    pub qualifications: Vec<String>,
    pub sponsors: Vec<String>,
    pub jurisdictions: Vec<String>,
    pub max_price: Option<f64>,
    pub min_credits: Option<f64>,
}

impl CatalogFilter {
    pub fn is_empty(&self) -> bool {
        *self == CatalogFilter::default()
    }

    fn search_matches(&self, c: &Course) -> bool {
        let term = self.search.trim();
        if term.is_empty() { return true; }
        let lower = term.to_lowercase();
        c.title.to_lowercase().contains(&lower) || c.description.to_lowercase().contains(&lower)
    }

    pub fn matches(&self, c: &Course) -> bool {
        self.search_matches(c)
            && (self.categories.is_empty() || self.categories.iter().any(|x| *x == c.category))
            && (self.qualifications.is_empty() || c.qualifications.iter().any(|q| self.qualifications.contains(q)))
            && (self.sponsors.is_empty() || self.sponsors.iter().any(|s| *s == c.provider))
            && (self.jurisdictions.is_empty() || course_mentions_any(c, &self.jurisdictions))
            && active(self.max_price).is_none_or(|max| c.price <= max)
            && active(self.min_credits).is_none_or(|min| c.normalized_credits() >= min)
    }

    pub fn apply<'a>(&self, courses: &'a [Course]) -> Vec<&'a Course> {
        courses.iter().filter(|c| self.matches(c)).collect()
    }
}

fn active(bound: Option<f64>) -> Option<f64> {
    bound.filter(|b| *b > 0.0)
}
