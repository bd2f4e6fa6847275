use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use super::course::Course;
use super::jurisdiction::{mentions, JURISDICTIONS};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

/// Option lists the listing endpoint itself provided, keyed by attribute code.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceFacets {
    pub sponsors: Vec<Value>,
    pub fields_of_study: Vec<Value>,
    pub program_qualifications: Vec<Value>,
}

impl SourceFacets {
    pub fn from_filters(filters: &[Value]) -> Self {
        let items_of = |code: &str| -> Vec<Value> {
            filters
                .iter()
                .find(|f| f.get("attribute_code").and_then(Value::as_str) == Some(code))
                .and_then(|f| f.get("items"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };
        SourceFacets {
            sponsors: items_of("lcv_sponsor"),
            fields_of_study: items_of("lcv_fields_of_study"),
            program_qualifications: items_of("lcv_program_qualifications"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Facets {
    pub categories: Vec<FacetCount>,
    pub qualifications: Vec<FacetCount>,
    pub sponsors: Vec<FacetCount>,
    pub jurisdictions: Vec<FacetCount>,
    pub max_price: f64,
    pub max_credits: f64,
    pub source: SourceFacets,
}

impl Facets {
    pub fn derive(courses: &[Course], filters: &[Value]) -> Self {
        Facets {
            categories: by_name(tally(courses.iter().map(|c| c.category.as_str()))),
            qualifications: by_name(tally(courses.iter().flat_map(|c| c.qualifications.iter().map(String::as_str)))),
            sponsors: by_count(tally(courses.iter().map(|c| c.provider.as_str()))),
            jurisdictions: jurisdiction_counts(courses),
            max_price: courses.iter().map(|c| c.price).fold(0.0, f64::max),
            max_credits: courses.iter().map(Course::normalized_credits).fold(0.0, f64::max),
            source: SourceFacets::from_filters(filters),
        }
    }
}

fn tally<'a>(values: impl Iterator<Item = &'a str>) -> Vec<FacetCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values.map(str::trim).filter(|v| !v.is_empty()) {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts.into_iter().map(|(value, count)| FacetCount { value: value.to_string(), count }).collect()
}

fn by_name(mut v: Vec<FacetCount>) -> Vec<FacetCount> {
    v.sort_by(|a, b| a.value.cmp(&b.value));
    v
}

fn by_count(mut v: Vec<FacetCount>) -> Vec<FacetCount> {
    v.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    v
}

// Every jurisdiction is listed, zero counts included; stable sort keeps list order on ties.
fn jurisdiction_counts(courses: &[Course]) -> Vec<FacetCount> {
    let haystacks: Vec<String> = courses.iter().map(Course::haystack).collect();
    let mut out: Vec<FacetCount> = JURISDICTIONS
        .iter()
        .map(|j| FacetCount {
            value: j.to_string(),
            count: haystacks.iter().filter(|h| mentions(h, j)).count(),
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn course(title: &str, category: &str, provider: &str, quals: &[&str], price: f64, credits: &str) -> Course {
        Course {
            title: title.into(),
            category: category.into(),
            provider: provider.into(),
            qualifications: quals.iter().map(|q| q.to_string()).collect(),
            price,
            credits: credits.into(),
            ..Course::default()
        }
    }

    fn sample() -> Vec<Course> {
        vec![
            course("Texas ethics", "Ethics", "Acme", &["CPE"], 20.0, "60"),
            course("Ohio tax", "Tax", "Acme", &["CPE", "CLE"], 0.0, "150"),
            course("General audit", "Audit", "Beta", &[], 99.0, ""),
            course("Texas audit", "Audit", "Acme", &["CLE"], 10.0, "30"),
        ]
    }

    #[test]
    fn counts_and_orders_facets() {
        let f = Facets::derive(&sample(), &[]);
        assert_eq!(f.categories.iter().map(|c| (c.value.as_str(), c.count)).collect::<Vec<_>>(),
                   vec![("Audit", 2), ("Ethics", 1), ("Tax", 1)]);
        assert_eq!(f.qualifications.iter().map(|c| (c.value.as_str(), c.count)).collect::<Vec<_>>(),
                   vec![("CLE", 2), ("CPE", 2)]);
        assert_eq!(f.sponsors[0], FacetCount { value: "Acme".into(), count: 3 });
        assert_eq!(f.sponsors[1], FacetCount { value: "Beta".into(), count: 1 });
        assert_eq!(f.max_price, 99.0);
        assert_eq!(f.max_credits, 2.5);
    }

    #[test]
    fn jurisdictions_are_all_listed_busiest_first() {
        let f = Facets::derive(&sample(), &[]);
        assert_eq!(f.jurisdictions.len(), JURISDICTIONS.len());
        assert_eq!(f.jurisdictions[0], FacetCount { value: "Texas".into(), count: 2 });
        assert_eq!(f.jurisdictions[1], FacetCount { value: "Ohio".into(), count: 1 });
        assert_eq!(f.jurisdictions[2].count, 0);
    }

    #[test]
    fn empty_catalog_has_zero_ranges() {
        let f = Facets::derive(&[], &[]);
        assert!(f.categories.is_empty());
        assert_eq!(f.max_price, 0.0);
        assert_eq!(f.max_credits, 0.0);
    }

    #[test]
    fn source_facets_pick_known_attribute_codes() {
        let filters = vec![
            json!({"attribute_code": "lcv_sponsor", "items": [{"label": "Acme", "value": "1"}]}),
            json!({"attribute_code": "lcv_program_qualifications", "items": null}),
            json!({"attribute_code": "price", "items": [{"label": "0-10"}]}),
        ];
        let s = SourceFacets::from_filters(&filters);
        assert_eq!(s.sponsors.len(), 1);
        assert!(s.fields_of_study.is_empty());
        assert!(s.program_qualifications.is_empty());
    }
}
