use anyhow::Result;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::util::json::{value_number, value_text};

pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/400x300?text=No+Image+Available";
pub const UNKNOWN_PROVIDER: &str = "Unknown Provider";

/// Raw credit values are stored in minutes; the view works in hours.
pub const CREDIT_DIVISOR: f64 = 60.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Course {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub provider: String,
    pub category: String,
    pub level: String,
    pub delivery_method: String,
    pub length: String,
    pub credits: String,
    pub qualifications: Vec<String>,
    pub price: f64,
    pub image_url: String,
    pub sku: Option<String>,
    pub url_key: Option<String>,
    pub product_type: Option<String>,
}

impl Course {
    pub fn normalized_credits(&self) -> f64 {
        value_number(&Value::String(self.credits.clone())).map(|c| c / CREDIT_DIVISOR).unwrap_or(0.0)
    }

    pub fn price_label(&self) -> String {
        if self.price > 0.0 { format!("${:.2}", self.price) } else { "Free".to_string() }
    }

    /// Every textual field joined, lowercased; used for jurisdiction matching.
    pub fn haystack(&self) -> String {
        let mut parts: Vec<&str> = [
            &self.title, &self.description, &self.provider, &self.category,
            &self.level, &self.delivery_method, &self.length,
        ].into_iter().map(String::as_str).collect();
        parts.extend(self.qualifications.iter().map(String::as_str));
        parts.join(" ").to_lowercase()
    }

    pub fn matches_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id) || self.sku.as_deref() == Some(id)
    }
}

/// Maps raw snapshot items to `Course`s.
pub struct Shaper {
    tags: Regex,
}

impl Shaper {
    pub fn new() -> Result<Self> {
        Ok(Self { tags: Regex::new(r"<[^>]+>")? })
    }

    pub fn shape(&self, item: &Value) -> Course {
        let text = |key: &str| item.get(key).and_then(value_text);
        let description = item
            .get("short_description")
            .and_then(Value::as_str)
            .map(|d| self.tags.replace_all(d, " ").into_owned())
            .unwrap_or_default();
        let provider = item
            .get("vendor")
            .and_then(|v| v.get("name"))
            .and_then(value_text)
            .unwrap_or_else(|| UNKNOWN_PROVIDER.to_string());

        Course {
            id: text("id"),
            title: item.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
            description,
            provider,
            category: attribute(item, "lcv_fields_of_study_value").unwrap_or_default(),
            level: attribute(item, "lcv_level").unwrap_or_default(),
            delivery_method: attribute(item, "lcv_delivery_method").unwrap_or_default(),
            length: attribute(item, "lcv_length").unwrap_or_default(),
            credits: attribute(item, "lcv_total_credits").unwrap_or_default(),
            qualifications: attribute_values(item, "lcv_program_qualifications"),
            price: item
                .get("prices_unformatted")
                .and_then(|p| p.get("price"))
                .and_then(value_number)
                .unwrap_or(0.0),
            image_url: text("image_url").unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            sku: text("sku"),
            url_key: text("url_key"),
            product_type: text("product_type"),
        }
    }

    pub fn shape_all(&self, items: &[Value]) -> Vec<Course> {
        items.iter().map(|it| self.shape(it)).collect()
    }
}

fn find_attribute<'a>(item: &'a Value, code: &str) -> Option<&'a Value> {
    item.get("attributes")?
        .as_array()?
        .iter()
        .find(|a| a.get("code").and_then(Value::as_str) == Some(code))?
        .get("option_value")
}

fn attribute(item: &Value, code: &str) -> Option<String> {
    find_attribute(item, code).and_then(value_text)
}

// Multi-valued attributes arrive either as an array or a comma separated string.
fn attribute_values(item: &Value, code: &str) -> Vec<String> {
    match find_attribute(item, code) {
        Some(Value::Array(vals)) => vals.iter().filter_map(value_text).collect(),
        Some(v) => value_text(v)
            .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
            .unwrap_or_default(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw() -> Value {
        json!({
            "id": 101,
            "sku": "LCV-101",
            "name": "Ethics for Texas CPAs",
            "short_description": "<p>Covers <b>state</b> rules.</p>",
            "vendor": {"id": 7, "name": "Acme Learning"},
            "prices_unformatted": {"price": 49.5},
            "url_key": "ethics-tx",
            "product_type": "virtual",
            "attributes": [
                {"code": "lcv_fields_of_study_value", "option_value": "Ethics"},
                {"code": "lcv_level", "option_value": "Basic"},
                {"code": "lcv_total_credits", "option_value": "120"},
                {"code": "lcv_program_qualifications", "option_value": "CPE, CLE"}
            ]
        })
    }

    #[test]
    fn shapes_a_full_item() {
        let c = Shaper::new().unwrap().shape(&raw());
        assert_eq!(c.id.as_deref(), Some("101"));
        assert_eq!(c.title, "Ethics for Texas CPAs");
        assert_eq!(c.description.trim(), "Covers  state  rules.");
        assert_eq!(c.provider, "Acme Learning");
        assert_eq!(c.category, "Ethics");
        assert_eq!(c.qualifications, vec!["CPE", "CLE"]);
        assert_eq!(c.price_label(), "$49.50");
        assert_eq!(c.normalized_credits(), 2.0);
        assert_eq!(c.image_url, PLACEHOLDER_IMAGE);
        assert!(c.matches_id("LCV-101"));
        assert!(c.haystack().contains("texas"));
    }

    #[test]
    fn sparse_item_gets_defaults() {
        let c = Shaper::new().unwrap().shape(&json!({"id": "x", "vendor": null, "attributes": null}));
        assert_eq!(c.title, "");
        assert_eq!(c.provider, UNKNOWN_PROVIDER);
        assert_eq!(c.price, 0.0);
        assert_eq!(c.price_label(), "Free");
        assert_eq!(c.normalized_credits(), 0.0);
        assert!(c.qualifications.is_empty());
    }

    #[test]
    fn array_valued_qualifications() {
        let item = json!({"attributes": [{"code": "lcv_program_qualifications", "option_value": ["CPE", "", "NASBA"]}]});
        assert_eq!(Shaper::new().unwrap().shape(&item).qualifications, vec!["CPE", "NASBA"]);
    }
}
