use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::util::json::value_text;

/// Which item field carries the record identity.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdField {
    #[default]
    #[value(name = "sku")]
    Sku,
    #[value(name = "id")]
    Id,
}

impl IdField {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sku" => Some(IdField::Sku),
            "id" => Some(IdField::Id),
            _ => None,
        }
    }

    fn names(&self) -> [&'static str; 2] {
        match self {
            IdField::Sku => ["sku", "id"],
            IdField::Id => ["id", "sku"],
        }
    }

    /// Identity of an item: the configured field, falling back to the other one.
    /// Keys carry the field name (`sku:7`, `id:7`) so the two fields never collide.
    pub fn key_of(&self, item: &Value) -> Option<String> {
        self.names()
            .iter()
            .find_map(|name| item.get(*name).and_then(value_text).map(|v| format!("{name}:{v}")))
    }
}

/// Which occurrence wins when an identifier repeats.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupPolicy {
    /// keep the first record seen
    #[default]
    #[value(name = "first")]
    First,
    /// keep the last record seen, at the position of the first
    #[value(name = "last")]
    Last,
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub items: Vec<Value>,
    pub removed: usize,
    pub unkeyed: usize,
}

/// Identifiers occurring more than once in `items`, each reported once, in first-seen order.
pub fn duplicates_within(items: &[Value], id: IdField) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for key in items.iter().filter_map(|it| id.key_of(it)) {
        let n = counts.entry(key.clone()).or_insert(0);
        *n += 1;
        if *n == 2 { order.push(key); }
    }
    order
}

/// Collapse repeated identifiers. Items without an identifier are kept as they are.
pub fn dedup_by_key(items: Vec<Value>, id: IdField, policy: DedupPolicy) -> DedupOutcome {
    let before = items.len();
    let mut slot_of: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Value> = Vec::with_capacity(before);
    let mut unkeyed = 0usize;

    for item in items {
        let Some(key) = id.key_of(&item) else {
            unkeyed += 1;
            out.push(item);
            continue;
        };
        match slot_of.get(&key).copied() {
            Some(slot) => {
                if policy == DedupPolicy::Last { out[slot] = item; }
            }
            None => {
                slot_of.insert(key, out.len());
                out.push(item);
            }
        }
    }

    DedupOutcome { removed: before - out.len(), unkeyed, items: out }
}

/// Identifiers in `items` that are already in `seen`.
pub fn already_seen(items: &[Value], id: IdField, seen: &HashSet<String>) -> Vec<String> {
    items.iter().filter_map(|it| id.key_of(it)).filter(|k| seen.contains(k)).collect()
}
