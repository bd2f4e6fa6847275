use std::path::PathBuf;

use serde::Serialize;

use super::dedup::{DedupPolicy, IdField};

// Plan envelope types
#[derive(Serialize)]
pub struct FetchPlanView {
    pub endpoint: String,
    pub page_size: u32,
    pub first_page: u32,
    pub reported_total: u64,
    pub total_pages: u32,
    pub pages: Vec<u32>,
    pub first_page_items: usize,
    pub output: PathBuf,
    pub id_field: IdField,
    pub keep: DedupPolicy,
}

// Apply/result envelope types
#[derive(Serialize)]
pub struct DuplicateCounts { pub within_pages: usize, pub across_pages: usize, pub removed: usize, pub unkeyed: usize }

#[derive(Serialize)]
pub struct FetchReport {
    pub endpoint: String,
    pub output: PathBuf,
    pub reported_total: u64,
    pub max_reported_total: u64,
    pub collected: u64,
    pub total_pages: u32,
    pub pages_fetched: usize,
    pub retries: u32,
    pub failed_pages: Vec<u32>,
    pub skipped_pages: Vec<u32>,
    pub misnumbered_pages: Vec<u32>,
    pub duplicates: DuplicateCounts,
    pub complete: bool,
}
