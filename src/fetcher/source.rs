use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::util::json::null_as_default;

use super::config::FetchConfig;

/// One page of the remote listing. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<Value>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub current_page: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: Vec<Value>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("http error: {0}")]
    Http(reqwest::Error),
    #[error("endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() { FetchError::Timeout } else { FetchError::Http(err) }
    }
}

#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<ListingPage, FetchError>;
}

pub struct HttpListingSource {
    http: HttpClient,
    endpoint: Url,
    page_param: String,
    page_size_param: String,
    extra_params: Vec<(String, String)>,
}

impl HttpListingSource {
    pub fn new(cfg: &FetchConfig) -> anyhow::Result<Self> {
        let http = HttpClient::builder().timeout(cfg.timeout).build()?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint_url()?,
            page_param: cfg.page_param.clone(),
            page_size_param: cfg.page_size_param.clone(),
            extra_params: cfg.extra_params.clone(),
        })
    }

    fn query(&self, page: u32, page_size: u32) -> Vec<(String, String)> {
        let mut q = self.extra_params.clone();
        q.push((self.page_size_param.clone(), page_size.to_string()));
        q.push((self.page_param.clone(), page.to_string()));
        q
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<ListingPage, FetchError> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&self.query(page, page_size))
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(FetchError::from_reqwest)?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(FetchError::Status { status, body: truncate_body(&body) });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

// Keep logs readable; error pages can be whole HTML documents.
fn truncate_body(body: &str) -> String {
    const MAX: usize = 400;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    /// In-memory listing of `total` items named `C-0001`.. served in pages,
    /// with scripted failures and empty responses per page index.
    pub struct ScriptedSource {
        items: Vec<Value>,
        reported_total: u64,
        first_page: u32,
        failures: Mutex<HashMap<u32, u32>>,
        empties: Mutex<HashMap<u32, u32>>,
        overrides: HashMap<u32, Vec<Value>>,
        totals: HashMap<u32, u64>,
        answered_as: HashMap<u32, u64>,
        calls: Mutex<Vec<u32>>,
    }

    pub fn course(n: usize) -> Value {
        json!({"sku": format!("C-{n:04}"), "id": n, "name": format!("Course {n}")})
    }

    impl ScriptedSource {
        pub fn catalog(total: usize, first_page: u32) -> Self {
            Self {
                items: (1..=total).map(course).collect(),
                reported_total: total as u64,
                first_page,
                failures: Mutex::new(HashMap::new()),
                empties: Mutex::new(HashMap::new()),
                overrides: HashMap::new(),
                totals: HashMap::new(),
                answered_as: HashMap::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn fail_times(self, page: u32, n: u32) -> Self {
            self.failures.lock().unwrap().insert(page, n);
            self
        }

        pub fn empty_times(self, page: u32, n: u32) -> Self {
            self.empties.lock().unwrap().insert(page, n);
            self
        }

        pub fn with_page(mut self, page: u32, items: Vec<Value>) -> Self {
            self.overrides.insert(page, items);
            self
        }

        /// Report a different `total` on this page.
        pub fn total_on(mut self, page: u32, total: u64) -> Self {
            self.totals.insert(page, total);
            self
        }

        /// Label this page's response with another `current_page`.
        pub fn answer_as(mut self, page: u32, current_page: u64) -> Self {
            self.answered_as.insert(page, current_page);
            self
        }

        pub fn calls(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }

        fn take(map: &Mutex<HashMap<u32, u32>>, page: u32) -> bool {
            let mut map = map.lock().unwrap();
            match map.get_mut(&page) {
                Some(n) if *n > 0 => { *n -= 1; true }
                _ => false,
            }
        }
    }

    #[async_trait]
    impl ListingSource for ScriptedSource {
        async fn fetch_page(&self, page: u32, page_size: u32) -> Result<ListingPage, FetchError> {
            self.calls.lock().unwrap().push(page);
            if Self::take(&self.failures, page) {
                return Err(FetchError::Status { status: StatusCode::SERVICE_UNAVAILABLE, body: "try later".into() });
            }
            let items = if Self::take(&self.empties, page) {
                Vec::new()
            } else if let Some(items) = self.overrides.get(&page) {
                items.clone()
            } else {
                let start = ((page - self.first_page) * page_size) as usize;
                self.items.iter().skip(start).take(page_size as usize).cloned().collect()
            };
            Ok(ListingPage {
                items,
                total: Some(self.totals.get(&page).copied().unwrap_or(self.reported_total)),
                current_page: Some(self.answered_as.get(&page).copied().unwrap_or(page as u64)),
                filters: vec![json!({"attribute_code": "lcv_sponsor", "items": []})],
            })
        }
    }
}
