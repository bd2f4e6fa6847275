use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use url::Url;

use crate::snapshot::DEFAULT_SNAPSHOT_PATH;

use super::dedup::{DedupPolicy, IdField};
use super::retry::RetryPolicy;
use super::FetchCmd;

const DEFAULT_ENDPOINT: &str = "https://d2uj9jw4vo3cg6.cloudfront.net/V1/storeview/default/search/products";
const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_FIRST_PAGE: u32 = 1;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 5_000;
const DEFAULT_MAX_BACKOFF_MS: u64 = 60_000;
const DEFAULT_REQUEST_DELAY_MS: u64 = 1_000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub endpoint: String,
    pub page_size: u32,
    /// Index of the first page; 0 or 1 depending on the endpoint.
    pub first_page: u32,
    pub page_param: String,
    pub page_size_param: String,
    pub extra_params: Vec<(String, String)>,
    pub max_attempts: u32,
    pub backoff: Duration,
    pub max_backoff: Duration,
    pub request_delay: Duration,
    pub timeout: Duration,
    pub id_field: IdField,
    pub keep: DedupPolicy,
    pub output: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            first_page: DEFAULT_FIRST_PAGE,
            page_param: "page".to_string(),
            page_size_param: "page_size".to_string(),
            extra_params: vec![("featured-only".to_string(), "0".to_string())],
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            id_field: IdField::default(),
            keep: DedupPolicy::default(),
            output: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

impl FetchConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = std::env::var("CATALOG_API_URL") {
            cfg.endpoint = url;
        }
        if let Some(n) = env_parse::<u32>("CATALOG_PAGE_SIZE") { cfg.page_size = n; }
        if let Some(n) = env_parse::<u32>("CATALOG_FIRST_PAGE") { cfg.first_page = n; }
        if let Some(n) = env_parse::<u32>("CATALOG_MAX_ATTEMPTS") { cfg.max_attempts = n; }
        if let Some(ms) = env_parse::<u64>("CATALOG_BACKOFF_MS") { cfg.backoff = Duration::from_millis(ms); }
        if let Some(ms) = env_parse::<u64>("CATALOG_MAX_BACKOFF_MS") { cfg.max_backoff = Duration::from_millis(ms); }
        if let Some(ms) = env_parse::<u64>("CATALOG_REQUEST_DELAY_MS") { cfg.request_delay = Duration::from_millis(ms); }
        if let Some(s) = env_parse::<u64>("CATALOG_TIMEOUT_SECS") { cfg.timeout = Duration::from_secs(s); }
        if let Some(f) = std::env::var("CATALOG_ID_FIELD").ok().as_deref().and_then(IdField::parse) { cfg.id_field = f; }
        if let Ok(path) = std::env::var("CATALOG_SNAPSHOT") { cfg.output = PathBuf::from(path); }
        cfg
    }

    /// Env first, then CLI flags on top.
    pub fn from_env_and_args(args: &FetchCmd) -> Result<Self> {
        let mut cfg = Self::from_env();
        if let Some(url) = &args.url { cfg.endpoint = url.clone(); }
        if let Some(n) = args.page_size { cfg.page_size = n; }
        if let Some(n) = args.first_page { cfg.first_page = n; }
        if let Some(n) = args.max_attempts { cfg.max_attempts = n; }
        if let Some(ms) = args.backoff_ms { cfg.backoff = Duration::from_millis(ms); }
        if let Some(ms) = args.delay_ms { cfg.request_delay = Duration::from_millis(ms); }
        if let Some(f) = args.id_field { cfg.id_field = f; }
        if let Some(k) = args.keep { cfg.keep = k; }
        if let Some(out) = &args.out { cfg.output = out.clone(); }
        for (k, v) in &args.params {
            cfg.set_param(k, v);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Add an extra query parameter, replacing an earlier value for the same key.
    pub fn set_param(&mut self, key: &str, value: &str) {
        match self.extra_params.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.extra_params.push((key.to_string(), value.to_string())),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 { bail!("page size must be at least 1"); }
        if self.max_attempts == 0 { bail!("max attempts must be at least 1"); }
        if self.first_page > 1 { bail!("first page must be 0 or 1, got {}", self.first_page); }
        self.endpoint_url()?;
        Ok(())
    }

    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint).with_context(|| format!("invalid endpoint URL: {}", self.endpoint))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("endpoint must be http(s): {}", self.endpoint);
        }
        Ok(url)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: self.backoff,
            max_delay: self.max_backoff,
            request_delay: self.request_delay,
        }
    }
}

/// `key=value` for `--param`.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (k, v) = s.split_once('=').ok_or_else(|| format!("expected key=value, got `{s}`"))?;
    let k = k.trim();
    if k.is_empty() { return Err(format!("empty key in `{s}`")); }
    Ok((k.to_string(), v.trim().to_string()))
}
