use std::collections::{BTreeSet, HashSet};

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::snapshot::Snapshot;
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::fetch::{Fetch, Phase as FetchPhase};

use super::dedup::{self, DedupPolicy, IdField};
use super::retry::{fetch_with_retry, PageOutcome, RetryPolicy};
use super::source::{ListingPage, ListingSource};

#[derive(Clone, Debug)]
pub struct BulkOptions {
    pub page_size: u32,
    pub first_page: u32,
    pub retry: RetryPolicy,
    pub id_field: IdField,
    pub keep: DedupPolicy,
}

/// `ceil(total / page_size)`; zero when either is zero.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    if page_size == 0 { return 0; }
    total.div_ceil(page_size as u64).min(u32::MAX as u64) as u32
}

/// Indices still to request once the first page is in hand. Stops at `u32::MAX`.
pub fn remaining_pages(first_page: u32, total_pages: u32) -> Vec<u32> {
    (1..total_pages).map_while(|i| first_page.checked_add(i)).collect()
}

/// Pages requested and pages given up on during one run.
#[derive(Debug, Default)]
pub struct PageLedger {
    requested: BTreeSet<u32>,
    failed: BTreeSet<u32>,
}

impl PageLedger {
    /// False when the page was already requested this run.
    pub fn mark_requested(&mut self, page: u32) -> bool { self.requested.insert(page) }
    pub fn mark_failed(&mut self, page: u32) { self.failed.insert(page); }
    pub fn failed(&self) -> Vec<u32> { self.failed.iter().copied().collect() }
}

/// Run-scoped buffer of every item received, plus the identities seen so far.
#[derive(Debug)]
pub struct Accumulator {
    id_field: IdField,
    items: Vec<Value>,
    seen: HashSet<String>,
    unkeyed: usize,
    pub duplicates_within_pages: usize,
    pub duplicates_across_pages: usize,
}

impl Accumulator {
    pub fn new(id_field: IdField) -> Self {
        Self { id_field, items: Vec::new(), seen: HashSet::new(), unkeyed: 0, duplicates_within_pages: 0, duplicates_across_pages: 0 }
    }

    /// Distinct records collected so far.
    pub fn distinct(&self) -> usize { self.seen.len() + self.unkeyed }

    pub fn absorb(&mut self, page: u32, items: Vec<Value>, log: &LogCtx<Fetch>) {
        let within = dedup::duplicates_within(&items, self.id_field);
        if !within.is_empty() {
            self.duplicates_within_pages += within.len();
            log.warn_kv("⚠️ page contains duplicate identifiers", [
                ("page", page.to_string()),
                ("items", items.len().to_string()),
                ("duplicates", within.join(",")),
            ]);
        }
        let across = dedup::already_seen(&items, self.id_field, &self.seen);
        if !across.is_empty() {
            self.duplicates_across_pages += across.len();
            log.warn_kv("⚠️ page repeats items already collected", [
                ("page", page.to_string()),
                ("count", across.len().to_string()),
                ("duplicates", across.join(",")),
            ]);
        }
        for item in &items {
            match self.id_field.key_of(item) {
                Some(key) => { self.seen.insert(key); }
                None => self.unkeyed += 1,
            }
        }
        self.items.extend(items);
    }

    pub fn finish(self, keep: DedupPolicy) -> dedup::DedupOutcome {
        dedup::dedup_by_key(self.items, self.id_field, keep)
    }
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub snapshot: Snapshot,
    pub reported_total: u64,
    pub max_reported_total: u64,
    pub total_pages: u32,
    pub pages_fetched: usize,
    pub retries: u32,
    pub failed_pages: Vec<u32>,
    pub skipped_pages: Vec<u32>,
    /// Pages whose response named a different `current_page`.
    pub misnumbered_pages: Vec<u32>,
    pub duplicates_within_pages: usize,
    pub duplicates_across_pages: usize,
    pub duplicates_removed: usize,
    pub unkeyed: usize,
}

impl FetchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed_pages.is_empty() && self.snapshot.total == self.max_reported_total
    }
}

/// First page of the listing; the run cannot be planned without it.
pub async fn bootstrap(source: &dyn ListingSource, opts: &BulkOptions, log: &LogCtx<Fetch>) -> Result<(ListingPage, u32)> {
    let _s = log.span_kv(&FetchPhase::Bootstrap, [("page", opts.first_page.to_string())]).entered();
    match fetch_with_retry(source, opts.first_page, opts.page_size, &opts.retry, true, log).await {
        PageOutcome::Fetched { page, attempts } => {
            log.info_kv("📄 first page", [
                ("total", format!("{:?}", page.total)),
                ("items", page.items.len().to_string()),
                ("first", describe(page.items.first(), opts.id_field)),
                ("last", describe(page.items.last(), opts.id_field)),
            ]);
            Ok((page, attempts))
        }
        PageOutcome::Failed { attempts, reason } => Err(anyhow!(
            "could not fetch first page {} after {} attempt(s): {}",
            opts.first_page, attempts, reason
        )),
    }
}

/// Pull every page into one deduplicated snapshot. Only the first page is fatal;
/// other pages that exhaust their retries are recorded in `failed_pages`.
pub async fn fetch_all(source: &dyn ListingSource, opts: &BulkOptions, log: &LogCtx<Fetch>) -> Result<FetchOutcome> {
    let mut ledger = PageLedger::default();
    let mut acc = Accumulator::new(opts.id_field);

    ledger.mark_requested(opts.first_page);
    let (first, first_attempts) = bootstrap(source, opts, log).await?;
    let mut retries = first_attempts - 1;

    let reported_total = first.total.unwrap_or(0);
    let mut max_reported_total = reported_total;
    let pages = total_pages(reported_total, opts.page_size);
    let plan = remaining_pages(opts.first_page, pages);
    {
        let _s = log.span(&FetchPhase::Plan).entered();
        log.info_kv("🧮 page plan", [
            ("total", reported_total.to_string()),
            ("page_size", opts.page_size.to_string()),
            ("total_pages", pages.to_string()),
        ]);
    }

    let filters = first.filters;
    let received = first.items.len();
    acc.absorb(opts.first_page, first.items, log);
    log.page_summary(opts.first_page, received, acc.distinct(), reported_total);
    let mut pages_fetched = 1usize;
    let mut skipped_pages: Vec<u32> = Vec::new();
    let mut misnumbered_pages: Vec<u32> = Vec::new();
    // pause only follows a successful request
    let mut pause = true;

    for index in plan {
        if !ledger.mark_requested(index) {
            log.error_kv("❌ page already requested; skipping", [("page", index.to_string())]);
            skipped_pages.push(index);
            continue;
        }
        if pause { pace(&opts.retry).await; }

        let _s = log.span_kv(&FetchPhase::Page, [("page", index.to_string())]).entered();
        match fetch_with_retry(source, index, opts.page_size, &opts.retry, false, log).await {
            PageOutcome::Fetched { page, attempts } => {
                retries += attempts - 1;
                pages_fetched += 1;
                pause = true;
                if let Some(received) = page.current_page.filter(|p| *p != index as u64) {
                    misnumbered_pages.push(index);
                    log.warn_kv("⚠️ endpoint answered a different page", [("requested", index.to_string()), ("received", received.to_string())]);
                }
                if let Some(t) = page.total {
                    if t != reported_total { log.warn_kv("⚠️ reported total changed", [("was", reported_total.to_string()), ("now", t.to_string())]); }
                    max_reported_total = max_reported_total.max(t);
                }
                log.debug_kv("page items", [
                    ("first", describe(page.items.first(), opts.id_field)),
                    ("last", describe(page.items.last(), opts.id_field)),
                ]);
                let received = page.items.len();
                acc.absorb(index, page.items, log);
                log.page_summary(index, received, acc.distinct(), max_reported_total);
            }
            PageOutcome::Failed { attempts, reason } => {
                retries += attempts - 1;
                pause = false;
                ledger.mark_failed(index);
                log.error_kv("❌ giving up on page", [
                    ("page", index.to_string()),
                    ("attempts", attempts.to_string()),
                    ("reason", reason),
                ]);
            }
        }
    }

    let failed_pages = ledger.failed();
    if !failed_pages.is_empty() {
        log.error(format!("❌ Failed to fetch the following pages: {:?}", failed_pages));
    }

    let duplicates_within_pages = acc.duplicates_within_pages;
    let duplicates_across_pages = acc.duplicates_across_pages;
    let deduped = {
        let _s = log.span(&FetchPhase::Dedup).entered();
        acc.finish(opts.keep)
    };
    if deduped.unkeyed > 0 {
        log.warn_kv("⚠️ items without identifier kept as-is", [("count", deduped.unkeyed.to_string())]);
    }

    let snapshot = Snapshot::assemble(deduped.items, filters);
    if snapshot.total != max_reported_total {
        log.warn_kv("⚠️ collected count differs from reported total", [
            ("collected", snapshot.total.to_string()),
            ("reported", max_reported_total.to_string()),
        ]);
    }
    log.totals(snapshot.items.len(), max_reported_total, failed_pages.len(), deduped.removed);

    Ok(FetchOutcome {
        snapshot,
        reported_total,
        max_reported_total,
        total_pages: pages,
        pages_fetched,
        retries,
        failed_pages,
        skipped_pages,
        misnumbered_pages,
        duplicates_within_pages,
        duplicates_across_pages,
        duplicates_removed: deduped.removed,
        unkeyed: deduped.unkeyed,
    })
}

async fn pace(policy: &RetryPolicy) {
    if !policy.request_delay.is_zero() {
        tokio::time::sleep(policy.request_delay).await;
    }
}

fn describe(item: Option<&Value>, id: IdField) -> String {
    match item {
        Some(it) => format!(
            "{}:{}",
            id.key_of(it).unwrap_or_else(|| "?".into()),
            it.get("name").and_then(Value::as_str).unwrap_or("")
        ),
        None => "-".to_string(),
    }
}
