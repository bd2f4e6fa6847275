use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use crate::output::types::Meta;
use crate::snapshot;
use crate::telemetry::{self};
use crate::telemetry::ops::fetch::Phase as FetchPhase;

pub mod bulk;
pub mod config;
pub mod dedup;
pub mod retry;
pub mod source;
mod types;

use bulk::{BulkOptions, FetchOutcome};
use config::FetchConfig;
use dedup::{DedupPolicy, IdField};
use source::HttpListingSource;

#[derive(Args, Debug, Default)]
pub struct FetchCmd {
    /// listing endpoint (overrides CATALOG_API_URL)
    #[arg(long)] pub url: Option<String>,
    #[arg(long)] pub page_size: Option<u32>,
    /// index of the first page (0 or 1)
    #[arg(long)] pub first_page: Option<u32>,
    /// attempts per page, first try included
    #[arg(long)] pub max_attempts: Option<u32>,
    #[arg(long)] pub backoff_ms: Option<u64>,
    /// pause after each successful page
    #[arg(long)] pub delay_ms: Option<u64>,
    #[arg(long, value_enum)] pub id_field: Option<IdField>,
    #[arg(long, value_enum)] pub keep: Option<DedupPolicy>,
    /// extra query parameter, repeatable
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = config::parse_key_val)]
    pub params: Vec<(String, String)>,
    /// snapshot path (overrides CATALOG_SNAPSHOT)
    #[arg(long)] pub out: Option<PathBuf>,
    #[arg(long, default_value_t = false)] pub apply: bool,
}

impl BulkOptions {
    pub fn from_config(cfg: &FetchConfig) -> Self {
        BulkOptions {
            page_size: cfg.page_size,
            first_page: cfg.first_page,
            retry: cfg.retry_policy(),
            id_field: cfg.id_field,
            keep: cfg.keep,
        }
    }
}

pub async fn run(args: FetchCmd) -> Result<()> {
    let log = telemetry::fetch();
    let cfg = FetchConfig::from_env_and_args(&args)?;
    let _g = log.root_span_kv([
        ("apply", args.apply.to_string()),
        ("endpoint", cfg.endpoint.clone()),
        ("page_size", cfg.page_size.to_string()),
        ("first_page", cfg.first_page.to_string()),
        ("max_attempts", cfg.max_attempts.to_string()),
        ("output", cfg.output.display().to_string()),
    ]).entered();

    let source = HttpListingSource::new(&cfg)?;
    let opts = BulkOptions::from_config(&cfg);

    if !args.apply {
        let (first, _) = bulk::bootstrap(&source, &opts, &log).await?;
        let reported_total = first.total.unwrap_or(0);
        let total_pages = bulk::total_pages(reported_total, cfg.page_size);
        let pages: Vec<u32> = std::iter::once(cfg.first_page)
            .chain(bulk::remaining_pages(cfg.first_page, total_pages))
            .collect();
        if telemetry::config::json_mode() {
            let plan = types::FetchPlanView {
                endpoint: cfg.endpoint.clone(),
                page_size: cfg.page_size,
                first_page: cfg.first_page,
                reported_total,
                total_pages,
                pages,
                first_page_items: first.items.len(),
                output: cfg.output.clone(),
                id_field: cfg.id_field,
                keep: cfg.keep,
            };
            log.plan(&plan, meta_of(&cfg))?;
        } else {
            log.info(format!("📝 Fetch plan — total={} pages={} page_size={} endpoint={}", reported_total, total_pages, cfg.page_size, cfg.endpoint));
            log.info(format!("  would write {}", cfg.output.display()));
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let started = Instant::now();
    let outcome = bulk::fetch_all(&source, &opts, &log).await?;
    {
        let _s = log.span_kv(&FetchPhase::Write, [("path", cfg.output.display().to_string())]).entered();
        snapshot::write_atomic(&cfg.output, &outcome.snapshot)
            .with_context(|| format!("writing snapshot to {}", cfg.output.display()))?;
    }
    log.info(format!("💾 Wrote {} courses to {}", outcome.snapshot.total, cfg.output.display()));

    let report = report_of(&cfg, &outcome);
    log.result(&report, meta_of(&cfg).timed(started))?;
    if !report.complete {
        log.warn_kv("⚠️ snapshot is partial", [
            ("collected", report.collected.to_string()),
            ("reported", report.max_reported_total.to_string()),
            ("failed_pages", format!("{:?}", report.failed_pages)),
        ]);
    }
    Ok(())
}

fn meta_of(cfg: &FetchConfig) -> Meta {
    Meta::from_source(cfg.endpoint.clone()).with_snapshot(cfg.output.display().to_string())
}

fn report_of(cfg: &FetchConfig, out: &FetchOutcome) -> types::FetchReport {
    types::FetchReport {
        endpoint: cfg.endpoint.clone(),
        output: cfg.output.clone(),
        reported_total: out.reported_total,
        max_reported_total: out.max_reported_total,
        collected: out.snapshot.total,
        total_pages: out.total_pages,
        pages_fetched: out.pages_fetched,
        retries: out.retries,
        failed_pages: out.failed_pages.clone(),
        skipped_pages: out.skipped_pages.clone(),
        misnumbered_pages: out.misnumbered_pages.clone(),
        duplicates: types::DuplicateCounts {
            within_pages: out.duplicates_within_pages,
            across_pages: out.duplicates_across_pages,
            removed: out.duplicates_removed,
            unkeyed: out.unkeyed,
        },
        complete: out.is_complete(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::fetcher::retry::RetryPolicy;
    use crate::fetcher::source::mock::ScriptedSource;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        cmd: FetchCmd,
    }

    #[test]
    fn flags_override_defaults() {
        let h = Harness::try_parse_from([
            "catalog", "--page-size", "50", "--first-page", "0", "--keep", "last",
            "--id-field", "id", "--param", "featured-only=1", "--param", "store=en", "--apply",
        ]).unwrap();
        let cfg = FetchConfig::from_env_and_args(&h.cmd).unwrap();
        assert_eq!(cfg.page_size, 50);
        assert_eq!(cfg.first_page, 0);
        assert_eq!(cfg.keep, DedupPolicy::Last);
        assert_eq!(cfg.id_field, IdField::Id);
        assert!(cfg.extra_params.contains(&("featured-only".to_string(), "1".to_string())));
        assert!(cfg.extra_params.contains(&("store".to_string(), "en".to_string())));
        assert!(h.cmd.apply);
    }

    #[test]
    fn malformed_param_is_rejected_by_the_parser() {
        assert!(Harness::try_parse_from(["catalog", "--param", "oops"]).is_err());
    }

    #[tokio::test]
    async fn report_marks_partial_runs() {
        let cfg = FetchConfig::default();
        let opts = BulkOptions { retry: RetryPolicy::immediate(2), ..BulkOptions::from_config(&cfg) };
        let src = ScriptedSource::catalog(45, 1).fail_times(3, 2);
        let out = bulk::fetch_all(&src, &opts, &telemetry::fetch()).await.unwrap();
        let report = report_of(&cfg, &out);
        assert!(!report.complete);
        assert_eq!(report.failed_pages, vec![3]);
        assert_eq!(report.collected, 40);
        assert_eq!(report.retries, 1);

        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["duplicates"]["removed"], 0);
        assert_eq!(v["failed_pages"][0], 3);
    }
}
