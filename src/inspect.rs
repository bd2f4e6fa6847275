use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use crate::catalog::SnapshotArg;
use crate::fetcher::dedup::{self, IdField};
use crate::output::types::Meta;
use crate::snapshot::{self, Snapshot, SnapshotLocation};
use crate::telemetry::{self};
use crate::telemetry::ops::inspect::Phase as InspectPhase;

#[derive(Args, Debug)]
pub struct InspectCmd {
    #[command(flatten)]
    pub source: SnapshotArg,
    #[arg(long, value_enum, default_value_t = IdField::Sku)]
    pub id_field: IdField,
    /// exit non-zero when any check fails
    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct IntegrityReport {
    pub location: String,
    pub id_field: IdField,
    pub items: usize,
    pub total: u64,
    pub total_matches: bool,
    pub duplicate_ids: Vec<String>,
    pub missing_ids: usize,
    pub filters: usize,
}

impl IntegrityReport {
    pub fn check(location: String, snap: &Snapshot, id_field: IdField) -> Self {
        let items = snap.items.len();
        IntegrityReport {
            location,
            id_field,
            items,
            total: snap.total,
            total_matches: snap.total == items as u64,
            duplicate_ids: dedup::duplicates_within(&snap.items, id_field),
            missing_ids: snap.items.iter().filter(|i| id_field.key_of(i).is_none()).count(),
            filters: snap.filters.len(),
        }
    }

    pub fn violations(&self) -> Vec<String> {
        let mut v = Vec::new();
        if !self.total_matches { v.push(format!("total {} != items {}", self.total, self.items)); }
        if !self.duplicate_ids.is_empty() { v.push(format!("{} duplicate identifier(s)", self.duplicate_ids.len())); }
        if self.missing_ids > 0 { v.push(format!("{} item(s) without identifier", self.missing_ids)); }
        v
    }
}

/// entry point for inspect
pub async fn run(args: InspectCmd) -> Result<()> {
    let log = telemetry::inspect();
    let location = args.source.location();
    let _g = log.root_span_kv([("snapshot", location.clone()), ("strict", args.strict.to_string())]).entered();

    let started = Instant::now();
    let snap = {
        let _s = log.span(&InspectPhase::Load).entered();
        let base = std::env::var("CATALOG_BASE_URL").ok();
        let loc = SnapshotLocation::resolve(&location, base.as_deref())?;
        snapshot::load(&loc, &reqwest::Client::new())
            .await
            .with_context(|| format!("loading snapshot {}", loc))?
    };

    let report = {
        let _s = log.span(&InspectPhase::Check).entered();
        IntegrityReport::check(location, &snap, args.id_field)
    };
    let violations = report.violations();

    if telemetry::config::json_mode() {
        log.result(&report, Meta::from_source(report.location.clone()).timed(started))?;
    } else {
        log.info(format!("🗂️ Snapshot {}:", report.location));
        log.info(format!("  Items: {}", report.items));
        log.info(format!("  Total: {} ({})", report.total, if report.total_matches { "matches" } else { "MISMATCH" }));
        log.info(format!("  Filters: {}", report.filters));
        log.info(format!("  Missing identifiers: {}", report.missing_ids));
        log.info(format!("  Duplicate identifiers: {}", report.duplicate_ids.len()));
        for id in report.duplicate_ids.iter().take(10) { log.info(format!("    {}", id)); }
    }
    for v in &violations { log.warn_kv("⚠️ integrity check failed", [("detail", v.clone())]); }

    if args.strict && !violations.is_empty() {
        bail!("snapshot failed {} integrity check(s)", violations.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_snapshot_has_no_violations() {
        let snap = Snapshot::assemble(vec![json!({"sku": "a"}), json!({"sku": "b"})], vec![]);
        let r = IntegrityReport::check("x".into(), &snap, IdField::Sku);
        assert!(r.total_matches);
        assert!(r.violations().is_empty());
    }

    #[test]
    fn reports_each_kind_of_violation() {
        let snap = Snapshot {
            items: vec![json!({"sku": "a"}), json!({"sku": "a"}), json!({"name": "anon"})],
            total: 5,
            filters: vec![],
        };
        let r = IntegrityReport::check("x".into(), &snap, IdField::Sku);
        assert!(!r.total_matches);
        assert_eq!(r.duplicate_ids, vec!["sku:a".to_string()]);
        assert_eq!(r.missing_ids, 1);
        assert_eq!(r.violations().len(), 3);
    }

    #[tokio::test]
    async fn strict_mode_fails_on_violations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courses.json");
        let snap = Snapshot { items: vec![json!({"sku": "a"}), json!({"sku": "a"})], total: 2, filters: vec![] };
        snapshot::write_atomic(&path, &snap).unwrap();

        let args = |strict| InspectCmd {
            source: SnapshotArg { snapshot: Some(path.display().to_string()) },
            id_field: IdField::Sku,
            strict,
        };
        assert!(run(args(false)).await.is_ok());
        assert!(run(args(true)).await.is_err());
    }

    #[tokio::test]
    async fn unreadable_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = InspectCmd {
            source: SnapshotArg { snapshot: Some(dir.path().join("absent.json").display().to_string()) },
            id_field: IdField::Sku,
            strict: false,
        };
        assert!(run(args).await.is_err());
    }
}
