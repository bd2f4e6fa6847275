use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use crate::output::types::Meta;
use crate::snapshot::{self, SnapshotLocation, DEFAULT_SNAPSHOT_PATH};
use crate::telemetry::{self, ctx::LogCtx};
use crate::telemetry::ops::catalog::{Catalog, Phase as CatalogPhase};

pub mod course;
pub mod facets;
pub mod filter;
pub mod jurisdiction;
pub mod paginate;
pub mod view;

use course::{Course, Shaper};
use facets::{FacetCount, Facets};
use filter::CatalogFilter;
use paginate::{PageInfo, PAGE_SIZE};
use view::CatalogView;

#[derive(Args, Debug, Default)]
pub struct SnapshotArg {
    /// snapshot path or URL (default: CATALOG_SNAPSHOT or public/courses.json);
    /// relative locations resolve against CATALOG_BASE_URL when set
    #[arg(long)]
    pub snapshot: Option<String>,
}

impl SnapshotArg {
    pub fn location(&self) -> String {
        self.snapshot
            .clone()
            .or_else(|| std::env::var("CATALOG_SNAPSHOT").ok())
            .unwrap_or_else(|| DEFAULT_SNAPSHOT_PATH.to_string())
    }
}

#[derive(Args, Debug)]
pub struct FacetsCmd {
    #[command(flatten)]
    pub source: SnapshotArg,
    /// entries shown per facet in text output
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Args, Debug, Default)]
pub struct BrowseCmd {
    #[command(flatten)]
    pub source: SnapshotArg,
    /// free text matched against title and description
    #[arg(long)] pub search: Option<String>,
    #[arg(long)] pub category: Vec<String>,
    #[arg(long)] pub qualification: Vec<String>,
    #[arg(long)] pub sponsor: Vec<String>,
    #[arg(long)] pub jurisdiction: Vec<String>,
    /// price ceiling; 0 disables
    #[arg(long)] pub max_price: Option<f64>,
    /// minimum credit hours; 0 disables
    #[arg(long)] pub min_credits: Option<f64>,
    #[arg(long, default_value_t = 1)] pub page: usize,
    #[arg(long, default_value_t = PAGE_SIZE)] pub page_size: usize,
    /// show a single course by id or sku
    #[arg(long)] pub id: Option<String>,
}

impl BrowseCmd {
    pub fn to_filter(&self) -> CatalogFilter {
        CatalogFilter {
            search: self.search.clone().unwrap_or_default(),
            categories: self.category.clone(),
            qualifications: self.qualification.clone(),
            sponsors: self.sponsor.clone(),
            jurisdictions: self
                .jurisdiction
                .iter()
                .map(|j| jurisdiction::canonical(j).map(str::to_string).unwrap_or_else(|| j.clone()))
                .collect(),
            max_price: self.max_price,
            min_credits: self.min_credits,
        }
    }
}

#[derive(Serialize)]
struct FacetsView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    courses: usize,
    facets: &'a Facets,
}

#[derive(Serialize)]
struct BrowseView<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    filter: &'a CatalogFilter,
    page: PageInfo,
    courses: Vec<&'a Course>,
}

/// Load and shape the snapshot. Any load failure degrades to an empty view with a message.
pub async fn open_view(source: &SnapshotArg, log: &LogCtx<Catalog>) -> Result<CatalogView> {
    let shaper = Shaper::new()?;
    let location = source.location();
    let base = std::env::var("CATALOG_BASE_URL").ok();
    let _s = log.span_kv(&CatalogPhase::Load, [("location", location.clone()), ("base", format!("{:?}", base))]).entered();

    let loaded = match SnapshotLocation::resolve(&location, base.as_deref()) {
        Ok(loc) => {
            log.debug_kv("loading snapshot", [("from", loc.to_string())]);
            snapshot::load(&loc, &reqwest::Client::new()).await
        }
        Err(e) => Err(e),
    };
    match loaded {
        Ok(snap) => {
            let view = { let _s = log.span(&CatalogPhase::Shape).entered(); CatalogView::from_snapshot(&snap, &shaper) };
            log.info_kv("📚 catalog loaded", [("courses", view.courses().len().to_string()), ("total", snap.total.to_string())]);
            Ok(view)
        }
        Err(e) => {
            log.error_kv("❌ snapshot load failed", [("location", location), ("error", e.to_string())]);
            Ok(CatalogView::unavailable())
        }
    }
}

pub async fn run_facets(args: FacetsCmd) -> Result<()> {
    let log = telemetry::catalog();
    let _g = log.root_span_kv([("cmd", "facets".to_string()), ("snapshot", args.source.location())]).entered();
    let view = open_view(&args.source, &log).await?;
    let _s = log.span(&CatalogPhase::Output).entered();

    if telemetry::config::json_mode() {
        let meta = Meta::from_source(args.source.location());
        return log.result(&FacetsView { error: view.error(), courses: view.courses().len(), facets: view.facets() }, meta);
    }
    if let Some(msg) = view.error() { log.warn(msg); }
    let f = view.facets();
    log.info(format!("📚 {} courses", view.courses().len()));
    print_counts(&log, "🏷️ Categories", &f.categories, args.limit);
    print_counts(&log, "🎓 Qualifications", &f.qualifications, args.limit);
    print_counts(&log, "🏢 Sponsors", &f.sponsors, args.limit);
    print_counts(&log, "🗺️ Jurisdictions", &f.jurisdictions, args.limit);
    log.info(format!("💲 Max price: {:.2}", f.max_price));
    log.info(format!("⏱️ Max credits: {:.2}", f.max_credits));
    if !f.source.sponsors.is_empty() || !f.source.fields_of_study.is_empty() || !f.source.program_qualifications.is_empty() {
        log.info(format!(
            "🔎 Listing filters: sponsors={} fields_of_study={} program_qualifications={}",
            f.source.sponsors.len(), f.source.fields_of_study.len(), f.source.program_qualifications.len()
        ));
    }
    Ok(())
}

fn print_counts(log: &LogCtx<Catalog>, title: &str, counts: &[FacetCount], limit: usize) {
    log.info(format!("{} ({}):", title, counts.len()));
    for c in counts.iter().take(limit) {
        log.info(format!("  {:>5}  {}", c.count, c.value));
    }
    if counts.len() > limit { log.info(format!("  ... ({} more)", counts.len() - limit)); }
}

pub async fn run_browse(args: BrowseCmd) -> Result<()> {
    let log = telemetry::catalog();
    let _g = log.root_span_kv([
        ("cmd", "browse".to_string()),
        ("snapshot", args.source.location()),
        ("page", args.page.to_string()),
        ("id", format!("{:?}", args.id)),
    ]).entered();
    let mut view = open_view(&args.source, &log).await?.with_page_size(args.page_size);

    if let Some(id) = &args.id {
        return show_course(&view, id, &args.source, &log);
    }

    {
        let _s = log.span(&CatalogPhase::Filter).entered();
        view.set_filter(args.to_filter());
    }
    {
        let _s = log.span(&CatalogPhase::Paginate).entered();
        view.set_page(args.page);
    }

    let _s = log.span(&CatalogPhase::Output).entered();
    let info = view.page_info();
    if telemetry::config::json_mode() {
        let out = BrowseView { error: view.error(), filter: view.filter(), page: info, courses: view.visible() };
        return log.result(&out, Meta::from_source(args.source.location()));
    }
    if let Some(msg) = view.error() { log.warn(msg); }
    log.info(format!("📖 {}", info.label()));
    for c in view.visible() {
        log.info(format!(
            "  [{}] {}  by {}  {}  {}",
            c.id.as_deref().unwrap_or("-"), c.title, c.provider, c.price_label(), c.category
        ));
    }
    if info.total_pages > 1 {
        let pages: Vec<String> = info.window.iter()
            .map(|p| if *p == info.page { format!("[{p}]") } else { p.to_string() })
            .collect();
        log.info(format!("  Pages: {} (of {})", pages.join(" "), info.total_pages));
    }
    Ok(())
}

fn show_course(view: &CatalogView, id: &str, source: &SnapshotArg, log: &LogCtx<Catalog>) -> Result<()> {
    let Some(c) = view.find(id) else {
        bail!("course {} not found", id);
    };
    if telemetry::config::json_mode() {
        return log.result(c, Meta::from_source(source.location()));
    }
    log.info(format!("📘 {}", c.title));
    log.info(format!("  Provider: {}", c.provider));
    log.info(format!("  Price: {}", c.price_label()));
    log.info(format!("  Category: {}  Level: {}", c.category, c.level));
    log.info(format!("  Delivery: {}  Length: {}  Credits: {}", c.delivery_method, c.length, c.credits));
    if !c.qualifications.is_empty() { log.info(format!("  Qualifications: {}", c.qualifications.join(", "))); }
    log.info(format!("  SKU: {:?}  URL key: {:?}  Type: {:?}", c.sku, c.url_key, c.product_type));
    log.info(format!("  Image: {}", c.image_url));
    log.info(format!("  {}", c.description.trim()));
    Ok(())
}
