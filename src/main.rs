use clap::{Parser, Subcommand};
use anyhow::Result;
use dotenvy::dotenv;

mod output;
mod telemetry;
mod util;
mod snapshot;
mod fetcher;
mod catalog;
mod inspect;

#[derive(Parser)]
#[command(name = "catalog", about = "Course catalog snapshot CLI")]
struct Cli {
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull every page of the listing into one snapshot (plan unless --apply)
    Fetch(fetcher::FetchCmd),
    /// Facet counts and ranges of a snapshot
    Facets(catalog::FacetsCmd),
    /// Filter and page through a snapshot
    Browse(catalog::BrowseCmd),
    /// Integrity checks on a snapshot
    Inspect(inspect::InspectCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // initialize logging/tracing (stderr). Respect RUST_LOG and CATALOG_LOG_FORMAT
    telemetry::config::init_tracing();

    match cli.command {
        Commands::Fetch(args) => fetcher::run(args).await?,
        Commands::Facets(args) => catalog::run_facets(args).await?,
        Commands::Browse(args) => catalog::run_browse(args).await?,
        Commands::Inspect(args) => inspect::run(args).await?,
    }

    Ok(())
}
