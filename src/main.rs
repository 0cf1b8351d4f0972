mod config;
mod error;
mod fetch;
mod harvest;
mod manifest;
mod normalize;
mod parser;
mod record;
mod resolver;
mod store;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::config::Settings;
use crate::fetch::HttpFetcher;
use crate::harvest::Harvester;
use crate::manifest::HarvestManifest;
use crate::normalize::{Lookup, Normalized};
use crate::parser::ProductParser;
use crate::resolver::LinkResolver;

#[derive(Parser)]
#[command(name = "catalog_harvester", about = "Bookstore catalog harvester and SQL exporter")]
struct Cli {
    /// Settings file (TOML). Defaults to ./catalog_harvester.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up product links for the ISBNs in a CSV file
    Resolve {
        /// CSV with an `isbn` column
        #[arg(long)]
        source: Option<PathBuf>,
        /// Where to write `isbn,link` rows
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Scrape product pages into numbered batch files
    Harvest(HarvestArgs),
    /// Turn batch files into an SQL import script
    Export(ExportArgs),
    /// Harvest, then export
    Run {
        #[command(flatten)]
        harvest: HarvestArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
}

#[derive(Args)]
struct HarvestArgs {
    /// CSV with a `link` column
    #[arg(long)]
    links: Option<PathBuf>,
    /// Directory for batch files and the run manifest
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    batch_size: Option<usize>,
}

#[derive(Args)]
struct ExportArgs {
    /// Directory holding batch files (default: output_dir)
    #[arg(long)]
    input_dir: Option<PathBuf>,
    /// Script path
    #[arg(long)]
    sql: Option<PathBuf>,
    /// Prepend CREATE TABLE statements
    #[arg(long)]
    schema: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    info!(settings = ?settings, "configuration loaded");

    let result = match cli.command {
        Commands::Resolve { source, output } => {
            if let Some(p) = source {
                settings.isbn_source = p;
            }
            if let Some(p) = output {
                settings.resolved_links = p;
            }
            resolve(&settings).await
        }
        Commands::Harvest(args) => {
            args.apply(&mut settings)?;
            harvest(&settings).await
        }
        Commands::Export(args) => {
            let input_dir = args
                .input_dir
                .clone()
                .unwrap_or_else(|| settings.output_dir.clone());
            args.apply(&mut settings);
            export(&settings, input_dir, args.schema)
        }
        Commands::Run { harvest: h, export: e } => {
            h.apply(&mut settings)?;
            let input_dir = e
                .input_dir
                .clone()
                .unwrap_or_else(|| settings.output_dir.clone());
            e.apply(&mut settings);
            harvest(&settings).await?;
            export(&settings, input_dir, e.schema)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

impl HarvestArgs {
    fn apply(&self, settings: &mut Settings) -> Result<()> {
        if let Some(p) = &self.links {
            settings.link_source = p.clone();
        }
        if let Some(d) = &self.output_dir {
            settings.output_dir = d.clone();
        }
        if let Some(n) = self.batch_size {
            settings.batch_size = n;
        }
        settings.validate()
    }
}

impl ExportArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(p) = &self.sql {
            settings.sql_output = p.clone();
        }
    }
}

async fn resolve(settings: &Settings) -> Result<()> {
    let isbns = store::read_column(&settings.isbn_source, "isbn")?;
    if isbns.is_empty() {
        println!("No ISBNs in {:?}.", settings.isbn_source);
        return Ok(());
    }
    println!("Resolving {} ISBNs...", isbns.len());

    let fetcher = HttpFetcher::new(settings)?;
    let mut out = store::ResolutionWriter::create(&settings.resolved_links)?;
    let stats = LinkResolver::new(&fetcher, settings)
        .resolve_all(&isbns, &mut out)
        .await?;
    out.finish()?;

    println!(
        "Done: {} ISBNs ({} found, {} not found, {} errors). Results saved to {:?}",
        stats.total, stats.found, stats.not_found, stats.errors, settings.resolved_links
    );
    Ok(())
}

async fn harvest(settings: &Settings) -> Result<()> {
    let links = store::read_column(&settings.link_source, "link")?;
    if links.is_empty() {
        println!("No links in {:?}.", settings.link_source);
    }
    std::fs::create_dir_all(&settings.output_dir)
        .with_context(|| format!("Failed to create {:?}", settings.output_dir))?;

    println!(
        "Scraping {} pages in batches of {}...",
        links.len(),
        settings.batch_size
    );
    let fetcher = HttpFetcher::new(settings)?;
    let parser = ProductParser::new(
        settings.label_rules(),
        settings.excluded_categories.iter().cloned(),
    );
    let manifest = Harvester::new(&fetcher, parser, settings)
        .run(&links)
        .await?;

    println!(
        "Scraped {} pages ({} ok, {} errors) into {} batch files. Manifest: {:?}",
        manifest.total,
        manifest.extracted,
        manifest.failed.len(),
        manifest.batches.len(),
        settings.manifest_path()
    );
    Ok(())
}

fn export(settings: &Settings, input_dir: PathBuf, schema: bool) -> Result<()> {
    let records = store::read_harvested(&input_dir, &settings.batch_prefix)?;
    if records.is_empty() {
        println!(
            "No records in {:?}. Writing an empty script; run 'harvest' first.",
            input_dir
        );
    } else {
        println!("Normalizing {} records...", records.len());
    }
    let manifest_path = store::manifest_path(&input_dir, &settings.batch_prefix);
    if manifest_path.exists() {
        let manifest = HarvestManifest::read(&manifest_path)?;
        if !manifest.failed.is_empty() {
            println!(
                "Note: the last harvest skipped {} links (listed in {:?}).",
                manifest.failed.len(),
                manifest_path
            );
        }
    }

    let normalized = normalize::normalize(&records);
    normalize::sql::write_script(&settings.sql_output, &normalized, schema)?;
    print_counts(&normalized);
    println!("SQL import file generated: {:?}", settings.sql_output);
    Ok(())
}

fn print_counts(normalized: &Normalized) {
    for lookup in Lookup::ALL {
        println!("{:<12} {}", lookup.label(), normalized.table(lookup).len());
    }
    println!("{:<12} {}", "Products", normalized.products.len());
}

fn format_duration(d: std::time::Duration) -> String {
    let total = d.as_secs();
    let (h, m, sec) = (total / 3600, total / 60 % 60, total % 60);
    match (h, m) {
        (0, 0) => format!("{:.1}s", d.as_secs_f64()),
        (0, _) => format!("{}m {}s", m, sec),
        _ => format!("{}h {}m {}s", h, m, sec),
    }
}
