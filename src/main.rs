// Command-line front end for preparing regional and city-level GTFS datasets.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use regional_gtfs::config::{Config, FeedConfig};
use regional_gtfs::{GtfsContent, GtfsFeature, NominatimGeocoder, RegionalFeedManager};

#[derive(Parser, Debug)]
#[command(name = "regional-gtfs", about = "Download regional GTFS feeds and derive city-level subsets")]
struct Args {
    /// Config file (defaults to <config dir>/regional_gtfs/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Region or country the feed covers, e.g. Netherlands
    #[arg(long, global = true)]
    region: Option<String>,

    /// Publish date of the feed in DDMMYYYY form (defaults to today)
    #[arg(long, global = true)]
    date: Option<String>,

    /// Download URL of the feed archive
    #[arg(long, global = true)]
    url: Option<String>,

    /// Root directory for raw and processed data
    #[arg(long, global = true, value_name = "DIR")]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the regional archive
    Fetch,
    /// Unpack an archive (defaults to the downloaded one)
    Extract { archive: Option<PathBuf> },
    /// Download and unpack in one go
    Run,
    /// List the GTFS tables present in the extracted dataset
    Tables,
    /// Summarise one GTFS table
    Table {
        name: GtfsContent,
        /// Rows to print
        #[arg(long, default_value_t = 5)]
        head: usize,
    },
    /// List the distinct values of route_id, trip_id, service_id, route_type, agency_id or stop_id
    Unique {
        feature: GtfsFeature,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Generate a city-level GTFS dataset from the regional one
    City { name: String },
}

fn resolve_feed(args: &Args, config: &Config) -> Result<FeedConfig> {
    let fallback = config.feed.as_ref();

    let region = args
        .region
        .clone()
        .or_else(|| fallback.map(|f| f.region.clone()))
        .context("No region given: pass --region or set [feed] in the config file")?;
    let date = args
        .date
        .clone()
        .or_else(|| fallback.map(|f| f.date.clone()))
        .unwrap_or_else(|| chrono::Local::now().format("%d%m%Y").to_string());
    let url = args
        .url
        .clone()
        .or_else(|| fallback.map(|f| f.url.clone()))
        .unwrap_or_default();

    Ok(FeedConfig { region, date, url })
}

fn fetch(manager: &RegionalFeedManager) -> Result<PathBuf> {
    if manager.identity().source_url.is_empty() {
        bail!("No feed URL given: pass --url or set [feed] in the config file");
    }
    let fetched = manager.fetch().context("Failed to download regional GTFS")?;
    println!("✓ Downloaded {} KB to {}", fetched.bytes / 1024, fetched.path.display());
    Ok(fetched.path)
}

fn extract(manager: &RegionalFeedManager, archive: PathBuf) -> Result<()> {
    let files = manager
        .extract(&archive)
        .with_context(|| format!("Failed to extract {}", archive.display()))?;
    println!(
        "✓ Extracted {} files of {} published on {} to {}",
        files.len(),
        manager.identity().region,
        manager.identity().publish_date,
        manager.extract_dir().display()
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let feed = resolve_feed(&args, &config)?;
    let data_root = args.data_root.clone().unwrap_or_else(|| config.data_root.clone());
    let mut manager = RegionalFeedManager::new(feed.region, feed.date, feed.url)
        .with_data_root(data_root)
        .with_settings(config.http_settings());

    match args.command {
        Command::Fetch => {
            fetch(&manager)?;
        }
        Command::Extract { archive } => {
            let archive = archive.unwrap_or_else(|| manager.archive_path().to_path_buf());
            extract(&manager, archive)?;
        }
        Command::Run => {
            let archive = fetch(&manager)?;
            extract(&manager, archive)?;
        }
        Command::Tables => {
            let contents = manager.available_contents();
            if contents.is_empty() {
                println!("ℹ️  No GTFS tables in {}", manager.extract_dir().display());
            }
            for content in contents {
                println!("  • {}", content);
            }
        }
        Command::Table { name, head } => {
            let Some(table) = manager.load_table(name)? else {
                println!("ℹ️  {} is not available in {}", name, manager.extract_dir().display());
                return Ok(());
            };
            println!("✓ {}: {} rows", name, table.len());
            for column in table.headers() {
                if let Some(kind) = table.kind(column) {
                    println!("  • {} ({:?})", column, kind);
                }
            }
            let columns = table.headers().count();
            for row in 0..head.min(table.len()) {
                let cells: Vec<String> = (0..columns)
                    .filter_map(|col| table.value(row, col))
                    .map(|value| value.to_string())
                    .collect();
                println!("  {}", cells.join(","));
            }
        }
        Command::Unique { feature, limit } => {
            let values = manager.unique_values(feature)?;
            println!("✓ {} distinct {} values", values.len(), feature);
            for value in values.iter().take(limit.unwrap_or(usize::MAX)) {
                println!("  {}", value);
            }
        }
        Command::City { name } => {
            let geocoder = NominatimGeocoder::new(config.geocoder_url.clone(), config.http_settings());
            let subset = manager
                .derive_city_subset(&name, &geocoder)
                .with_context(|| format!("Failed to generate city-level GTFS for {}", name))?;
            println!(
                "✓ {} resolved to {}",
                subset.city, subset.boundary.display_name
            );
            for (content, rows) in &subset.tables {
                println!("  • {}: {} rows", content, rows);
            }
            println!("✓ City-level GTFS saved to {}", subset.output_dir.display());
        }
    }

    Ok(())
}
