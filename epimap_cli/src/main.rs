//! EpiMap batch CLI
//!
//! Runs the engines over JSON fixtures: cluster a case-point file, or
//! synthesize points for a date from a region catalog and count table.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use epimap_core::config::{ClusterConfig, SynthConfig};
use epimap_core::{RegionAllocator, SpatiotemporalClusterer};
use epimap_store::{InMemoryCaseCountTable, InMemoryPointStore, InMemoryRegionCatalog};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// EpiMap engine driver
#[derive(Parser, Debug)]
#[command(name = "epimap")]
#[command(about = "Cluster epidemic case points or synthesize new ones", long_about = None)]
struct Args {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cluster a case-point file and print the clusters as JSON
    Cluster {
        /// JSON file with the case points
        #[arg(long)]
        points: String,

        /// Spatial weight of the fused dissimilarity
        #[arg(long, default_value = "0.98")]
        weight: f64,

        /// Neighborhood threshold on the fused dissimilarity
        #[arg(long, default_value = "0.014")]
        epsilon: f64,
    },
    /// Synthesize points for a date and print them as JSON
    Synthesize {
        /// JSON file with the region catalog
        #[arg(long)]
        catalog: String,

        /// JSON file with the per-date case counts
        #[arg(long)]
        counts: String,

        /// JSON file with the case-point history
        #[arg(long)]
        history: String,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// RNG seed for reproducible output
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Cluster {
            points,
            weight,
            epsilon,
        } => {
            let store = InMemoryPointStore::from_json_file(&points)?;
            let config = ClusterConfig {
                spatial_weight: weight,
                epsilon,
                ..ClusterConfig::default()
            };
            let clusterer = SpatiotemporalClusterer::new(config);
            let clusters = clusterer.cluster(store.points());

            info!("{} points -> {} clusters", store.len(), clusters.len());
            println!("{}", serde_json::to_string_pretty(&clusters)?);
        }
        Command::Synthesize {
            catalog,
            counts,
            history,
            date,
            seed,
        } => {
            let catalog = InMemoryRegionCatalog::from_json_file(&catalog)?;
            let counts = InMemoryCaseCountTable::from_json_file(&counts)?;
            let history = InMemoryPointStore::from_json_file(&history)?;

            let mut allocator = RegionAllocator::new(SynthConfig::default(), seed);
            let points = allocator.synthesize_for_date(date, &history, &catalog, &counts)?;

            info!("synthesized {} points for {}", points.len(), date);
            println!("{}", serde_json::to_string_pretty(&points)?);
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if let Err(e) = run(args.command) {
        error!("{e}");
        std::process::exit(1);
    }
}
