use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dealcheck_core::{CanonicalItem, Coordinate};
use dealcheck_providers::{Aggregator, ScanResolution};

#[derive(Debug, Parser)]
#[command(name = "dealcheck")]
#[command(about = "Resolve a scanned product to competing offers and a deal verdict")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a scanned identifier and classify its price.
    Scan {
        /// Scanned product identifier (UPC).
        identifier: String,
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lng: f64,
        /// Search radius in miles.
        #[arg(long, default_value_t = 10.0)]
        radius: f64,
    },
    /// Free-text product search across all configured providers.
    Search {
        term: String,
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lng: f64,
        /// Search radius in miles.
        #[arg(long, default_value_t = 10.0)]
        radius: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = dealcheck_core::load_app_config_from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let aggregator = Aggregator::from_config(&config)?;
    if aggregator.provider_count() == 0 {
        eprintln!(
            "warning: no providers configured; set KROGER_CLIENT_ID/KROGER_CLIENT_SECRET \
             and/or GROCERYSERVER_PUBLISHER_ID"
        );
    } else {
        tracing::info!(providers = ?aggregator.provider_names(), "providers configured");
    }

    match cli.command {
        Commands::Scan {
            identifier,
            lat,
            lng,
            radius,
        } => {
            let origin = Coordinate {
                latitude: lat,
                longitude: lng,
            };
            let resolution = aggregator.resolve(&identifier, origin, radius).await;
            print_resolution(&resolution);
        }
        Commands::Search {
            term,
            lat,
            lng,
            radius,
        } => {
            let origin = Coordinate {
                latitude: lat,
                longitude: lng,
            };
            let items = aggregator.search(&term, origin, radius).await;
            print_search(&items);
        }
    }

    Ok(())
}

fn print_resolution(resolution: &ScanResolution) {
    let Some(item) = &resolution.item else {
        println!("product not found");
        return;
    };

    let store = item.store.as_deref().unwrap_or("unknown store");
    println!("{}", item.name);
    if let Some(brand) = &item.brand {
        println!("  brand:   {brand}");
    }
    println!("  price:   ${:.2} at {store}", item.price);
    if item.organic == Some(true) {
        println!("  organic: yes");
    }
    if let Some(verdict) = item.verdict {
        println!("  verdict: {verdict}");
    }

    if item.recommendations.is_empty() {
        println!("no competing offers nearby");
    } else {
        println!("try instead:");
        for rec in &item.recommendations {
            println!("  \u{2713} {:<32} ${:>6.2}  {}", rec.name, rec.price, rec.store);
        }
    }

    println!("{} competing offer(s) considered", resolution.deals.len());
}

fn print_search(items: &[CanonicalItem]) {
    if items.is_empty() {
        println!("no results");
        return;
    }
    for item in items {
        let store = item.store.as_deref().unwrap_or("-");
        println!("  {:<40} ${:>6.2}  {}", item.name, item.price, store);
    }
    println!("{} result(s)", items.len());
}
