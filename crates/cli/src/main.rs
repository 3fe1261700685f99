//! Emporium CLI - Database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! emporium migrate
//!
//! # Load a catalog (categories, products, sections, coupons) from YAML
//! emporium seed catalog demos/catalog.yaml
//! ```
//!
//! Both commands connect with `ADMIN_DATABASE_URL`, falling back to
//! `DATABASE_URL`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "emporium")]
#[command(author, version, about = "Emporium CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Load categories, products, sections and coupons from a YAML file
    Catalog {
        /// Path to the catalog YAML file
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => {
                let summary = commands::seed::catalog(&file).await?;
                tracing::info!(
                    categories = summary.categories,
                    products = summary.products,
                    sections = summary.sections,
                    coupons = summary.coupons,
                    "Seeding complete"
                );
            }
        },
    }
    Ok(())
}
