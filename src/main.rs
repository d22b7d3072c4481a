use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;

use printer_seed::logging::init_logging;
use printer_seed::{
    run_seed, BulkStore, MemoryStore, SeedConfig, SeedInputs, SeedReport, SeedRun, SqliteStore,
};

#[derive(Parser)]
#[command(name = "printer-seed")]
#[command(about = "Seed the printers/characters/books store from the source data files")]
#[command(version)]
struct Cli {
    /// Directory holding books.json, extracted_character_data.json and cdt_printers.csv
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// SQLite database to load into
    #[arg(long)]
    database: Option<PathBuf>,

    /// Newline-delimited list of excluded book ids
    #[arg(long)]
    exclusions: Option<PathBuf>,

    /// Keep existing rows instead of clearing every collection first
    #[arg(long)]
    append: bool,

    /// Run the pipeline against an in-memory store and only print the report
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let mut config = SeedConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(exclusions) = cli.exclusions {
        config.exclusion_file = Some(exclusions);
    }

    println!("🌱 Seeding {:?} environment", config.environment);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let paths = config.source_paths();
    let inputs = SeedInputs::read(&paths)
        .with_context(|| format!("Failed to read sources from {}", config.data_dir.display()))?;
    let image_base = config.image_base();
    let started_at = Utc::now();
    let mut rng = rand::thread_rng();

    let report = if cli.dry_run {
        let mut store = MemoryStore::new();
        seed_into(&mut store, inputs, &image_base, &mut rng)?
    } else {
        let mut store = SqliteStore::open(&config.database)
            .with_context(|| format!("Failed to open {}", config.database.display()))?;
        if !cli.append {
            store.clear().context("Failed to clear collections")?;
        }
        let report = seed_into(&mut store, inputs, &image_base, &mut rng)?;
        store
            .record_run(&SeedRun::new(started_at, serde_json::to_value(&report)?))
            .context("Failed to record seed run")?;
        report
    };

    print_report(&report);
    println!("\n✅ Seed complete");
    Ok(())
}

fn seed_into<S: BulkStore>(
    store: &mut S,
    inputs: SeedInputs,
    image_base: &str,
    rng: &mut rand::rngs::ThreadRng,
) -> Result<SeedReport> {
    run_seed(inputs, image_base, store, rng).context("Seeding aborted")
}

fn print_report(report: &SeedReport) {
    println!("\n📚 Books: {} read, {} excluded", report.books_read, report.books_excluded);
    println!(
        "🔤 Characters: {} read, {} orphaned, {} unknown printer, {} deleted",
        report.characters_read,
        report.characters_orphaned,
        report.characters_unresolved,
        report.characters_deleted
    );
    println!(
        "🖨️  Printers: {} read, {} without id, {} deleted",
        report.printers_read, report.printers_dropped, report.printers_deleted
    );
    for load in &report.loads {
        println!(
            "✓ {}: {} inserted in {} batches ({} duplicates skipped)",
            load.collection, load.inserted, load.batches, load.duplicates
        );
    }
}
