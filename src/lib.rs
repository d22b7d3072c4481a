// Printer Seed - Core Library
// One-shot seeding of the printers / characters / books store

pub mod config;
pub mod enrichment;
pub mod entities;
pub mod error;
pub mod exclusion;
pub mod loader;
pub mod logging;
pub mod post_filter;
pub mod record;
pub mod seed;
pub mod sources;
pub mod store;

// Re-export commonly used types
pub use config::{Environment, SeedConfig, SourcePaths};
pub use enrichment::{
    check_order, CitationCounter, EnrichOutcome, Enricher, PrinterYears, Stage, YearSpan,
    PIPELINE, UNKNOWN_PRINTER,
};
pub use entities::{
    ingest_books, normalize_characters, Book, BookCatalog, Character, Printer, PrinterRegistry,
};
pub use error::{Result, SeedError};
pub use exclusion::{load_exclusion_list, ExclusionSet};
pub use loader::{bulk_load, dedup_by_key, load_entities, KeyPath, LoadReport, BATCH_SIZE};
pub use post_filter::{is_deleted_printer, DELETED_PRINTERS};
pub use record::Record;
pub use seed::{run_seed, SeedInputs, SeedReport};
pub use store::{BulkStore, Collection, MemoryStore, SeedRun, SqliteStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
