// 🌱 Seed Orchestration - one full reload of books, characters and printers
//
// Order of a run:
//   1. printers normalized into a lookup table
//   2. books filtered by the exclusion list, indexed, loaded
//   3. orphans dropped, characters normalized and enriched one at a time
//   4. printer years folded in from the enrichment accumulator
//   5. deletion list applied to characters and printers
//   6. characters loaded, then printers
//
// There is no rollback: a failing batch leaves earlier batches committed.

use crate::config::SourcePaths;
use crate::enrichment::{CitationCounter, Enricher, PrinterYears, PIPELINE};
use crate::entities::{ingest_books, normalize_characters, PrinterRegistry};
use crate::error::Result;
use crate::exclusion::{load_exclusion_list, ExclusionSet};
use crate::loader::{load_entities, KeyPath, LoadReport};
use crate::post_filter::{retain_live_characters, retain_live_printers};
use crate::record::Record;
use crate::sources::{read_csv_records, read_json_records};
use crate::store::{BulkStore, Collection};
use rand::Rng;
use serde::Serialize;
use tracing::info;

/// Everything a run reads, already decoded
#[derive(Debug, Default, Clone)]
pub struct SeedInputs {
    pub books: Vec<Record>,
    pub characters: Vec<Record>,
    pub printers: Vec<Record>,
    pub exclusions: ExclusionSet,
}

impl SeedInputs {
    /// Read all sources; a missing exclusion file means no exclusions
    pub fn read(paths: &SourcePaths) -> Result<Self> {
        let exclusions = load_exclusion_list(&paths.exclusions)?;
        let printers = read_csv_records(&paths.printers)?;
        let books = read_json_records(&paths.books)?;
        let characters = read_json_records(&paths.characters)?;

        info!(
            books = books.len(),
            characters = characters.len(),
            printers = printers.len(),
            exclusions = exclusions.len(),
            "Sources read"
        );

        Ok(SeedInputs {
            books,
            characters,
            printers,
            exclusions,
        })
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct SeedReport {
    pub books_read: usize,
    pub books_excluded: usize,
    pub characters_read: usize,
    pub characters_orphaned: usize,
    pub characters_unresolved: usize,
    pub characters_deleted: usize,
    pub printers_read: usize,
    pub printers_dropped: usize,
    pub printers_deleted: usize,
    pub citation_prefixes: usize,
    pub stages: Vec<&'static str>,
    pub loads: Vec<LoadReport>,
}

impl SeedReport {
    pub fn load(&self, collection: Collection) -> Option<&LoadReport> {
        self.loads.iter().find(|l| l.collection == collection.table())
    }
}

/// Run the whole seed against `store`
pub fn run_seed<S: BulkStore + ?Sized, R: Rng>(
    inputs: SeedInputs,
    image_base: &str,
    store: &mut S,
    rng: &mut R,
) -> Result<SeedReport> {
    let mut report = SeedReport {
        characters_read: inputs.characters.len(),
        printers_read: inputs.printers.len(),
        stages: PIPELINE.iter().map(|s| s.name()).collect(),
        ..Default::default()
    };

    // 1. Printers
    let mut printers = PrinterRegistry::from_rows(inputs.printers);
    report.printers_dropped = printers.dropped();

    // 2. Books
    let books = ingest_books(inputs.books, &inputs.exclusions)?;
    report.books_read = books.read();
    report.books_excluded = books.excluded();
    let book_load = load_entities(
        store,
        Collection::Books,
        books.books(),
        KeyPath::projected("book_data", "id"),
    )?;
    report.loads.push(book_load);

    // 3. Characters
    let (characters, orphaned) = normalize_characters(inputs.characters, &books)?;
    let mut counter = CitationCounter::new();
    let mut years = PrinterYears::new();
    let outcome = {
        let enricher = Enricher::new(&books, &printers, image_base);
        enricher.enrich_all(characters, &mut counter, &mut years, rng)
    };
    report.characters_orphaned = orphaned + outcome.orphaned;
    report.characters_unresolved = outcome.unresolved;
    report.citation_prefixes = counter.len();

    // 4. Printer years
    printers.apply_years(&years);

    // 5. Deletion list
    let mut characters = outcome.characters;
    report.characters_deleted = retain_live_characters(&mut characters);
    let mut printers = printers.into_printers();
    report.printers_deleted = retain_live_printers(&mut printers);

    // 6. Load
    let character_load = load_entities(store, Collection::Characters, &characters, KeyPath::new("char_id"))?;
    report.loads.push(character_load);

    let printer_load = load_entities(store, Collection::Printers, &printers, KeyPath::new("group_id"))?;
    report.loads.push(printer_load);

    info!("Database has been initialized.");
    Ok(report)
}
