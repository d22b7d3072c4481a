// 🧪 Character Enrichment - ordered transforms over each character
//
// Every character first passes the orphan gate: its book must be in the
// post-exclusion catalog, otherwise it is skipped and touches no shared
// state. The surviving character then runs through `PIPELINE` in order.
//
// Two accumulators are threaded through the whole batch:
// - CitationCounter: ORDER-SENSITIVE, hands out sequential suffixes per prefix
// - PrinterYears:    ORDER-INSENSITIVE, running min/max per printer
//
// Both must see characters one at a time. Splitting the batch across
// independent counters would hand out the same suffix twice.

use crate::entities::{Book, BookCatalog, Character, PrinterRegistry};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Label used when a character's printer cannot be resolved
pub const UNKNOWN_PRINTER: &str = "Unknown printer";

/// Path segment between the image host and the image identifier
pub const IIIF_PAGE_IMAGES: &str = "iiif//page_images";

/// Number of trailing URL segments kept by the rewrite
const URL_TAIL_SEGMENTS: usize = 5;

/// Inclusive bounds of the random sequence number
pub const SEQUENCE_RANGE: std::ops::RangeInclusive<u32> = 1..=500_000;

// ============================================================================
// STAGES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Rebuild `web_url` against the image service
    RewriteUrl,

    /// `A_roman` → class `A`, group `roman`
    SplitClass,

    /// Printer display name, or `UNKNOWN_PRINTER`
    ResolveGroupLabel,

    /// `Surname_ClassYear.NNN`
    SynthesizeUniqueId,

    /// Random shuffle key
    AssignSequence,

    /// Widen the printer's attested years
    UpdatePrinterYears,
}

/// Execution order of the transforms
pub const PIPELINE: [Stage; 6] = [
    Stage::RewriteUrl,
    Stage::SplitClass,
    Stage::ResolveGroupLabel,
    Stage::SynthesizeUniqueId,
    Stage::AssignSequence,
    Stage::UpdatePrinterYears,
];

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::RewriteUrl => "rewrite_url",
            Stage::SplitClass => "split_class",
            Stage::ResolveGroupLabel => "resolve_group_label",
            Stage::SynthesizeUniqueId => "synthesize_unique_id",
            Stage::AssignSequence => "assign_sequence",
            Stage::UpdatePrinterYears => "update_printer_years",
        }
    }

    /// Stages that must already have run on the same character.
    /// All stages additionally require the orphan gate, which is enforced
    /// by every stage receiving the resolved `&Book`.
    pub fn requires(&self) -> &'static [Stage] {
        match self {
            // unique id embeds the post-split class and the resolved label
            Stage::SynthesizeUniqueId => &[Stage::SplitClass, Stage::ResolveGroupLabel],
            _ => &[],
        }
    }
}

/// Find the first stage whose requirement has not run before it
pub fn check_order(stages: &[Stage]) -> Result<(), (Stage, Stage)> {
    for (i, stage) in stages.iter().enumerate() {
        for required in stage.requires() {
            if !stages[..i].contains(required) {
                return Err((*stage, *required));
            }
        }
    }
    Ok(())
}

// ============================================================================
// ACCUMULATORS
// ============================================================================

/// Next unused suffix per citation prefix, scoped to one run
#[derive(Debug, Default, Clone)]
pub struct CitationCounter {
    next: HashMap<String, u32>,
}

impl CitationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue `prefix.NNN` and advance the counter for `prefix`
    pub fn issue(&mut self, prefix: &str) -> String {
        let next = self.next.entry(prefix.to_string()).or_insert(1);
        let unique_id = format!("{}.{:03}", prefix, next);
        *next += 1;
        unique_id
    }

    /// Number of distinct prefixes seen
    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }
}

/// Attested year range of one printer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSpan {
    pub early: Option<i64>,
    pub late: Option<i64>,
}

impl YearSpan {
    pub fn include(&mut self, early: Option<i64>, late: Option<i64>) {
        if let Some(early) = early {
            self.early = Some(self.early.map_or(early, |cur| cur.min(early)));
        }
        if let Some(late) = late {
            self.late = Some(self.late.map_or(late, |cur| cur.max(late)));
        }
    }
}

/// Running min/max of book years per printer group id
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PrinterYears {
    spans: HashMap<String, YearSpan>,
}

impl PrinterYears {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, group_id: &str, early: Option<i64>, late: Option<i64>) {
        self.spans
            .entry(group_id.to_string())
            .or_default()
            .include(early, late);
    }

    pub fn get(&self, group_id: &str) -> Option<&YearSpan> {
        self.spans.get(group_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &YearSpan)> {
        self.spans.iter()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

// ============================================================================
// TRANSFORMS
// ============================================================================

/// Keep the last five segments of `url`, turn the first of them into
/// `<stem>.jpg` and prefix the image base and `iiif//page_images`
pub fn rewrite_web_url(url: &str, image_base: &str) -> String {
    let segments: Vec<&str> = url.split('/').collect();
    let tail = &segments[segments.len().saturating_sub(URL_TAIL_SEGMENTS)..];

    let mut parts: Vec<String> = Vec::with_capacity(tail.len() + 2);
    parts.push(image_base.trim_end_matches('/').to_string());
    parts.push(IIIF_PAGE_IMAGES.to_string());

    for (i, segment) in tail.iter().enumerate() {
        if i == 0 {
            parts.push(format!("{}.jpg", file_stem(segment)));
        } else {
            parts.push(segment.to_string());
        }
    }

    parts.join("/")
}

/// File name without its last extension; dotfiles keep their name
fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// Split `class_group` on `_`: first piece is the class, second the group
pub fn split_character_class(raw: &str) -> (String, Option<String>) {
    let mut pieces = raw.split('_');
    let class = pieces.next().unwrap_or_default().to_string();
    let group = pieces.next().map(str::to_string);
    (class, group)
}

/// Surname of a printer label such as `"Okes, Nicholas (the younger)"`.
///
/// Everything from the first `(` is cut, so any number of parenthetical
/// groups never reach the token split. Then everything from the first comma
/// is cut and the last whitespace token is the surname.
pub fn printer_surname(label: &str) -> String {
    let before_paren = label.split('(').next().unwrap_or_default();
    let before_comma = before_paren.split(',').next().unwrap_or_default();

    before_comma
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .to_string()
}

/// First letter upper case, the rest lower case
fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `Surname_ClassYear`, the namespace of one run of unique id suffixes
pub fn citation_prefix(group_label: &str, character_class: &str, year: Option<i64>) -> String {
    let year = year.map(|y| y.to_string()).unwrap_or_default();
    format!(
        "{}_{}{}",
        capitalize(&printer_surname(group_label)),
        character_class,
        year
    )
}

// ============================================================================
// ENRICHER
// ============================================================================

/// Result of enriching one batch
#[derive(Debug, Default)]
pub struct EnrichOutcome {
    pub characters: Vec<Character>,

    /// Characters whose book was excluded or never existed
    pub orphaned: usize,

    /// Characters labelled `UNKNOWN_PRINTER`
    pub unresolved: usize,
}

/// Read-only lookups shared by every character in the batch
pub struct Enricher<'a> {
    books: &'a BookCatalog,
    printers: &'a PrinterRegistry,
    image_base: String,
}

impl<'a> Enricher<'a> {
    pub fn new(books: &'a BookCatalog, printers: &'a PrinterRegistry, image_base: &str) -> Self {
        Enricher {
            books,
            printers,
            image_base: image_base.trim_end_matches('/').to_string(),
        }
    }

    /// Enrich a batch strictly in order against the shared accumulators
    pub fn enrich_all<R: Rng>(
        &self,
        characters: Vec<Character>,
        counter: &mut CitationCounter,
        years: &mut PrinterYears,
        rng: &mut R,
    ) -> EnrichOutcome {
        let mut outcome = EnrichOutcome::default();

        for character in characters {
            match self.enrich(character, counter, years, rng) {
                Some(enriched) => {
                    if enriched.group_label.as_deref() == Some(UNKNOWN_PRINTER) {
                        outcome.unresolved += 1;
                    }
                    outcome.characters.push(enriched);
                }
                None => outcome.orphaned += 1,
            }
        }

        info!(
            enriched = outcome.characters.len(),
            orphaned = outcome.orphaned,
            unresolved = outcome.unresolved,
            prefixes = counter.len(),
            "Characters enriched"
        );
        outcome
    }

    /// Enrich one character; `None` when its book is not in the catalog
    pub fn enrich<R: Rng>(
        &self,
        mut character: Character,
        counter: &mut CitationCounter,
        years: &mut PrinterYears,
        rng: &mut R,
    ) -> Option<Character> {
        let Some(book) = self.books.get(&character.book_id) else {
            warn!(
                char_id = %character.char_id,
                book_id = %character.book_id,
                "[migrate] Skipping character of excluded or unknown book"
            );
            return None;
        };

        for stage in PIPELINE {
            self.apply(stage, &mut character, book, counter, years, rng);
        }
        Some(character)
    }

    fn apply<R: Rng>(
        &self,
        stage: Stage,
        character: &mut Character,
        book: &Book,
        counter: &mut CitationCounter,
        years: &mut PrinterYears,
        rng: &mut R,
    ) {
        match stage {
            Stage::RewriteUrl => {
                character.web_url = rewrite_web_url(&character.web_url, &self.image_base);
            }
            Stage::SplitClass => {
                let (class, group) = split_character_class(&character.character_class);
                character.character_class = class;
                character.character_group = group;
            }
            Stage::ResolveGroupLabel => {
                character.group_label = Some(self.resolve_label(character));
            }
            Stage::SynthesizeUniqueId => {
                let label = character.group_label.as_deref().unwrap_or(UNKNOWN_PRINTER);
                let year = book.year_early();
                if year.is_none() {
                    warn!(
                        char_id = %character.char_id,
                        book_id = %book.book_id,
                        "[migrate] Book has no pq_year_early, citation has no year"
                    );
                }
                let prefix = citation_prefix(label, &character.character_class, year);
                character.unique_id = Some(counter.issue(&prefix));
            }
            Stage::AssignSequence => {
                character.sequence = Some(rng.gen_range(SEQUENCE_RANGE));
            }
            Stage::UpdatePrinterYears => {
                let resolved = character
                    .group_id
                    .as_deref()
                    .and_then(|gid| self.printers.get(gid));
                if let Some(printer) = resolved {
                    years.record(&printer.group_id, book.year_early(), book.year_late());
                }
            }
        }
    }

    fn resolve_label(&self, character: &Character) -> String {
        let Some(gid) = character.group_id.as_deref() else {
            warn!(char_id = %character.char_id, "[migrate] Character missing group id");
            return UNKNOWN_PRINTER.to_string();
        };

        match self.printers.get(gid) {
            Some(printer) => printer.printer_string.clone(),
            None => {
                warn!(
                    char_id = %character.char_id,
                    group_id = gid,
                    "[migrate] Missing printer for group id"
                );
                UNKNOWN_PRINTER.to_string()
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ingest_books;
    use crate::exclusion::ExclusionSet;
    use crate::record::Record;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use serde_json::json;

    const HOST: &str = "https://img.example.com/";

    fn rec(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn catalog(exclusions: &[&str]) -> BookCatalog {
        let exclusions: ExclusionSet = exclusions.iter().map(|s| s.to_string()).collect();
        ingest_books(
            vec![
                rec(json!({"book_id": "B1", "book_data": {"id": 1, "pq_year_early": 1600, "pq_year_late": 1602}})),
                rec(json!({"book_id": "B2", "book_data": {"id": 2, "pq_year_early": 1610, "pq_year_late": 1615}})),
                rec(json!({"book_id": "B3", "book_data": {"id": 3, "pq_year_early": 1590, "pq_year_late": 1591}})),
            ],
            &exclusions,
        )
        .unwrap()
    }

    fn printers() -> PrinterRegistry {
        PrinterRegistry::from_rows(vec![
            rec(json!({"group_id": "P1", "printer_string": "Okes, Nicholas"})),
            rec(json!({"group_ID": "P2", "printer_string": "de Worde, Wynkyn (the elder)"})),
        ])
    }

    fn character(char_id: &str, book_id: &str, group_id: Option<&str>, class: &str) -> Character {
        let mut raw = json!({
            "char_id": char_id,
            "book_id": book_id,
            "web_url": "http://x/scans/page7.tif/full/full/0/default.jpg",
            "character_class": class,
        });
        if let Some(gid) = group_id {
            raw["group_id"] = json!(gid);
        }
        Character::from_record(rec(raw), 0).unwrap()
    }

    #[test]
    fn test_pipeline_order_satisfies_requirements() {
        assert_eq!(check_order(&PIPELINE), Ok(()));
    }

    #[test]
    fn test_unique_id_before_class_split_is_rejected() {
        let bad = [Stage::SynthesizeUniqueId, Stage::SplitClass, Stage::ResolveGroupLabel];
        assert_eq!(
            check_order(&bad),
            Err((Stage::SynthesizeUniqueId, Stage::SplitClass))
        );
    }

    #[test]
    fn test_rewrite_web_url_keeps_five_segments() {
        let url = rewrite_web_url("http://x/a/b/c/d/filename.tif", HOST);
        assert_eq!(url, "https://img.example.com/iiif//page_images/a.jpg/b/c/d/filename.tif");

        let iiif = rewrite_web_url("http://old.host/iiif/2/scans/page7.tif/full/full/0/default.jpg", HOST);
        assert_eq!(
            iiif,
            "https://img.example.com/iiif//page_images/page7.jpg/full/full/0/default.jpg"
        );
    }

    #[test]
    fn test_rewrite_web_url_trims_every_trailing_slash() {
        let url = rewrite_web_url("a.b.tif/full/max/0/default.png", "http://localhost:3000//");
        assert_eq!(url, "http://localhost:3000/iiif//page_images/a.b.jpg/full/max/0/default.png");
    }

    #[test]
    fn test_split_character_class() {
        assert_eq!(split_character_class("A_roman"), ("A".to_string(), Some("roman".to_string())));
        assert_eq!(split_character_class("A_roman_x"), ("A".to_string(), Some("roman".to_string())));
        assert_eq!(split_character_class("ligature"), ("ligature".to_string(), None));
    }

    #[test]
    fn test_printer_surname() {
        assert_eq!(printer_surname("Okes, Nicholas"), "Okes");
        assert_eq!(printer_surname("de Worde, Wynkyn (the elder)"), "Worde");
        assert_eq!(printer_surname("Printer of Hamlet (Q2) (second issue)"), "Hamlet");
        assert_eq!(printer_surname("Unknown printer"), "printer");
        assert_eq!(printer_surname(""), "");
    }

    #[test]
    fn test_citation_prefix() {
        assert_eq!(citation_prefix("OKES, Nicholas", "A", Some(1600)), "Okes_A1600");
        assert_eq!(citation_prefix(UNKNOWN_PRINTER, "b", None), "Printer_b");
    }

    #[test]
    fn test_counter_issues_sequential_suffixes() {
        let mut counter = CitationCounter::new();
        assert_eq!(counter.issue("Okes_A1600"), "Okes_A1600.001");
        assert_eq!(counter.issue("Okes_A1600"), "Okes_A1600.002");
        assert_eq!(counter.issue("Okes_B1600"), "Okes_B1600.001");
        assert_eq!(counter.issue("Okes_A1600"), "Okes_A1600.003");
        assert_eq!(counter.len(), 2);
    }

    #[test]
    fn test_shared_prefix_gets_001_upward_without_repeats() {
        let books = catalog(&[]);
        let printers = printers();
        let enricher = Enricher::new(&books, &printers, HOST);
        let mut counter = CitationCounter::new();
        let mut years = PrinterYears::new();
        let mut rng = StdRng::seed_from_u64(7);

        let batch = (0..12)
            .map(|i| character(&format!("C{}", i), "B1", Some("P1"), "A_roman"))
            .collect();
        let outcome = enricher.enrich_all(batch, &mut counter, &mut years, &mut rng);

        let ids: Vec<String> = outcome
            .characters
            .iter()
            .map(|c| c.unique_id.clone().unwrap())
            .collect();
        let expected: Vec<String> = (1..=12).map(|n| format!("Okes_A1600.{:03}", n)).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_enrich_fills_every_field() {
        let books = catalog(&[]);
        let printers = printers();
        let enricher = Enricher::new(&books, &printers, HOST);
        let mut counter = CitationCounter::new();
        let mut years = PrinterYears::new();
        let mut rng = StdRng::seed_from_u64(1);

        let ch = enricher
            .enrich(character("C1", "B2", Some("P2"), "g_italic"), &mut counter, &mut years, &mut rng)
            .unwrap();

        assert_eq!(ch.web_url, "https://img.example.com/iiif//page_images/page7.jpg/full/full/0/default.jpg");
        assert_eq!(ch.character_class, "g");
        assert_eq!(ch.character_group.as_deref(), Some("italic"));
        assert_eq!(ch.group_label.as_deref(), Some("de Worde, Wynkyn (the elder)"));
        assert_eq!(ch.unique_id.as_deref(), Some("Worde_g1610.001"));
        assert!(SEQUENCE_RANGE.contains(&ch.sequence.unwrap()));
        assert_eq!(years.get("P2"), Some(&YearSpan { early: Some(1610), late: Some(1615) }));
    }

    #[test]
    fn test_unresolved_printer_is_soft() {
        let books = catalog(&[]);
        let printers = printers();
        let enricher = Enricher::new(&books, &printers, HOST);
        let mut counter = CitationCounter::new();
        let mut years = PrinterYears::new();
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = enricher.enrich_all(
            vec![
                character("C1", "B1", None, "A_roman"),
                character("C2", "B1", Some("P404"), "A_roman"),
            ],
            &mut counter,
            &mut years,
            &mut rng,
        );

        assert_eq!(outcome.characters.len(), 2);
        assert_eq!(outcome.unresolved, 2);
        assert_eq!(outcome.characters[0].unique_id.as_deref(), Some("Printer_A1600.001"));
        assert_eq!(outcome.characters[1].unique_id.as_deref(), Some("Printer_A1600.002"));
        assert!(years.is_empty());
    }

    #[test]
    fn test_orphaned_character_touches_no_state() {
        let books = catalog(&["B1"]);
        let printers = printers();
        let enricher = Enricher::new(&books, &printers, HOST);
        let mut counter = CitationCounter::new();
        let mut years = PrinterYears::new();
        let mut rng = StdRng::seed_from_u64(1);

        let outcome = enricher.enrich_all(
            vec![
                character("C1", "B1", Some("P1"), "A_roman"),
                character("C2", "B9", Some("P1"), "A_roman"),
            ],
            &mut counter,
            &mut years,
            &mut rng,
        );

        assert!(outcome.characters.is_empty());
        assert_eq!(outcome.orphaned, 2);
        assert!(counter.is_empty());
        assert!(years.is_empty());
    }

    #[test]
    fn test_printer_years_are_order_independent() {
        let books = catalog(&[]);
        let printers = printers();
        let enricher = Enricher::new(&books, &printers, HOST);

        let batch: Vec<Character> = vec![
            character("C1", "B1", Some("P1"), "A_roman"),
            character("C2", "B2", Some("P1"), "A_roman"),
            character("C3", "B3", Some("P1"), "b_roman"),
            character("C4", "B2", Some("P2"), "b_roman"),
            character("C5", "B3", Some("P2"), "c_roman"),
        ];

        let run = |characters: Vec<Character>| {
            let mut counter = CitationCounter::new();
            let mut years = PrinterYears::new();
            let mut rng = StdRng::seed_from_u64(3);
            enricher.enrich_all(characters, &mut counter, &mut years, &mut rng);
            years
        };

        let baseline = run(batch.clone());
        assert_eq!(baseline.get("P1"), Some(&YearSpan { early: Some(1590), late: Some(1615) }));
        assert_eq!(baseline.get("P2"), Some(&YearSpan { early: Some(1590), late: Some(1615) }));

        let mut shuffle_rng = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            let mut permuted = batch.clone();
            permuted.shuffle(&mut shuffle_rng);
            assert_eq!(run(permuted), baseline);
        }
        for span in baseline.iter().map(|(_, s)| s) {
            assert!(span.early <= span.late);
        }
    }
}
