// 🖨️ Printer Entity - one row of the printer table, keyed by group id
//
// The source table spells its id column either `group_id` or `group_ID`.
// Casing is reconciled here, before the lookup table exists, so nothing
// downstream ever has to care which spelling a file used.

use crate::enrichment::{PrinterYears, YearSpan};
use crate::record::{self, Record, GROUP_ID, GROUP_ID_LEGACY};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

// ============================================================================
// PRINTER ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Printer {
    /// Identity referenced by characters
    pub group_id: String,

    /// Display name, "Surname, Forename" with optional parenthetical suffix
    #[serde(default)]
    pub printer_string: String,

    /// Earliest book year this printer is attested in
    #[serde(default)]
    pub pq_year_early: Option<i64>,

    /// Latest book year this printer is attested in
    #[serde(default)]
    pub pq_year_late: Option<i64>,

    /// Remaining source columns, persisted untouched
    #[serde(flatten)]
    pub extra: Record,
}

impl Printer {
    /// Build a printer from a loose row; the row comes back when no group id resolves
    pub fn from_record(mut row: Record) -> Result<Self, Record> {
        record::normalize_group_id(&mut row);
        let has_id = row.get(GROUP_ID).and_then(record::key_string).is_some();
        if !has_id {
            return Err(row);
        }
        let group_id = record::take_key(&mut row, &[GROUP_ID, GROUP_ID_LEGACY]).unwrap_or_default();
        let printer_string = record::take_text(&mut row, "printer_string").unwrap_or_default();
        let pq_year_early = record::take_year(&mut row, "pq_year_early");
        let pq_year_late = record::take_year(&mut row, "pq_year_late");

        Ok(Printer {
            group_id,
            printer_string,
            pq_year_early,
            pq_year_late,
            extra: row,
        })
    }

    /// Widen the attested year range to include `early..=late`
    pub fn include_years(&mut self, early: Option<i64>, late: Option<i64>) {
        let mut span = YearSpan {
            early: self.pq_year_early,
            late: self.pq_year_late,
        };
        span.include(early, late);
        self.pq_year_early = span.early;
        self.pq_year_late = span.late;
    }
}

// ============================================================================
// PRINTER REGISTRY
// ============================================================================

/// Printers in source order plus two group id indexes.
///
/// When a group id repeats, the last row answers lookups (label resolution)
/// while the first row, the one the loader keeps after deduplication,
/// receives the aggregate years.
#[derive(Debug, Default, Clone)]
pub struct PrinterRegistry {
    printers: Vec<Printer>,
    index: HashMap<String, usize>,
    persisted: HashMap<String, usize>,
    dropped: usize,
}

impl PrinterRegistry {
    /// Normalize raw printer rows; rows without a group id are logged and dropped
    pub fn from_rows(rows: Vec<Record>) -> Self {
        let mut registry = PrinterRegistry::default();

        for row in rows {
            match Printer::from_record(row) {
                Ok(printer) => registry.register(printer),
                Err(row) => {
                    let row = serde_json::Value::Object(row);
                    warn!(%row, "[migrate] Printer row missing group_id");
                    registry.dropped += 1;
                }
            }
        }

        info!(
            printers = registry.printers.len(),
            dropped = registry.dropped,
            "Printer table normalized"
        );
        registry
    }

    fn register(&mut self, printer: Printer) {
        let position = self.printers.len();
        self.index.insert(printer.group_id.clone(), position);
        self.persisted.entry(printer.group_id.clone()).or_insert(position);
        self.printers.push(printer);
    }

    /// Look up a printer by group id
    pub fn get(&self, group_id: &str) -> Option<&Printer> {
        self.index.get(group_id).map(|&i| &self.printers[i])
    }

    /// Fold accumulated year spans into the first row of each group id
    pub fn apply_years(&mut self, years: &PrinterYears) {
        for (group_id, span) in years.iter() {
            if let Some(&i) = self.persisted.get(group_id) {
                self.printers[i].include_years(span.early, span.late);
            }
        }
    }

    /// Rows dropped for lacking a group id
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.printers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.printers.is_empty()
    }

    pub fn printers(&self) -> &[Printer] {
        &self.printers
    }

    pub fn into_printers(self) -> Vec<Printer> {
        self.printers
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_legacy_casing_is_reachable_by_group_id() {
        let registry = PrinterRegistry::from_rows(vec![row(json!({
            "group_ID": "P12",
            "printer_string": "Okes, Nicholas"
        }))]);

        let printer = registry.get("P12").expect("printer should be indexed");
        assert_eq!(printer.group_id, "P12");
        assert_eq!(printer.printer_string, "Okes, Nicholas");
        assert!(!printer.extra.contains_key("group_ID"));
    }

    #[test]
    fn test_rows_without_any_id_are_dropped() {
        let registry = PrinterRegistry::from_rows(vec![
            row(json!({"printer_string": "Nobody, Anne"})),
            row(json!({"group_id": "", "group_ID": "", "printer_string": "Blank, Ben"})),
            row(json!({"group_id": "P1", "printer_string": "Jaggard, William"})),
        ]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.dropped(), 2);
        assert!(registry.printers().iter().all(|p| p.group_id == "P1"));
    }

    #[test]
    fn test_last_row_answers_repeated_group_id() {
        let registry = PrinterRegistry::from_rows(vec![
            row(json!({"group_id": "P1", "printer_string": "First, A"})),
            row(json!({"group_id": "P1", "printer_string": "Second, B"})),
        ]);

        assert_eq!(registry.get("P1").unwrap().printer_string, "Second, B");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_years_land_on_first_row_of_repeated_group_id() {
        let mut registry = PrinterRegistry::from_rows(vec![
            row(json!({"group_id": "P1", "printer_string": "First, A"})),
            row(json!({"group_id": "P1", "printer_string": "Second, B"})),
        ]);
        let mut years = PrinterYears::new();
        years.record("P1", Some(1600), Some(1604));
        registry.apply_years(&years);

        let printers = registry.printers();
        assert_eq!(printers[0].pq_year_early, Some(1600));
        assert_eq!(printers[0].pq_year_late, Some(1604));
        assert_eq!(printers[1].pq_year_early, None);
    }

    #[test]
    fn test_include_years_widens_range() {
        let mut printer = Printer::from_record(row(json!({"group_id": "P1"}))).unwrap();
        assert_eq!(printer.pq_year_early, None);

        printer.include_years(Some(1610), Some(1612));
        printer.include_years(Some(1605), Some(1608));
        printer.include_years(None, Some(1620));

        assert_eq!(printer.pq_year_early, Some(1605));
        assert_eq!(printer.pq_year_late, Some(1620));
    }

    #[test]
    fn test_existing_year_columns_are_parsed() {
        let printer = Printer::from_record(row(json!({
            "group_id": "P3",
            "pq_year_early": "1590",
            "pq_year_late": ""
        })))
        .unwrap();

        assert_eq!(printer.pq_year_early, Some(1590));
        assert_eq!(printer.pq_year_late, None);
    }
}
