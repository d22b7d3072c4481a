// 🗑️ Post-filter - legacy/incorrect printer names that must never be loaded
// Runs after enrichment, so characters are matched on their resolved label

use crate::entities::{Character, Printer};
use tracing::info;

/// Printer names removed from the final load
pub const DELETED_PRINTERS: [&str; 12] = [
    "Astwood, John",
    "Dover, Simon",
    "Harper, Thomas",
    "Leybourne, Robert",
    "Thompson, Mary",
    "Coe, Jane",
    "Hearne, Richard",
    "Mathewes, Augustine",
    "Okes, John",
    "Oulton, Richard",
    "Raworth, John",
    "Raworth, Ruth",
];

/// Exact match against the deletion list
pub fn is_deleted_printer(name: &str) -> bool {
    DELETED_PRINTERS.contains(&name)
}

/// Drop characters labelled with a deleted printer; returns the removed count
pub fn retain_live_characters(characters: &mut Vec<Character>) -> usize {
    let before = characters.len();
    characters.retain(|c| !c.group_label.as_deref().is_some_and(is_deleted_printer));
    let removed = before - characters.len();
    info!(removed, kept = characters.len(), "Post-filtered characters");
    removed
}

/// Drop printers on the deletion list; returns the removed count
pub fn retain_live_printers(printers: &mut Vec<Printer>) -> usize {
    let before = printers.len();
    printers.retain(|p| !is_deleted_printer(&p.printer_string));
    let removed = before - printers.len();
    info!(removed, kept = printers.len(), "Post-filtered printers");
    removed
}
