// 🔤 Character Entity - one extracted type character
// Fields from `character_group` onward are filled in by the enrichment pipeline

use crate::entities::BookCatalog;
use crate::error::{Result, SeedError};
use crate::record::{self, Record, GROUP_ID, GROUP_ID_LEGACY};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Character {
    pub char_id: String,
    pub book_id: String,

    /// Printer reference; either source casing is accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    pub web_url: String,
    pub character_class: String,

    // ========================================================================
    // ENRICHED
    // ========================================================================
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_group: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_label: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,

    #[serde(flatten)]
    pub extra: Record,
}

impl Character {
    /// Build a character from a loose record. `index` is only used in errors.
    pub fn from_record(mut raw: Record, index: usize) -> Result<Self> {
        let missing = |field: &'static str| SeedError::MissingField {
            entity: "character",
            field,
            index,
        };

        let char_id = record::take_key(&mut raw, &["char_id"]).ok_or_else(|| missing("char_id"))?;
        let book_id = record::take_key(&mut raw, &["book_id"]).ok_or_else(|| missing("book_id"))?;
        let group_id = record::take_key(&mut raw, &[GROUP_ID, GROUP_ID_LEGACY]);
        let web_url = record::take_text(&mut raw, "web_url").ok_or_else(|| missing("web_url"))?;
        let character_class =
            record::take_text(&mut raw, "character_class").ok_or_else(|| missing("character_class"))?;

        // Enriched fields are always recomputed
        for key in ["character_group", "group_label", "unique_id", "sequence"] {
            raw.remove(key);
        }

        Ok(Character {
            char_id,
            book_id,
            group_id,
            web_url,
            character_class,
            character_group: None,
            group_label: None,
            unique_id: None,
            sequence: None,
            extra: raw,
        })
    }
}

/// Normalize every raw character whose book is in `books`.
///
/// Characters of excluded or unknown books are dropped before any other
/// field is required, so only `book_id` can fail for them. Returns the
/// kept characters and the number of orphans dropped.
pub fn normalize_characters(raw: Vec<Record>, books: &BookCatalog) -> Result<(Vec<Character>, usize)> {
    let mut characters = Vec::with_capacity(raw.len());
    let mut orphaned = 0;

    for (i, r) in raw.into_iter().enumerate() {
        let book_id = r.get("book_id").and_then(record::key_string).ok_or(SeedError::MissingField {
            entity: "character",
            field: "book_id",
            index: i,
        })?;
        if !books.contains(&book_id) {
            let char_id = r.get("char_id").and_then(record::key_string).unwrap_or_default();
            warn!(%char_id, %book_id, "[migrate] Skipping character of excluded or unknown book");
            orphaned += 1;
            continue;
        }
        characters.push(Character::from_record(r, i)?);
    }

    Ok((characters, orphaned))
}
