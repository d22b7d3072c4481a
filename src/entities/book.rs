// 📚 Book Entity - source books and the post-exclusion lookup table

use crate::error::{Result, SeedError};
use crate::exclusion::ExclusionSet;
use crate::record::{self, Record};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// Wrapper around the persisted `book_data` payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub book_id: String,

    /// Payload persisted as the book row; a book without one is never stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_data: Option<Record>,

    #[serde(flatten)]
    pub extra: Record,
}

impl Book {
    /// Build a book from a loose record. `index` is only used in errors.
    pub fn from_record(mut raw: Record, index: usize) -> Result<Self> {
        let book_id = record::take_key(&mut raw, &["book_id"]).ok_or(SeedError::MissingField {
            entity: "book",
            field: "book_id",
            index,
        })?;

        let book_data = match raw.remove("book_data") {
            Some(serde_json::Value::Object(map)) => Some(map),
            _ => None,
        };

        Ok(Book {
            book_id,
            book_data,
            extra: raw,
        })
    }

    /// Earliest publication year
    pub fn year_early(&self) -> Option<i64> {
        self.payload_year("pq_year_early")
    }

    /// Latest publication year
    pub fn year_late(&self) -> Option<i64> {
        self.payload_year("pq_year_late")
    }

    fn payload_year(&self, key: &str) -> Option<i64> {
        self.book_data.as_ref()?.get(key).and_then(record::year_value)
    }
}

/// Books that survived the exclusion list, indexed by book id.
///
/// Built from the filtered list only, so a lookup for an excluded book
/// fails the same way as a lookup for a book that never existed.
#[derive(Debug, Default, Clone)]
pub struct BookCatalog {
    books: Vec<Book>,
    index: HashMap<String, usize>,
    read: usize,
}

impl BookCatalog {
    pub fn get(&self, book_id: &str) -> Option<&Book> {
        self.index.get(book_id).map(|&i| &self.books[i])
    }

    pub fn contains(&self, book_id: &str) -> bool {
        self.index.contains_key(book_id)
    }

    /// Books in the source before exclusion
    pub fn read(&self) -> usize {
        self.read
    }

    /// Books removed by the exclusion list
    pub fn excluded(&self) -> usize {
        self.read - self.books.len()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }
}

/// Normalize raw books, drop excluded ids and index the rest
pub fn ingest_books(raw: Vec<Record>, exclusions: &ExclusionSet) -> Result<BookCatalog> {
    let read = raw.len();
    let mut catalog = BookCatalog {
        read,
        ..Default::default()
    };

    for (i, record) in raw.into_iter().enumerate() {
        let book = Book::from_record(record, i)?;
        if exclusions.contains(&book.book_id) {
            continue;
        }
        let position = catalog.books.len();
        catalog.index.entry(book.book_id.clone()).or_insert(position);
        catalog.books.push(book);
    }

    info!(
        before = read,
        after = catalog.books.len(),
        excluded = catalog.excluded(),
        "Applied book exclusion list"
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_book(id: &str, early: i64, late: i64) -> Record {
        json!({
            "book_id": id,
            "book_data": {"id": id, "pq_year_early": early, "pq_year_late": late}
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_excluded_books_are_not_indexed() {
        let exclusions: ExclusionSet = ["B1".to_string()].into_iter().collect();
        let catalog = ingest_books(
            vec![raw_book("B1", 1600, 1602), raw_book("B2", 1610, 1611)],
            &exclusions,
        )
        .unwrap();

        assert_eq!(catalog.read(), 2);
        assert_eq!(catalog.excluded(), 1);
        assert!(catalog.get("B1").is_none());
        assert_eq!(catalog.get("B2").unwrap().year_early(), Some(1610));
    }

    #[test]
    fn test_numeric_book_id_is_stringified() {
        let raw = json!({"book_id": 77, "book_data": {"pq_year_early": "1599"}})
            .as_object()
            .cloned()
            .unwrap();
        let catalog = ingest_books(vec![raw], &ExclusionSet::new()).unwrap();

        let book = catalog.get("77").unwrap();
        assert_eq!(book.year_early(), Some(1599));
        assert_eq!(book.year_late(), None);
    }

    #[test]
    fn test_missing_book_id_is_fatal() {
        let raw = json!({"book_data": {}}).as_object().cloned().unwrap();
        let err = ingest_books(vec![raw], &ExclusionSet::new()).unwrap_err();
        assert!(matches!(err, SeedError::MissingField { field: "book_id", .. }));
    }

    #[test]
    fn test_book_without_payload_keeps_no_book_data() {
        let raw = json!({"book_id": "B4", "book_data": "n/a"}).as_object().cloned().unwrap();
        let book = Book::from_record(raw, 0).unwrap();

        assert_eq!(book.book_data, None);
        assert_eq!(book.year_early(), None);
        let value = serde_json::to_value(&book).unwrap();
        assert!(value.get("book_data").is_none());
    }
}
