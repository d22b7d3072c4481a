// Entity Models - books, printers, characters
//
// Each entity is normalized from a loose source record into a typed value
// before the pipeline touches it. Books and printers also get a lookup
// table keyed by their identity.

pub mod book;
pub mod character;
pub mod printer;

pub use book::{ingest_books, Book, BookCatalog};
pub use character::{normalize_characters, Character};
pub use printer::{Printer, PrinterRegistry};
