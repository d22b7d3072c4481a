// 📦 Batch Loader - first-occurrence dedup, then fixed-size bulk inserts
//
// Re-exported or malformed source data routinely repeats keys. Duplicates
// are discarded here so they never reach the store as constraint
// violations. Chunk boundaries depend only on position, never on content.

use crate::error::Result;
use crate::store::{BulkStore, Collection};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Records per bulk-insert call
pub const BATCH_SIZE: usize = 2000;

/// Where the uniqueness key lives in a record.
///
/// With a projection the key is read from `record[projection][key]` and
/// only `record[projection]` is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPath<'a> {
    pub key: &'a str,
    pub projection: Option<&'a str>,
}

impl<'a> KeyPath<'a> {
    pub fn new(key: &'a str) -> Self {
        KeyPath { key, projection: None }
    }

    pub fn projected(projection: &'a str, key: &'a str) -> Self {
        KeyPath {
            key,
            projection: Some(projection),
        }
    }

    fn lookup<'v>(&self, record: &'v Value) -> Option<&'v Value> {
        let scope = match self.projection {
            Some(projection) => record.get(projection)?,
            None => record,
        };
        scope.get(self.key).filter(|v| !v.is_null())
    }
}

/// Counts from loading one collection
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub collection: &'static str,
    pub received: usize,
    pub duplicates: usize,
    pub missing_payload: usize,
    pub inserted: usize,
    pub batches: usize,
}

/// Keep the first record for every key value; records without a key are kept
pub fn dedup_by_key(records: Vec<Value>, path: KeyPath<'_>) -> (Vec<Value>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    let mut duplicates = 0;

    for record in records {
        // JSON text keeps "1" and 1 apart
        let key = path.lookup(&record).map(Value::to_string);
        match key {
            Some(key) => {
                if seen.insert(key) {
                    unique.push(record);
                } else {
                    duplicates += 1;
                }
            }
            None => {
                debug!(key = path.key, "Record has no dedup key, keeping it");
                unique.push(record);
            }
        }
    }

    (unique, duplicates)
}

/// Deduplicate, project and insert `records` in chunks of `BATCH_SIZE`
pub fn bulk_load<S: BulkStore + ?Sized>(
    store: &mut S,
    collection: Collection,
    records: Vec<Value>,
    path: KeyPath<'_>,
) -> Result<LoadReport> {
    let received = records.len();
    let (unique, duplicates) = dedup_by_key(records, path);

    let mut missing_payload = 0;
    let payloads: Vec<Value> = match path.projection {
        None => unique,
        Some(projection) => unique
            .into_iter()
            .filter_map(|mut record| {
                let payload = record
                    .get_mut(projection)
                    .map(Value::take)
                    .filter(|v| !v.is_null());
                if payload.is_none() {
                    missing_payload += 1;
                }
                payload
            })
            .collect(),
    };
    if missing_payload > 0 {
        warn!(
            collection = collection.table(),
            projection = path.projection,
            skipped = missing_payload,
            "Records without a payload were not loaded"
        );
    }

    let mut batches = 0;
    for chunk in payloads.chunks(BATCH_SIZE) {
        store.bulk_insert(collection, chunk)?;
        batches += 1;
        debug!(collection = collection.table(), batch = batches, size = chunk.len(), "Inserted batch");
    }

    let report = LoadReport {
        collection: collection.table(),
        received,
        duplicates,
        missing_payload,
        inserted: payloads.len(),
        batches,
    };
    info!(
        collection = report.collection,
        inserted = report.inserted,
        duplicates = report.duplicates,
        batches = report.batches,
        "Collection loaded"
    );
    Ok(report)
}

/// Serialize typed entities and hand them to `bulk_load`
pub fn load_entities<S: BulkStore + ?Sized, T: Serialize>(
    store: &mut S,
    collection: Collection,
    entities: &[T],
    path: KeyPath<'_>,
) -> Result<LoadReport> {
    let records = entities
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    bulk_load(store, collection, records, path)
}
