// 📂 Source Readers - JSON arrays and CSV tables → loose records
// Any read or decode failure here is fatal for the run

use crate::error::{Result, SeedError};
use crate::record::Record;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read a JSON file whose top level is an array of objects
pub fn read_json_records(path: &Path) -> Result<Vec<Record>> {
    let contents = fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_json_records(&contents).map_err(|e| match e {
        SeedError::Json { source, .. } => SeedError::Json {
            path: path.to_path_buf(),
            source,
        },
        SeedError::NotAnArray { .. } => SeedError::NotAnArray {
            path: path.to_path_buf(),
        },
        other => other,
    })
}

/// Parse JSON text into records; non-object array items are skipped
pub fn parse_json_records(contents: &str) -> Result<Vec<Record>> {
    let value: Value = serde_json::from_str(contents).map_err(|source| SeedError::Json {
        path: Default::default(),
        source,
    })?;

    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()),
        _ => Err(SeedError::NotAnArray {
            path: Default::default(),
        }),
    }
}

/// Read a comma-delimited CSV file with a header row
pub fn read_csv_records(path: &Path) -> Result<Vec<Record>> {
    let rdr = csv::Reader::from_path(path).map_err(|source| SeedError::Csv {
        path: path.to_path_buf(),
        source,
    })?;

    collect_csv_records(rdr).map_err(|source| SeedError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse CSV text (header row first) into records
pub fn parse_csv_records(contents: &str) -> std::result::Result<Vec<Record>, csv::Error> {
    collect_csv_records(csv::Reader::from_reader(contents.as_bytes()))
}

fn collect_csv_records<R: std::io::Read>(
    mut rdr: csv::Reader<R>,
) -> std::result::Result<Vec<Record>, csv::Error> {
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;

        // Skip rows that are nothing but empty cells
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| (header.clone(), Value::String(cell.to_string())))
            .collect();
        records.push(record);
    }

    Ok(records)
}
