// 🚫 Exclusion List - book ids permanently removed from the migration
// Optional: a missing file means nothing is excluded

use crate::error::{Result, SeedError};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

/// Set of excluded book ids
pub type ExclusionSet = HashSet<String>;

/// Load a newline-delimited id list, skipping blank lines and `#` comments
pub fn load_exclusion_list(path: &Path) -> Result<ExclusionSet> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "No exclusion list found, nothing excluded");
            return Ok(ExclusionSet::new());
        }
        Err(source) => {
            return Err(SeedError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let excluded = parse_exclusion_list(&contents);
    info!(path = %path.display(), count = excluded.len(), "Loaded book exclusion list");
    Ok(excluded)
}

/// Parse exclusion list contents
pub fn parse_exclusion_list(contents: &str) -> ExclusionSet {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
