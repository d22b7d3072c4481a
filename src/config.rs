// ⚙️ Configuration - environment variables, overridable from the CLI

use std::env;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_DATA_DIR: &str = "dldt_data";
pub const DEFAULT_DATABASE: &str = "seed.db";

pub const BOOKS_FILE: &str = "books.json";
pub const CHARACTERS_FILE: &str = "extracted_character_data.json";
pub const PRINTERS_FILE: &str = "cdt_printers.csv";
pub const EXCLUSIONS_FILE: &str = "excluded_books.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Only the literal `development` selects development
    pub fn from_app_env(value: Option<&str>) -> Self {
        match value {
            Some("development") => Environment::Development,
            _ => Environment::Production,
        }
    }
}

/// Input files of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub books: PathBuf,
    pub characters: PathBuf,
    pub printers: PathBuf,
    pub exclusions: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub environment: Environment,

    /// Local API base, used in development to avoid CORS
    pub api_base_url: Option<String>,

    /// Production image host
    pub iiif_host: Option<String>,

    pub data_dir: PathBuf,

    /// Explicit exclusion file; defaults to one inside `data_dir`
    pub exclusion_file: Option<PathBuf>,

    pub database: PathBuf,
}

impl SeedConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key → value lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        SeedConfig {
            environment: Environment::from_app_env(lookup("APP_ENV").as_deref()),
            api_base_url: non_empty("API_BASE_URL"),
            iiif_host: non_empty("IIIF_HOST"),
            data_dir: non_empty("SEED_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            exclusion_file: non_empty("SEED_EXCLUSION_FILE").map(PathBuf::from),
            database: non_empty("SEED_DATABASE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
        }
    }

    /// Image base for rewritten URLs, trailing slashes trimmed
    pub fn image_base(&self) -> String {
        let (name, host) = match self.environment {
            Environment::Development => ("API_BASE_URL", &self.api_base_url),
            Environment::Production => ("IIIF_HOST", &self.iiif_host),
        };

        match host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => {
                warn!(variable = name, "Image host not configured, rewritten URLs will be relative");
                String::new()
            }
        }
    }

    pub fn source_paths(&self) -> SourcePaths {
        SourcePaths {
            books: self.data_dir.join(BOOKS_FILE),
            characters: self.data_dir.join(CHARACTERS_FILE),
            printers: self.data_dir.join(PRINTERS_FILE),
            exclusions: self
                .exclusion_file
                .clone()
                .unwrap_or_else(|| self.data_dir.join(EXCLUSIONS_FILE)),
        }
    }
}
