//! Runtime configuration loaded from TOML.
//!
//! Every section has defaults, so an absent file or an empty file yields a
//! working configuration backed by a local CSV catalog.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::format::TELEGRAM_MAX_MESSAGE_LEN;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub geocoder: GeocoderConfig,
    pub formatter: FormatterConfig,
    pub telegram: TelegramConfig,
}

/// Which catalog backend serves cell queries.
#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum CatalogConfig {
    /// In-memory catalog loaded from a CSV (or CSV.gz) file at startup
    Csv { path: PathBuf },
    /// Elasticsearch index populated by the `ingest` binary
    Elasticsearch {
        es_url: String,
        index: String,
        /// Hits fetched per search request; larger cells are paged
        #[serde(default = "default_page_size")]
        page_size: usize,
    },
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig::Csv {
            path: PathBuf::from("food_recommendations.csv"),
        }
    }
}

fn default_page_size() -> usize {
    1_000
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    /// OneMap search endpoint
    pub base_url: String,
    pub timeout_secs: u64,
    /// Prefix applied to bare six-digit postal codes before geocoding
    pub postal_code_prefix: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.onemap.gov.sg/api/common/elastic/search".to_string(),
            timeout_secs: 10,
            postal_code_prefix: "Singapore".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FormatterConfig {
    pub max_chunk_size: NonZeroUsize,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: TELEGRAM_MAX_MESSAGE_LEN,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_url: String,
    /// Long-poll timeout passed to getUpdates
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file).unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.formatter.max_chunk_size.get(), 4096);
        assert_eq!(config.geocoder.postal_code_prefix, "Singapore");
        assert!(matches!(config.catalog, CatalogConfig::Csv { .. }));
    }

    #[test]
    fn test_elasticsearch_backend() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[catalog]
backend = "elasticsearch"
es_url = "http://localhost:9200"
index = "food"

[formatter]
max_chunk_size = 1000

[telegram]
poll_timeout_secs = 5
"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        match config.catalog {
            CatalogConfig::Elasticsearch {
                es_url,
                index,
                page_size,
            } => {
                assert_eq!(es_url, "http://localhost:9200");
                assert_eq!(index, "food");
                assert_eq!(page_size, 1_000);
            }
            other => panic!("unexpected backend: {:?}", other),
        }
        assert_eq!(config.formatter.max_chunk_size.get(), 1000);
        assert_eq!(config.telegram.poll_timeout_secs, 5);
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[formatter]\nmax_chunk_size = 0\n").unwrap();
        assert!(Config::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::load_from_file("/nonexistent/nearby.toml").is_err());
    }
}
