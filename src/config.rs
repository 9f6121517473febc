//! Pipeline configuration.
//!
//! Every run takes an explicit [`PipelineConfig`]; there are no process-wide defaults. Use
//! [`Default`] for the common case or load a TOML file:
//!
//! ```rust
//! use visit_analytics::config::PipelineConfig;
//!
//! let cfg = PipelineConfig::from_toml_str(
//!     r#"
//!     language = "es"
//!     delimiter = ";"
//!     sentinels = [999, -1]
//!
//!     [criteria]
//!     column = "servicio"
//!     values = ["12", "40"]
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(cfg.delimiter_byte().unwrap(), b';');
//! assert!(cfg.sentinels.contains(-1));
//! assert_eq!(cfg.bins.hour, 24);
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::SentinelSet;

/// Formats tried, in order, when repairing date strings.
pub const DEFAULT_DATE_FORMATS: [&str; 11] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d",
    "%d/%m/%Y",
];

/// Top-level configuration for a pipeline run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Language code used to resolve column names (`en`, `es`, or a custom table).
    pub language: String,
    /// Field delimiter of the raw file. Must be a single ASCII character.
    pub delimiter: char,
    /// Codes meaning "not recorded".
    pub sentinels: SentinelSet,
    /// chrono format strings accepted for entry/exit dates.
    pub date_formats: Vec<String>,
    /// Whether a recorded duration column is in seconds and must be converted to minutes.
    pub duration_in_seconds: bool,
    pub criteria: CriteriaConfig,
    pub bins: BinConfig,
    /// Additional column-name tables: `language -> canonical id -> localized name`.
    pub column_names: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            delimiter: ',',
            sentinels: SentinelSet::default(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| (*f).to_string()).collect(),
            duration_in_seconds: false,
            criteria: CriteriaConfig::default(),
            bins: BinConfig::default(),
            column_names: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(input: &str) -> PipelineResult<Self> {
        let cfg: Self = toml::from_str(input)?;
        cfg.delimiter_byte()?;
        Ok(cfg)
    }

    /// Read and parse a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// The delimiter as the byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> PipelineResult<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| PipelineError::InvalidConfig {
                message: format!("delimiter {:?} is not a single ASCII character", self.delimiter),
            })
    }
}

/// Which categorical column to split views by, and on which values.
///
/// With no column or no values, the pipeline produces a single total view.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CriteriaConfig {
    /// Canonical or localized column name.
    pub column: Option<String>,
    pub values: Vec<String>,
    /// Upper bound on the number of per-value views produced.
    pub max_views: usize,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            column: None,
            values: Vec::new(),
            max_views: 5,
        }
    }
}

/// Histogram bin counts per call site.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BinConfig {
    pub hour: usize,
    pub weekday: usize,
    pub interval: usize,
    pub age: usize,
    /// Bin criterion views on the edges of the full dataset instead of their own range.
    pub comparable_edges: bool,
}

impl Default for BinConfig {
    fn default() -> Self {
        Self {
            hour: 24,
            weekday: 7,
            interval: 20,
            age: 10,
            comparable_edges: false,
        }
    }
}
