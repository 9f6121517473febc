//! `visit-analytics` cleans timestamped hospital visit records and turns them into temporal
//! features and summaries for a reporting layer.
//!
//! The primary entrypoint is [`pipeline::Pipeline`], built from an explicit
//! [`config::PipelineConfig`]. A run:
//!
//! 1. loads delimited rows into [`types::VisitRecord`]s, mapping headers through the active
//!    language's column names ([`columns`], [`ingestion`])
//! 2. repairs entry/exit dates under the sentinel policy and derives hour, weekday and
//!    duration ([`cleaning`])
//! 3. orders visits by entry time and computes inter-arrival deltas, group-wise statistics and
//!    histograms ([`processing`])
//!
//! Bad data never fails a run. Empty cells, sentinel codes (default `999`) and unparsable
//! dates become [`types::Checked::Invalid`] markers and are counted in a
//! [`types::CleaningReport`]. Only contract violations (unknown column, unsupported language,
//! zero bins, ...) are returned as [`PipelineError`].
//!
//! ## Quick example
//!
//! ```no_run
//! use visit_analytics::config::PipelineConfig;
//! use visit_analytics::pipeline::Pipeline;
//!
//! # fn main() -> Result<(), visit_analytics::PipelineError> {
//! let config = PipelineConfig::from_path("visits.toml")?;
//! let output = Pipeline::new(config)?.run_from_path("visits.csv")?;
//! println!("retained={}", output.report.cleaning.retained);
//! println!("{}", output.report.to_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Building blocks
//!
//! Each stage is usable on its own:
//!
//! ```rust
//! use visit_analytics::cleaning::DatetimeRepair;
//! use visit_analytics::types::{Checked, InvalidReason};
//!
//! let repair = DatetimeRepair::default();
//! assert!(repair.repair("2021-03-01 08:30:00").is_valid());
//! assert_eq!(repair.repair("999"), Checked::Invalid(InvalidReason::Sentinel(999)));
//! assert_eq!(repair.repair(""), Checked::Invalid(InvalidReason::Empty));
//! ```
//!
//! ## Modules
//!
//! - [`columns`]: canonical columns and their localized names
//! - [`config`]: run configuration (TOML)
//! - [`ingestion`]: CSV loading and load observers
//! - [`cleaning`]: date repair and feature extraction
//! - [`processing`]: deltas, filtering, aggregation and histograms
//! - [`execution`]: parallel cleaning and grouping with metrics
//! - [`pipeline`]: the end-to-end run and its serializable report
//! - [`error`]: the crate error type

pub mod cleaning;
pub mod columns;
pub mod config;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod pipeline;
pub mod processing;
pub mod types;

pub use error::{PipelineError, PipelineResult};
