//! In-memory analysis of cleaned visits.
//!
//! The processing layer operates on [`crate::types::CleanedVisit`] values produced by cleaning.
//!
//! Currently implemented:
//!
//! - [`delta`]: inter-arrival deltas over sorted timestamps
//! - [`filter()`]: row filtering by predicate or criterion value
//! - [`reduce()`]: summary statistics (count/sum/min/mean/max/std)
//! - [`Aggregator`]: group-wise statistics
//! - [`bin()`]: equal-width histograms
//!
//! ## Example: sort → deltas → histogram
//!
//! ```rust
//! use chrono::NaiveDate;
//! use visit_analytics::processing::{bin, deltas_seconds, SortedTimestamps};
//!
//! let day = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
//! let sorted = SortedTimestamps::from_unsorted([
//!     day.and_hms_opt(9, 30, 0).unwrap(),
//!     day.and_hms_opt(8, 0, 0).unwrap(),
//!     day.and_hms_opt(8, 10, 0).unwrap(),
//! ]);
//!
//! let secs: Vec<f64> = deltas_seconds(&sorted).into_iter().map(|s| s as f64).collect();
//! assert_eq!(secs, vec![600.0, 4800.0]);
//!
//! let hist = bin(&secs, 2).unwrap();
//! assert_eq!(hist.counts(), vec![1, 1]);
//! ```

pub mod aggregate;
pub mod delta;
pub mod filter;
pub mod histogram;
pub mod reduce;

pub use aggregate::{partition, AggregationTable, Aggregator, GroupRow, GroupValue};
pub use delta::{deltas, deltas_minutes, deltas_seconds, SortedTimestamps};
pub use filter::{filter, filter_by, Filtered};
pub use histogram::{bin, bin_with_edges, BinEdges, HistogramBin, HistogramSpec};
pub use reduce::{reduce, summarize, ReduceOp, Stats};
