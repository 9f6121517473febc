//! Loading entrypoints.
//!
//! Most callers should use [`load_from_path`] (from [`load`]) which:
//!
//! - reads a delimited file with a header row
//! - maps headers through the active [`crate::columns::ColumnResolver`]
//! - optionally reports success/failure/alerts to a [`LoadObserver`]
//!
//! Rows that are already split can go straight to [`RecordLoader::load_rows`].

pub mod csv;
pub mod load;
pub mod loader;
pub mod observability;

pub use load::{load_from_path, LoadOptions, LoadRequest};
pub use loader::{convert_durations_to_minutes, HeaderLayout, LoaderOptions, RecordLoader, REQUIRED_COLUMNS};
pub use observability::{CompositeObserver, LoadContext, LoadObserver, LoadSeverity, LoadStats, TracingObserver};
