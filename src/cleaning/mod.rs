//! Repair of raw date cells and extraction of temporal features.
//!
//! - [`DatetimeRepair`]: raw cell → [`crate::types::Timestamp`] under the sentinel policy
//! - [`FeatureExtractor`]: timestamps → [`crate::types::DerivedFeatures`], plus the cleaning
//!   pass that drops visits without them

pub mod datetime;
pub mod features;

pub use datetime::{repair, DatetimeRepair};
pub use features::{check_pair, hour_and_weekday, pair_duration, FeatureExtractor};
