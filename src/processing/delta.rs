//! Inter-arrival deltas between consecutive visits.

use chrono::{NaiveDateTime, TimeDelta};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{Checked, CleanedVisit, Timestamp};

/// A timestamp sequence whose valid entries never decrease.
///
/// Invalid entries may appear anywhere; they only break the deltas next to them.
#[derive(Debug, Clone, PartialEq)]
pub struct SortedTimestamps(Vec<Timestamp>);

impl SortedTimestamps {
    /// Wrap an already ordered sequence, checking the order.
    pub fn new(timestamps: Vec<Timestamp>) -> PipelineResult<Self> {
        let mut last: Option<&NaiveDateTime> = None;
        for (index, t) in timestamps.iter().enumerate() {
            if let Checked::Valid(t) = t {
                if last.is_some_and(|prev| t < prev) {
                    return Err(PipelineError::UnsortedInput { index });
                }
                last = Some(t);
            }
        }
        Ok(Self(timestamps))
    }

    /// Sort valid timestamps ascending.
    pub fn from_unsorted(times: impl IntoIterator<Item = NaiveDateTime>) -> Self {
        let mut times: Vec<NaiveDateTime> = times.into_iter().collect();
        times.sort();
        Self(times.into_iter().map(Checked::Valid).collect())
    }

    /// Entry times of visits, sorted.
    pub fn from_visits<'a>(visits: impl IntoIterator<Item = &'a CleanedVisit>) -> Self {
        Self::from_unsorted(visits.into_iter().map(|v| v.entry))
    }

    pub fn as_slice(&self) -> &[Timestamp] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// `timestamps[i + 1] - timestamps[i]` for each adjacent pair where both sides are valid.
pub fn deltas(sorted: &SortedTimestamps) -> Vec<TimeDelta> {
    sorted
        .0
        .windows(2)
        .filter_map(|pair| match (&pair[0], &pair[1]) {
            (Checked::Valid(before), Checked::Valid(later)) => Some(*later - *before),
            _ => None,
        })
        .collect()
}

/// [`deltas`] in fractional minutes.
pub fn deltas_minutes(sorted: &SortedTimestamps) -> Vec<f64> {
    deltas(sorted)
        .into_iter()
        .map(|d| d.num_milliseconds() as f64 / 60_000.0)
        .collect()
}

/// [`deltas`] in whole seconds.
pub fn deltas_seconds(sorted: &SortedTimestamps) -> Vec<i64> {
    deltas(sorted).into_iter().map(|d| d.num_seconds()).collect()
}
