//! Row filtering for cleaned visits.

use crate::columns::Column;
use crate::error::{PipelineError, PipelineResult};
use crate::types::CleanedVisit;

use super::aggregate::GroupValue;

/// Result of a criterion filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filtered<'a> {
    /// At least one visit matched.
    Matches(Vec<&'a CleanedVisit>),
    /// Nothing matched; no statistics should be computed for this view.
    NoData,
}

impl<'a> Filtered<'a> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Filtered::NoData)
    }

    pub fn len(&self) -> usize {
        match self {
            Filtered::Matches(visits) => visits.len(),
            Filtered::NoData => 0,
        }
    }

    /// The matching visits; empty for [`Filtered::NoData`].
    pub fn visits(&self) -> &[&'a CleanedVisit] {
        match self {
            Filtered::Matches(visits) => visits,
            Filtered::NoData => &[],
        }
    }
}

/// Visits for which `predicate` returns `true`.
pub fn filter<'a, I, F>(visits: I, mut predicate: F) -> Filtered<'a>
where
    I: IntoIterator<Item = &'a CleanedVisit>,
    F: FnMut(&CleanedVisit) -> bool,
{
    let matches: Vec<&CleanedVisit> = visits.into_iter().filter(|v| predicate(*v)).collect();
    if matches.is_empty() {
        Filtered::NoData
    } else {
        Filtered::Matches(matches)
    }
}

/// Visits whose `column` equals `value`.
///
/// `column` must be groupable. Visits with an invalid value in `column` only match
/// [`GroupValue::Missing`].
pub fn filter_by<'a, I>(visits: I, column: Column, value: &GroupValue) -> PipelineResult<Filtered<'a>>
where
    I: IntoIterator<Item = &'a CleanedVisit>,
{
    if !column.is_groupable() {
        return Err(PipelineError::NotGroupable {
            column: column.canonical_id().to_string(),
        });
    }
    Ok(filter(visits, |v| {
        GroupValue::of(v, column).is_ok_and(|key| key == *value)
    }))
}
