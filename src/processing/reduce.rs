//! Summary statistics over a numeric column.

use serde::Serialize;

use crate::columns::Column;
use crate::types::{numeric_values, CleanedVisit};

/// Built-in reductions over a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Count all rows (including those without a valid value).
    Count,
    /// Sum of valid values.
    Sum,
    /// Minimum valid value.
    Min,
    /// Maximum valid value.
    Max,
    /// Mean of valid values.
    Mean,
    /// Sample standard deviation of valid values.
    Std,
}

/// Statistics for one group of rows.
///
/// `count` is the number of rows; the other fields only see valid values and are `None` when
/// there are none. `std` is the sample standard deviation and is undefined below two values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub count: usize,
    pub valid: usize,
    pub sum: Option<f64>,
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
    pub std: Option<f64>,
}

impl Stats {
    /// Summarize `values` observed over `rows` rows.
    pub fn from_values(rows: usize, values: &[f64]) -> Self {
        let valid = values.len();
        if valid == 0 {
            return Self {
                count: rows,
                valid,
                sum: None,
                min: None,
                mean: None,
                max: None,
                std: None,
            };
        }

        let sum: f64 = values.iter().sum();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = sum / valid as f64;
        let std = (valid >= 2).then(|| {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (valid - 1) as f64).sqrt()
        });

        Self {
            count: rows,
            valid,
            sum: Some(sum),
            min: Some(min),
            mean: Some(mean),
            max: Some(max),
            std,
        }
    }

    /// The statistic selected by `op`.
    pub fn get(&self, op: ReduceOp) -> Option<f64> {
        match op {
            ReduceOp::Count => Some(self.count as f64),
            ReduceOp::Sum => self.sum,
            ReduceOp::Min => self.min,
            ReduceOp::Max => self.max,
            ReduceOp::Mean => self.mean,
            ReduceOp::Std => self.std,
        }
    }
}

/// Statistics of `column` over `visits`.
pub fn summarize<'a, I>(visits: I, column: Column) -> Stats
where
    I: IntoIterator<Item = &'a CleanedVisit>,
{
    let visits: Vec<&CleanedVisit> = visits.into_iter().collect();
    let values = numeric_values(visits.iter().copied(), column);
    Stats::from_values(visits.len(), &values)
}

/// Reduce `column` with a built-in [`ReduceOp`].
///
/// Returns `None` when `op` needs values and `column` has no valid ones.
pub fn reduce<'a, I>(visits: I, column: Column, op: ReduceOp) -> Option<f64>
where
    I: IntoIterator<Item = &'a CleanedVisit>,
{
    summarize(visits, column).get(op)
}
