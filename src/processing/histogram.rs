//! Equal-width histogram binning.

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};

/// Ascending bin edges; `n + 1` edges describe `n` bins.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BinEdges(Vec<f64>);

impl BinEdges {
    /// `bin_count` equal-width bins spanning the finite values.
    ///
    /// Returns `Ok(None)` when there are no finite values. A degenerate range (all values
    /// equal) is widened by 0.5 on each side.
    pub fn spanning(values: &[f64], bin_count: usize) -> PipelineResult<Option<Self>> {
        if bin_count == 0 {
            return Err(PipelineError::InvalidBinCount { bins: bin_count });
        }

        let mut finite = values.iter().copied().filter(|v| v.is_finite());
        let Some(first) = finite.next() else {
            return Ok(None);
        };
        let (mut lo, mut hi) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bin_count as f64;
        let mut edges: Vec<f64> = if width.is_finite() {
            (0..bin_count).map(|k| lo + k as f64 * width).collect()
        } else {
            // Range wider than f64::MAX: interpolate so no intermediate overflows.
            (0..bin_count)
                .map(|k| {
                    let t = k as f64 / bin_count as f64;
                    lo * (1.0 - t) + hi * t
                })
                .collect()
        };
        edges.push(hi);
        Ok(Some(Self(edges)))
    }

    /// Use caller-provided edges, e.g. those of a full dataset.
    pub fn from_edges(edges: Vec<f64>) -> PipelineResult<Self> {
        if edges.len() < 2 {
            return Err(PipelineError::InvalidBinCount {
                bins: edges.len().saturating_sub(1),
            });
        }
        let ascending = edges.iter().all(|e| e.is_finite()) && edges.windows(2).all(|w| w[0] < w[1]);
        if !ascending {
            return Err(PipelineError::InvalidConfig {
                message: format!("bin edges must be finite and strictly ascending: {edges:?}"),
            });
        }
        Ok(Self(edges))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn bin_count(&self) -> usize {
        self.0.len() - 1
    }

    /// Bin of `value`: bins are closed on the left, the last one on both sides.
    fn index_of(&self, value: f64) -> Option<usize> {
        let first = self.0[0];
        let last = self.0[self.0.len() - 1];
        if !(first..=last).contains(&value) {
            return None;
        }
        let idx = self.0.partition_point(|e| *e <= value).saturating_sub(1);
        Some(idx.min(self.bin_count() - 1))
    }
}

/// One histogram bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower_edge: f64,
    pub upper_edge: f64,
    pub count: usize,
}

/// Ordered bins with their counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistogramSpec {
    pub bins: Vec<HistogramBin>,
    /// Finite values that fell outside caller-provided edges.
    pub out_of_range: usize,
}

impl HistogramSpec {
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Upper edge of each bin.
    pub fn upper_edges(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.upper_edge).collect()
    }

    pub fn counts(&self) -> Vec<usize> {
        self.bins.iter().map(|b| b.count).collect()
    }

    /// Number of binned values.
    pub fn total(&self) -> usize {
        self.bins.iter().map(|b| b.count).sum()
    }

    /// The edges this histogram was built on, for binning other views comparably.
    pub fn edges(&self) -> Option<BinEdges> {
        let first = self.bins.first()?;
        let mut edges = vec![first.lower_edge];
        edges.extend(self.bins.iter().map(|b| b.upper_edge));
        Some(BinEdges(edges))
    }
}

/// Bin `values` into `bin_count` equal-width bins over their own range.
///
/// Non-finite values are ignored. Empty input gives an empty histogram.
pub fn bin(values: &[f64], bin_count: usize) -> PipelineResult<HistogramSpec> {
    Ok(match BinEdges::spanning(values, bin_count)? {
        Some(edges) => bin_with_edges(values, &edges),
        None => HistogramSpec::default(),
    })
}

/// Bin `values` on fixed `edges`. Empty input gives an empty histogram.
pub fn bin_with_edges(values: &[f64], edges: &BinEdges) -> HistogramSpec {
    let mut finite = values.iter().copied().filter(|v| v.is_finite()).peekable();
    if finite.peek().is_none() {
        return HistogramSpec::default();
    }

    let mut counts = vec![0usize; edges.bin_count()];
    let mut out_of_range = 0;
    for v in finite {
        match edges.index_of(v) {
            Some(idx) => counts[idx] += 1,
            None => out_of_range += 1,
        }
    }

    let bins = edges
        .0
        .windows(2)
        .zip(counts)
        .map(|(w, count)| HistogramBin {
            lower_edge: w[0],
            upper_edge: w[1],
            count,
        })
        .collect();
    HistogramSpec { bins, out_of_range }
}
