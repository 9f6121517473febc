//! Execution engine for running the cleaning and grouping stages with configurable parallelism.
//!
//! This module sits "above" [`crate::cleaning`] and [`crate::processing`] and provides:
//!
//! - Parallel (chunked) cleaning of loaded records
//! - Parallel per-group statistics
//! - Resource limits / throttling (in-flight chunks)
//! - Real-time metrics + observer hooks for monitoring
//!
//! Results are identical to the sequential [`FeatureExtractor::clean`] and
//! [`Aggregator::group_by`].

mod observer;
mod semaphore;

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::cleaning::FeatureExtractor;
use crate::columns::Column;
use crate::error::{PipelineError, PipelineResult};
use crate::processing::{partition, summarize, AggregationTable, Aggregator, GroupRow};
use crate::types::{CleanedSet, CleanedVisit, CleaningReport, VisitRecord};

pub use observer::{
    ExecutionEvent, ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionObserver, ExecutionTask,
    TracingExecutionObserver,
};

use semaphore::Semaphore;

/// Configuration for the [`ExecutionEngine`].
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Number of worker threads used by the engine.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Number of records per cleaning chunk.
    pub chunk_size: usize,
    /// Upper bound on concurrently cleaned chunks.
    ///
    /// This is an additional throttle on top of `num_threads`.
    pub max_in_flight_chunks: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = available_parallelism();
        Self {
            num_threads: Some(n),
            chunk_size: 4_096,
            max_in_flight_chunks: n,
        }
    }
}

/// A configurable execution engine for cleaning and grouping visits.
pub struct ExecutionEngine {
    pool: ThreadPool,
    opts: ExecutionOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
    metrics: Arc<ExecutionMetrics>,
}

impl ExecutionEngine {
    /// Create a new engine with the given options.
    ///
    /// Fails with [`PipelineError::InvalidConfig`] if `chunk_size`, `max_in_flight_chunks` or
    /// `num_threads` is zero, or the thread pool cannot be built.
    pub fn new(opts: ExecutionOptions) -> PipelineResult<Self> {
        if opts.chunk_size == 0 || opts.max_in_flight_chunks == 0 || opts.num_threads == Some(0) {
            return Err(PipelineError::InvalidConfig {
                message: format!("execution options must be non-zero: {opts:?}"),
            });
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(opts.num_threads.unwrap_or_else(available_parallelism))
            .build()
            .map_err(|e| PipelineError::InvalidConfig {
                message: format!("failed to build thread pool: {e}"),
            })?;

        Ok(Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(ExecutionMetrics::new()),
        })
    }

    /// Attach an observer for execution events (metrics/logging).
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    /// Get a handle to real-time execution metrics.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Clean `records` in parallel chunks. Visit order and report match the sequential pass.
    pub fn clean_parallel(&self, extractor: &FeatureExtractor, records: &[VisitRecord]) -> CleanedSet {
        self.pool.install(|| self.clean_parallel_impl(extractor, records))
    }

    fn clean_parallel_impl(&self, extractor: &FeatureExtractor, records: &[VisitRecord]) -> CleanedSet {
        let start = self.begin(ExecutionTask::Clean);

        let sem = Semaphore::new(self.opts.max_in_flight_chunks);
        let per_chunk: Vec<CleanedSet> = chunk_ranges(records.len(), self.opts.chunk_size)
            .into_par_iter()
            .map(|range| {
                let waited = sem.acquire();
                if waited > Duration::ZERO {
                    self.metrics.on_throttle_wait(waited);
                    self.emit(ExecutionEvent::ThrottleWaited { duration: waited });
                }

                self.metrics.on_chunk_start();
                self.emit(ExecutionEvent::ChunkStarted {
                    start_row: range.start,
                    row_count: range.len(),
                });

                let start_row = range.start;
                let out = extractor.clean_rows(&records[range], start_row);
                self.metrics.on_rows_processed(out.report.loaded);

                self.emit(ExecutionEvent::ChunkFinished {
                    retained: out.len(),
                });
                self.metrics.on_chunk_end();
                sem.release();
                out
            })
            .collect();

        let mut report = CleaningReport::default();
        let mut visits = Vec::with_capacity(records.len());
        for chunk in per_chunk {
            report.merge(&chunk.report);
            visits.extend(chunk.visits);
        }

        self.finish(ExecutionTask::Clean, start);
        CleanedSet::new(visits, report)
    }

    /// [`Aggregator::group_by`] with each group's statistics computed on the pool.
    pub fn group_by_parallel(
        &self,
        aggregator: &Aggregator,
        visits: &[CleanedVisit],
        group_columns: &[Column],
        value: Column,
    ) -> PipelineResult<AggregationTable> {
        let groups: Vec<_> = partition(visits, group_columns)?.into_iter().collect();

        let start = self.begin(ExecutionTask::GroupBy);
        let rows: Vec<GroupRow> = self.pool.install(|| {
            groups
                .into_par_iter()
                .map(|(key, members)| {
                    let stats = summarize(members.iter().copied(), value);
                    self.metrics.on_rows_processed(members.len());
                    self.metrics.on_group_finished();
                    self.emit(ExecutionEvent::GroupFinished {
                        rows: members.len(),
                    });
                    GroupRow { key, stats }
                })
                .collect()
        });
        self.finish(ExecutionTask::GroupBy, start);

        Ok(aggregator.table(group_columns, value, rows))
    }

    fn begin(&self, task: ExecutionTask) -> Instant {
        self.metrics.begin_run();
        self.emit(ExecutionEvent::RunStarted { task });
        Instant::now()
    }

    fn finish(&self, task: ExecutionTask, start: Instant) {
        let elapsed = start.elapsed();
        self.metrics.end_run(elapsed);
        self.emit(ExecutionEvent::RunFinished {
            task,
            elapsed,
            metrics: self.metrics.snapshot(),
        });
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

fn chunk_ranges(row_count: usize, chunk_size: usize) -> Vec<Range<usize>> {
    (0..row_count)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(row_count))
        .collect()
}
