//! End-to-end run: clean, order, derive intervals, aggregate and bin.
//!
//! ```rust
//! use visit_analytics::config::PipelineConfig;
//! use visit_analytics::pipeline::Pipeline;
//!
//! let csv = "\
//! entry_date,exit_date,age,gender,department
//! 2021-03-01 08:00:00,2021-03-01 09:00:00,34,F,12
//! 2021-03-01 08:05:00,999,999,M,40
//! 2021-03-01 08:25:00,2021-03-01 08:55:00,61,F,12
//! ";
//! let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
//! let records = pipeline.loader().load(csv.as_bytes(), b',').unwrap();
//! let output = pipeline.run(&records).unwrap();
//!
//! assert_eq!(output.report.cleaning.retained, 3);
//! assert_eq!(output.report.intervals_seconds, vec![300, 1200]);
//! assert_eq!(output.report.age_histogram.total(), 2);
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::cleaning::FeatureExtractor;
use crate::columns::{Column, ColumnNameTable, ColumnResolver};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::execution::{ExecutionEngine, TracingExecutionObserver};
use crate::ingestion::{load_from_path, LoadOptions, LoaderOptions, RecordLoader, TracingObserver};
use crate::processing::{
    bin, bin_with_edges, deltas_seconds, AggregationTable, Aggregator, Filtered, GroupValue,
    HistogramSpec, SortedTimestamps,
};
use crate::types::{numeric_values, CleanedSet, CleanedVisit, CleaningReport, VisitRecord};

/// A resolved criterion: which column to split on and the values to keep.
#[derive(Debug, Clone, PartialEq)]
struct Criterion {
    column: Column,
    values: Vec<GroupValue>,
}

/// Hour and weekday histograms for one slice of the cleaned visits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CriterionView {
    Data {
        /// Criterion value, or `None` for the total view.
        value: Option<GroupValue>,
        count: usize,
        hour: HistogramSpec,
        weekday: HistogramSpec,
    },
    /// No visit carries this criterion value.
    NoData { value: GroupValue },
}

impl CriterionView {
    pub fn is_no_data(&self) -> bool {
        matches!(self, CriterionView::NoData { .. })
    }
}

/// Everything the reporting layer consumes from one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub language: String,
    pub cleaning: CleaningReport,
    /// Seconds between consecutive entries, in entry order.
    pub intervals_seconds: Vec<i64>,
    pub interval_histogram: HistogramSpec,
    pub hour_histogram: HistogramSpec,
    pub weekday_histogram: HistogramSpec,
    /// Valid ages only.
    pub age_histogram: HistogramSpec,
    pub duration_by_hour: AggregationTable,
    pub duration_by_weekday: AggregationTable,
    pub duration_by_department: AggregationTable,
    /// Localized name of the criterion column, when one is configured.
    pub criterion_column: Option<String>,
    pub views: Vec<CriterionView>,
}

impl PipelineReport {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> PipelineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Cleaned visits (ordered by entry, intervals attached) plus the report built from them.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub visits: CleanedSet,
    pub report: PipelineReport,
}

/// A validated configuration bound to its loader, cleaner and aggregator.
pub struct Pipeline {
    config: PipelineConfig,
    delimiter: u8,
    loader: RecordLoader,
    extractor: FeatureExtractor,
    aggregator: Aggregator,
    criterion: Option<Criterion>,
    load_options: LoadOptions,
    engine: Option<ExecutionEngine>,
}

impl Pipeline {
    /// Validate `config` and build the stages.
    ///
    /// Fails on an unsupported language, an invalid custom column table, a zero bin count or
    /// view limit, an unknown or non-groupable criterion column, or a criterion value that does
    /// not fit it.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        let delimiter = config.delimiter_byte()?;
        let bins = &config.bins;
        for count in [bins.hour, bins.weekday, bins.interval, bins.age] {
            if count == 0 {
                return Err(PipelineError::InvalidBinCount { bins: count });
            }
        }
        if config.criteria.max_views == 0 {
            return Err(PipelineError::InvalidConfig {
                message: "criteria.max_views must be > 0".to_string(),
            });
        }

        let table = ColumnNameTable::builtin().with_overrides(&config.column_names)?;
        let resolver = table.resolver(&config.language)?;
        let criterion = resolve_criterion(&config, &resolver)?;

        let loader = RecordLoader::new(
            resolver.clone(),
            LoaderOptions {
                duration_in_seconds: config.duration_in_seconds,
            },
        );
        let load_options = LoadOptions {
            delimiter,
            observer: Some(Arc::new(TracingObserver)),
            ..LoadOptions::default()
        };

        Ok(Self {
            extractor: FeatureExtractor::from_config(&config),
            aggregator: Aggregator::new(resolver),
            config,
            delimiter,
            loader,
            criterion,
            load_options,
            engine: None,
        })
    }

    /// Run cleaning and grouping on `engine`'s thread pool.
    ///
    /// An engine without an observer reports its runs through [`TracingExecutionObserver`].
    pub fn with_engine(mut self, engine: ExecutionEngine) -> Self {
        let engine = if engine.has_observer() {
            engine
        } else {
            engine.with_observer(Arc::new(TracingExecutionObserver))
        };
        self.engine = Some(engine);
        self
    }

    /// Replace the load options used by [`Pipeline::run_from_path`]. The delimiter stays the
    /// configured one.
    pub fn with_load_options(mut self, options: LoadOptions) -> Self {
        self.load_options = LoadOptions {
            delimiter: self.delimiter,
            ..options
        };
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn loader(&self) -> &RecordLoader {
        &self.loader
    }

    pub fn resolver(&self) -> &ColumnResolver {
        self.aggregator.resolver()
    }

    /// Load a delimited file and run it.
    pub fn run_from_path(&self, path: impl AsRef<Path>) -> PipelineResult<PipelineOutput> {
        let records = load_from_path(path, &self.loader, &self.load_options)?;
        self.run(&records)
    }

    /// Clean `records` and build every view the report carries.
    pub fn run(&self, records: &[VisitRecord]) -> PipelineResult<PipelineOutput> {
        let span = info_span!(
            "pipeline_run",
            language = self.resolver().language(),
            records = records.len()
        );
        let _guard = span.enter();

        let mut cleaned = match &self.engine {
            Some(engine) => engine.clean_parallel(&self.extractor, records),
            None => self.extractor.clean(records),
        };
        cleaned.sort_by_entry();
        if cleaned.is_empty() {
            warn!(loaded = cleaned.report.loaded, "no visit survived cleaning");
        }

        let bins = &self.config.bins;
        let visits = &cleaned.visits;

        let sorted = SortedTimestamps::from_visits(visits);
        let intervals_seconds = deltas_seconds(&sorted);
        let interval_values: Vec<f64> = intervals_seconds.iter().map(|s| *s as f64).collect();
        let interval_histogram = bin(&interval_values, bins.interval)?;

        let hour_histogram = bin(&numeric_values(visits, Column::Hour), bins.hour)?;
        let weekday_histogram = bin(&numeric_values(visits, Column::Weekday), bins.weekday)?;
        let age_histogram = bin(&numeric_values(visits, Column::Age), bins.age)?;

        let duration_by_hour = self.group_by(visits, Column::Hour)?;
        let duration_by_weekday = self.group_by(visits, Column::Weekday)?;
        let duration_by_department = self.group_by(visits, Column::Department)?;

        let views = self.views(visits, &hour_histogram, &weekday_histogram)?;

        info!(
            retained = cleaned.len(),
            intervals = intervals_seconds.len(),
            views = views.len(),
            "pipeline run finished"
        );

        let report = PipelineReport {
            language: self.resolver().language().to_string(),
            cleaning: cleaned.report,
            intervals_seconds,
            interval_histogram,
            hour_histogram,
            weekday_histogram,
            age_histogram,
            duration_by_hour,
            duration_by_weekday,
            duration_by_department,
            criterion_column: self
                .criterion
                .as_ref()
                .map(|c| self.resolver().name(c.column).to_string()),
            views,
        };
        Ok(PipelineOutput {
            visits: cleaned,
            report,
        })
    }

    fn group_by(&self, visits: &[CleanedVisit], column: Column) -> PipelineResult<AggregationTable> {
        match &self.engine {
            Some(engine) => engine.group_by_parallel(&self.aggregator, visits, &[column], Column::Duration),
            None => self.aggregator.group_by(visits, &[column], Column::Duration),
        }
    }

    fn views(
        &self,
        visits: &[CleanedVisit],
        hour_histogram: &HistogramSpec,
        weekday_histogram: &HistogramSpec,
    ) -> PipelineResult<Vec<CriterionView>> {
        let Some(criterion) = &self.criterion else {
            return Ok(vec![CriterionView::Data {
                value: None,
                count: visits.len(),
                hour: hour_histogram.clone(),
                weekday: weekday_histogram.clone(),
            }]);
        };

        let mut views = Vec::with_capacity(criterion.values.len());
        for value in &criterion.values {
            let matched = match self.aggregator.filter_by(visits, criterion.column, value)? {
                Filtered::Matches(matched) => matched,
                Filtered::NoData => {
                    info!(
                        column = self.resolver().name(criterion.column),
                        %value,
                        "criterion value matches no visit"
                    );
                    views.push(CriterionView::NoData {
                        value: value.clone(),
                    });
                    continue;
                }
            };

            let hours = numeric_values(matched.iter().copied(), Column::Hour);
            let weekdays = numeric_values(matched.iter().copied(), Column::Weekday);
            views.push(CriterionView::Data {
                value: Some(value.clone()),
                count: matched.len(),
                hour: self.bin_view(&hours, hour_histogram, self.config.bins.hour)?,
                weekday: self.bin_view(&weekdays, weekday_histogram, self.config.bins.weekday)?,
            });
        }
        Ok(views)
    }

    fn bin_view(&self, values: &[f64], full: &HistogramSpec, bin_count: usize) -> PipelineResult<HistogramSpec> {
        match full.edges() {
            Some(edges) if self.config.bins.comparable_edges => Ok(bin_with_edges(values, &edges)),
            _ => bin(values, bin_count),
        }
    }
}

fn resolve_criterion(config: &PipelineConfig, resolver: &ColumnResolver) -> PipelineResult<Option<Criterion>> {
    let criteria = &config.criteria;
    let Some(name) = criteria.column.as_deref() else {
        return Ok(None);
    };
    if criteria.values.is_empty() {
        debug!(column = name, "criterion column has no values; using the total view");
        return Ok(None);
    }

    let column = resolver.field_for(name)?;
    if !column.is_groupable() {
        return Err(PipelineError::NotGroupable {
            column: column.canonical_id().to_string(),
        });
    }
    if criteria.values.len() > criteria.max_views {
        info!(
            requested = criteria.values.len(),
            max_views = criteria.max_views,
            "limiting criterion views"
        );
    }

    let values = criteria
        .values
        .iter()
        .take(criteria.max_views)
        .map(|raw| GroupValue::parse(column, raw))
        .collect::<PipelineResult<Vec<_>>>()?;
    Ok(Some(Criterion { column, values }))
}
