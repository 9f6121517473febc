//! Observed, path-based loading.
//!
//! [`load_from_path`] reads a delimited file through [`super::csv`] and reports
//! success/failure/alerts to an optional [`LoadObserver`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::types::VisitRecord;

use super::csv::load_csv_from_path;
use super::loader::RecordLoader;
use super::observability::{LoadContext, LoadObserver, LoadSeverity, LoadStats};

/// Options controlling path-based loading.
#[derive(Clone)]
pub struct LoadOptions {
    /// Field delimiter.
    pub delimiter: u8,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn LoadObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: LoadSeverity,
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("delimiter", &(self.delimiter as char))
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            observer: None,
            alert_at_or_above: LoadSeverity::Critical,
        }
    }
}

/// Load a visit file, reporting the outcome to `options.observer`.
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with row stats
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
pub fn load_from_path(
    path: impl AsRef<Path>,
    loader: &RecordLoader,
    options: &LoadOptions,
) -> PipelineResult<Vec<VisitRecord>> {
    let path = path.as_ref();
    let ctx = LoadContext {
        path: path.to_path_buf(),
        delimiter: options.delimiter,
    };

    let result = load_csv_from_path(path, loader, options.delimiter);

    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(records) => obs.on_success(
                &ctx,
                LoadStats {
                    rows: records.len(),
                    empty_dates: records
                        .iter()
                        .filter(|r| r.entry_date.is_empty() || r.exit_date.is_empty())
                        .count(),
                },
            ),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(&ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }

    result
}

fn severity_for_error(e: &PipelineError) -> LoadSeverity {
    match e {
        PipelineError::Io(_) => LoadSeverity::Critical,
        PipelineError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => LoadSeverity::Critical,
            _ => LoadSeverity::Error,
        },
        _ => LoadSeverity::Error,
    }
}

/// An owned load request, for callers that queue work.
#[derive(Clone)]
pub struct LoadRequest {
    pub path: PathBuf,
    pub loader: RecordLoader,
    pub options: LoadOptions,
}

impl fmt::Debug for LoadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadRequest")
            .field("path", &self.path)
            .field("language", &self.loader.resolver().language())
            .field("options", &self.options)
            .finish()
    }
}

impl LoadRequest {
    /// Execute the request by calling [`load_from_path`].
    pub fn run(&self) -> PipelineResult<Vec<VisitRecord>> {
        load_from_path(&self.path, &self.loader, &self.options)
    }
}
