use std::sync::{Arc, Mutex};

use visit_analytics::columns::ColumnNameTable;
use visit_analytics::ingestion::{
    load_from_path, CompositeObserver, LoadContext, LoadObserver, LoadOptions, LoadRequest,
    LoadSeverity, LoadStats, LoaderOptions, RecordLoader,
};
use visit_analytics::PipelineError;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<LoadStats>>,
    failures: Mutex<Vec<LoadSeverity>>,
    alerts: Mutex<Vec<LoadSeverity>>,
}

impl LoadObserver for RecordingObserver {
    fn on_success(&self, _ctx: &LoadContext, stats: LoadStats) {
        self.successes.lock().unwrap().push(stats);
    }

    fn on_failure(&self, _ctx: &LoadContext, severity: LoadSeverity, _error: &PipelineError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &LoadContext, severity: LoadSeverity, _error: &PipelineError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn loader(language: &str) -> RecordLoader {
    RecordLoader::new(
        ColumnNameTable::builtin().resolver(language).unwrap(),
        LoaderOptions::default(),
    )
}

#[test]
fn observer_receives_success_with_stats() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = LoadOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    };

    let records = load_from_path("tests/fixtures/visits.csv", &loader("en"), &opts).unwrap();

    let successes = obs.successes.lock().unwrap().clone();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].rows, records.len());
    assert_eq!(successes[0].empty_dates, 1);
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = LoadOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: LoadSeverity::Critical,
        ..Default::default()
    };

    // Missing file -> Io error -> Critical
    let _ = load_from_path("tests/fixtures/does_not_exist.csv", &loader("en"), &opts).unwrap_err();

    let failures = obs.failures.lock().unwrap().clone();
    let alerts = obs.alerts.lock().unwrap().clone();
    assert_eq!(failures, vec![LoadSeverity::Critical]);
    assert_eq!(alerts, vec![LoadSeverity::Critical]);
}

#[test]
fn observer_receives_failure_without_alert_for_non_critical_error() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = LoadOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: LoadSeverity::Critical,
        ..Default::default()
    };

    // English headers read under the Spanish table -> schema mismatch -> Error, no alert
    let err = load_from_path("tests/fixtures/visitas_es.csv", &loader("en"), &opts).unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch { .. }));

    let failures = obs.failures.lock().unwrap().clone();
    assert_eq!(failures, vec![LoadSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn alert_threshold_can_be_lowered() {
    let obs = Arc::new(RecordingObserver::default());
    let opts = LoadOptions {
        delimiter: b';',
        observer: Some(obs.clone()),
        alert_at_or_above: LoadSeverity::Error,
    };

    let _ = load_from_path("tests/fixtures/visitas_es.csv", &loader("en"), &opts).unwrap_err();
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![LoadSeverity::Error]);
}

#[test]
fn composite_observer_fans_out_and_request_runs() {
    let a = Arc::new(RecordingObserver::default());
    let b = Arc::new(RecordingObserver::default());
    let observers: Vec<Arc<dyn LoadObserver>> = vec![a.clone(), b.clone()];
    let composite: Arc<dyn LoadObserver> = Arc::new(CompositeObserver::new(observers));

    let request = LoadRequest {
        path: "tests/fixtures/visitas_es.csv".into(),
        loader: loader("es"),
        options: LoadOptions {
            delimiter: b';',
            observer: Some(composite),
            ..Default::default()
        },
    };
    let records = request.run().unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(a.successes.lock().unwrap().len(), 1);
    assert_eq!(b.successes.lock().unwrap().len(), 1);
}
