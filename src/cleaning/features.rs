//! Derived temporal features and the cleaning pass that attaches them.

use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::types::{
    Checked, CleanedSet, CleanedVisit, CleaningReport, DerivedFeatures, InvalidReason,
    RecordedDuration, SentinelSet, Timestamp, VisitRecord,
};

use super::datetime::DatetimeRepair;

/// Hour (0-23) and weekday (1-7, Monday = 1) of a valid timestamp.
pub fn hour_and_weekday(t: &NaiveDateTime) -> (u32, u32) {
    (t.hour(), t.weekday().number_from_monday())
}

/// Minutes between entry and exit. Either side invalid rejects the pair.
pub fn pair_duration(entry: &Timestamp, exit: &Timestamp) -> Checked<f64> {
    match (entry, exit) {
        (Checked::Valid(entry), Checked::Valid(exit)) if exit < entry => {
            Checked::Invalid(InvalidReason::Inverted)
        }
        (Checked::Valid(entry), Checked::Valid(exit)) => {
            Checked::Valid((*exit - *entry).num_milliseconds() as f64 / 60_000.0)
        }
        _ => Checked::Invalid(InvalidReason::Unpaired),
    }
}

/// Error-sentinel filter for a value paired with the entry timestamp.
///
/// The value is invalid when the entry is invalid or the value itself is a sentinel.
pub fn check_pair(value: &Checked<f64>, entry: &Timestamp, sentinels: &SentinelSet) -> Checked<f64> {
    if entry.is_valid() {
        sentinels.check_number(value)
    } else {
        Checked::Invalid(InvalidReason::Unpaired)
    }
}

/// Derives [`DerivedFeatures`] and filters records that cannot carry them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureExtractor {
    repair: DatetimeRepair,
}

impl FeatureExtractor {
    pub fn new(repair: DatetimeRepair) -> Self {
        Self { repair }
    }

    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(DatetimeRepair::from_config(cfg))
    }

    pub fn repair(&self) -> &DatetimeRepair {
        &self.repair
    }

    /// Features of a visit, or invalid when the entry timestamp is.
    ///
    /// A recorded duration takes precedence over the entry/exit pair. Its sentinel check sees
    /// the value in the unit the source wrote it in.
    pub fn extract(
        &self,
        entry: &Timestamp,
        exit: &Timestamp,
        recorded: Option<&RecordedDuration>,
    ) -> Checked<DerivedFeatures> {
        let entry_time = match entry {
            Checked::Valid(t) => t,
            Checked::Invalid(reason) => return Checked::Invalid(*reason),
        };
        let (hour, weekday) = hour_and_weekday(entry_time);

        let duration = match recorded {
            Some(recorded) => {
                let checked = RecordedDuration {
                    value: self.repair.sentinels().check_number(&recorded.value),
                    unit: recorded.unit,
                };
                match checked.to_minutes().value {
                    Checked::Valid(v) if v < 0.0 => Checked::Invalid(InvalidReason::Inverted),
                    other => other,
                }
            }
            None => pair_duration(entry, exit),
        };

        Checked::Valid(DerivedFeatures {
            hour,
            weekday,
            duration,
        })
    }

    /// Repair, extract and filter a batch of records.
    ///
    /// Records with an invalid entry timestamp are dropped. Records whose age, gender or
    /// department is a sentinel are kept with that field marked invalid. Every drop and mask is
    /// counted in the returned [`CleaningReport`].
    pub fn clean(&self, records: &[VisitRecord]) -> CleanedSet {
        let set = self.clean_rows(records, 0);
        let report = &set.report;
        info!(
            loaded = report.loaded,
            retained = report.retained,
            dropped = report.dropped_invalid_entry,
            invalid_age = report.invalid_age,
            invalid_exit = report.invalid_exit,
            "cleaned visit records"
        );
        set
    }

    /// [`FeatureExtractor::clean`] for one batch of a larger load, without the summary log.
    ///
    /// `first_row` is the load position of `records[0]`, used in per-row diagnostics.
    pub fn clean_rows(&self, records: &[VisitRecord], first_row: usize) -> CleanedSet {
        let sentinels = self.repair.sentinels();
        let mut report = CleaningReport {
            loaded: records.len(),
            ..CleaningReport::default()
        };
        let mut visits = Vec::with_capacity(records.len());

        for (offset, record) in records.iter().enumerate() {
            let row = first_row + offset;
            let (entry, exit) = self.repair.repair_pair(&record.entry_date, &record.exit_date);
            let features = match self.extract(&entry, &exit, record.duration.as_ref()) {
                Checked::Valid(f) => f,
                Checked::Invalid(reason) => {
                    debug!(row, ?reason, raw = %record.entry_date, "dropping visit with invalid entry date");
                    report.dropped_invalid_entry += 1;
                    continue;
                }
            };
            let Checked::Valid(entry_time) = entry else {
                continue;
            };

            let age = check_pair(&record.age, &entry, sentinels);
            let gender = sentinels.check_text(&record.gender);
            let department = sentinels.check_text(&record.department);

            report.invalid_exit += usize::from(!exit.is_valid());
            report.invalid_age += usize::from(!age.is_valid());
            report.invalid_gender += usize::from(!gender.is_valid());
            report.invalid_department += usize::from(!department.is_valid());
            report.invalid_duration += usize::from(!features.duration.is_valid());

            visits.push(CleanedVisit {
                entry: entry_time,
                exit,
                age,
                gender,
                department,
                features,
                interval: None,
            });
        }

        report.retained = visits.len();
        CleanedSet::new(visits, report)
    }
}
