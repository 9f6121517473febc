//! Core data model types for visit records.
//!
//! Loading produces [`VisitRecord`]s whose error-prone fields are [`Checked`] values. Cleaning
//! turns them into [`CleanedVisit`]s with [`DerivedFeatures`] attached, collected in a
//! [`CleanedSet`] together with a [`CleaningReport`] of what was dropped or masked.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::columns::Column;

/// A single typed cell value, as exposed to aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing or invalid value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
    /// Repaired date-time.
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

/// Why a field carries no usable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// The raw cell was empty.
    Empty,
    /// The raw cell (or one of its numeric components) equals a configured sentinel code.
    Sentinel(i64),
    /// The raw cell could not be parsed.
    Unparsable,
    /// An exit time lies before its entry time.
    Inverted,
    /// A value derived from two fields lost one of its inputs.
    Unpaired,
}

/// A field value that is either usable or explicitly marked invalid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Checked<T> {
    Valid(T),
    Invalid(InvalidReason),
}

impl<T> Checked<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Checked::Valid(_))
    }

    pub fn valid(&self) -> Option<&T> {
        match self {
            Checked::Valid(v) => Some(v),
            Checked::Invalid(_) => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Checked::Valid(v) => Some(v),
            Checked::Invalid(_) => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> Checked<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Checked::Valid(v) => Checked::Valid(f(v)),
            Checked::Invalid(reason) => Checked::Invalid(reason),
        }
    }

    /// Reason the value is invalid, if it is.
    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            Checked::Valid(_) => None,
            Checked::Invalid(reason) => Some(*reason),
        }
    }
}

/// A parsed timestamp or the invalid marker.
pub type Timestamp = Checked<NaiveDateTime>;

/// Configured codes meaning "not recorded".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SentinelSet {
    codes: BTreeSet<i64>,
}

impl Default for SentinelSet {
    fn default() -> Self {
        Self::new([999])
    }
}

impl SentinelSet {
    pub fn new(codes: impl IntoIterator<Item = i64>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn contains(&self, code: i64) -> bool {
        self.codes.contains(&code)
    }

    /// The sentinel equal to `value`, if `value` is integral and configured.
    pub fn match_number(&self, value: f64) -> Option<i64> {
        if !value.is_finite() || value.fract() != 0.0 {
            return None;
        }
        let code = value as i64;
        self.contains(code).then_some(code)
    }

    /// The sentinel equal to the whole trimmed text, read as a number.
    pub fn match_text(&self, raw: &str) -> Option<i64> {
        raw.trim()
            .parse::<f64>()
            .ok()
            .and_then(|v| self.match_number(v))
    }

    /// The first sentinel found among the digit runs of `raw`.
    ///
    /// Digit runs after a decimal point inside a time (`10:00:00.999`) are fractional seconds
    /// and are not checked.
    pub fn match_component(&self, raw: &str) -> Option<i64> {
        let bytes = raw.as_bytes();
        let mut start = None;
        for i in 0..=bytes.len() {
            let is_digit = bytes.get(i).is_some_and(u8::is_ascii_digit);
            match (start, is_digit) {
                (None, true) => start = Some(i),
                (Some(s), false) => {
                    start = None;
                    let fractional = s > 0 && bytes[s - 1] == b'.' && raw[..s].contains(':');
                    if fractional {
                        continue;
                    }
                    if let Some(code) = raw[s..i].parse::<i64>().ok().filter(|c| self.contains(*c)) {
                        return Some(code);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Mark a loaded number invalid when it equals a sentinel.
    pub fn check_number(&self, value: &Checked<f64>) -> Checked<f64> {
        match value {
            Checked::Valid(v) => match self.match_number(*v) {
                Some(code) => Checked::Invalid(InvalidReason::Sentinel(code)),
                None => Checked::Valid(*v),
            },
            Checked::Invalid(reason) => Checked::Invalid(*reason),
        }
    }

    /// Mark a loaded categorical value invalid when it reads as a sentinel.
    pub fn check_text(&self, value: &Checked<String>) -> Checked<String> {
        match value {
            Checked::Valid(v) => match self.match_text(v) {
                Some(code) => Checked::Invalid(InvalidReason::Sentinel(code)),
                None => Checked::Valid(v.clone()),
            },
            Checked::Invalid(reason) => Checked::Invalid(*reason),
        }
    }
}

/// Unit a recorded duration is currently expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationUnit {
    Seconds,
    Minutes,
}

/// A duration value read from the source file, tagged with its unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedDuration {
    pub value: Checked<f64>,
    pub unit: DurationUnit,
}

impl RecordedDuration {
    /// Express the duration in minutes. Already-converted values are returned unchanged.
    pub fn to_minutes(&self) -> Self {
        match self.unit {
            DurationUnit::Minutes => self.clone(),
            DurationUnit::Seconds => Self {
                value: self.value.clone().map(|s| s / 60.0),
                unit: DurationUnit::Minutes,
            },
        }
    }
}

/// One loaded row. Dates stay raw until repaired.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitRecord {
    pub entry_date: String,
    pub exit_date: String,
    pub age: Checked<f64>,
    pub gender: Checked<String>,
    pub department: Checked<String>,
    /// Present only when the source carries a duration column.
    pub duration: Option<RecordedDuration>,
}

/// Temporal features derived for a cleaned visit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedFeatures {
    /// Hour of entry, 0-23.
    pub hour: u32,
    /// Day of entry, 1-7 with Monday = 1.
    pub weekday: u32,
    /// Length of stay in minutes.
    pub duration: Checked<f64>,
}

/// A visit that survived cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedVisit {
    pub entry: NaiveDateTime,
    pub exit: Checked<NaiveDateTime>,
    pub age: Checked<f64>,
    pub gender: Checked<String>,
    pub department: Checked<String>,
    pub features: DerivedFeatures,
    /// Minutes since the previous visit; set once visits are ordered by entry time.
    pub interval: Option<f64>,
}

impl CleanedVisit {
    /// Cell value for a canonical column.
    pub fn value(&self, column: Column) -> Value {
        match column {
            Column::EntryDate => Value::Timestamp(self.entry),
            Column::ExitDate => self.exit.valid().map_or(Value::Null, |t| Value::Timestamp(*t)),
            Column::Age => self.age.valid().map_or(Value::Null, |v| Value::Float64(*v)),
            Column::Gender => self.gender.valid().map_or(Value::Null, |v| Value::Utf8(v.clone())),
            Column::Department => self
                .department
                .valid()
                .map_or(Value::Null, |v| Value::Utf8(v.clone())),
            Column::Weekday => Value::Int64(i64::from(self.features.weekday)),
            Column::Hour => Value::Int64(i64::from(self.features.hour)),
            Column::Duration => self
                .features
                .duration
                .valid()
                .map_or(Value::Null, |v| Value::Float64(*v)),
            Column::Interval => self.interval.map_or(Value::Null, Value::Float64),
        }
    }
}

/// Counts of rows dropped or fields masked during cleaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    /// Rows handed to cleaning.
    pub loaded: usize,
    /// Rows kept.
    pub retained: usize,
    /// Rows dropped because the entry timestamp was invalid.
    pub dropped_invalid_entry: usize,
    /// Retained rows whose exit timestamp was invalid.
    pub invalid_exit: usize,
    /// Retained rows whose age was invalid (sentinel, empty or unparsable).
    pub invalid_age: usize,
    /// Retained rows whose gender was invalid.
    pub invalid_gender: usize,
    /// Retained rows whose department was invalid.
    pub invalid_department: usize,
    /// Retained rows without a usable duration.
    pub invalid_duration: usize,
}

impl CleaningReport {
    /// Add the counts of another batch.
    pub fn merge(&mut self, other: &CleaningReport) {
        self.loaded += other.loaded;
        self.retained += other.retained;
        self.dropped_invalid_entry += other.dropped_invalid_entry;
        self.invalid_exit += other.invalid_exit;
        self.invalid_age += other.invalid_age;
        self.invalid_gender += other.invalid_gender;
        self.invalid_department += other.invalid_department;
        self.invalid_duration += other.invalid_duration;
    }
}

/// Cleaned visits plus the cleaning diagnostics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CleanedSet {
    pub visits: Vec<CleanedVisit>,
    pub report: CleaningReport,
}

impl CleanedSet {
    pub fn new(visits: Vec<CleanedVisit>, report: CleaningReport) -> Self {
        Self { visits, report }
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    /// Valid numeric values of `column`, in visit order.
    pub fn numeric_values(&self, column: Column) -> Vec<f64> {
        numeric_values(&self.visits, column)
    }

    /// Order visits by entry time and attach the interval since each visit's predecessor.
    ///
    /// The sort is stable, so visits sharing an entry time keep their load order.
    pub fn sort_by_entry(&mut self) {
        self.visits.sort_by_key(|v| v.entry);
        let mut previous: Option<NaiveDateTime> = None;
        for visit in &mut self.visits {
            let entry = visit.entry;
            visit.interval = previous.map(|p| (entry - p).num_milliseconds() as f64 / 60_000.0);
            previous = Some(entry);
        }
    }
}

/// Valid numeric values of `column` across `visits`.
pub fn numeric_values<'a, I>(visits: I, column: Column) -> Vec<f64>
where
    I: IntoIterator<Item = &'a CleanedVisit>,
{
    visits
        .into_iter()
        .filter_map(|v| v.value(column).as_f64())
        .collect()
}
