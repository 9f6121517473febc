//! Structural coercion of raw rows into [`VisitRecord`]s.
//!
//! No date semantics live here: entry/exit stay raw strings for
//! [`crate::cleaning::DatetimeRepair`]. Numeric cells that do not parse become
//! [`Checked::Invalid`] instead of failing the load.

use tracing::debug;

use crate::columns::{Column, ColumnResolver};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{Checked, DurationUnit, InvalidReason, RecordedDuration, VisitRecord};

/// Columns a source must provide.
pub const REQUIRED_COLUMNS: [Column; 5] = [
    Column::EntryDate,
    Column::ExitDate,
    Column::Age,
    Column::Gender,
    Column::Department,
];

/// Options for [`RecordLoader`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderOptions {
    /// The source duration column is in seconds. Records are tagged with that unit and
    /// converted to minutes once, after sentinel codes have been checked against the value as
    /// written.
    pub duration_in_seconds: bool,
}

/// Position of each known column in a source header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    entry_date: usize,
    exit_date: usize,
    age: usize,
    gender: usize,
    department: usize,
    duration: Option<usize>,
}

/// Turns header + rows into typed visit records, addressing columns through a
/// [`ColumnResolver`].
#[derive(Debug, Clone)]
pub struct RecordLoader {
    resolver: ColumnResolver,
    options: LoaderOptions,
}

impl RecordLoader {
    pub fn new(resolver: ColumnResolver, options: LoaderOptions) -> Self {
        Self { resolver, options }
    }

    pub fn resolver(&self) -> &ColumnResolver {
        &self.resolver
    }

    /// Map header names (localized or canonical) to column positions.
    ///
    /// Headers that are not in the column table are ignored. Derived columns present in the
    /// source (hour, weekday, interval) are ignored too; they are always recomputed.
    pub fn layout<'h, I>(&self, headers: I) -> PipelineResult<HeaderLayout>
    where
        I: IntoIterator<Item = &'h str>,
    {
        let headers: Vec<&str> = headers.into_iter().collect();
        let mut positions: [Option<usize>; Column::ALL.len()] = [None; Column::ALL.len()];
        for (idx, header) in headers.iter().enumerate() {
            match self.resolver.field_for(header) {
                Ok(column) => {
                    let slot = &mut positions[column as usize];
                    if slot.is_none() {
                        *slot = Some(idx);
                    }
                }
                Err(_) => debug!(header = %header, "ignoring unknown source column"),
            }
        }

        let mut required = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, column) in required.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = positions[column as usize].ok_or_else(|| PipelineError::SchemaMismatch {
                message: format!(
                    "missing required column '{}'. headers={:?}",
                    self.resolver.name(column),
                    headers
                ),
            })?;
        }
        let [entry_date, exit_date, age, gender, department] = required;

        Ok(HeaderLayout {
            entry_date,
            exit_date,
            age,
            gender,
            department,
            duration: positions[Column::Duration as usize],
        })
    }

    /// Build one record from the cells of a row. Missing trailing cells read as empty.
    pub fn record(&self, layout: &HeaderLayout, cells: &[&str]) -> VisitRecord {
        let cell = |idx: usize| cells.get(idx).copied().unwrap_or("").trim();

        let duration = layout.duration.map(|idx| RecordedDuration {
            value: parse_number(cell(idx)),
            unit: if self.options.duration_in_seconds {
                DurationUnit::Seconds
            } else {
                DurationUnit::Minutes
            },
        });

        VisitRecord {
            entry_date: cell(layout.entry_date).to_string(),
            exit_date: cell(layout.exit_date).to_string(),
            age: parse_number(cell(layout.age)),
            gender: parse_category(cell(layout.gender)),
            department: parse_category(cell(layout.department)),
            duration,
        }
    }

    /// Load pre-split rows under `headers`.
    pub fn load_rows<H, I, R, C>(&self, headers: &[H], rows: I) -> PipelineResult<Vec<VisitRecord>>
    where
        H: AsRef<str>,
        I: IntoIterator<Item = R>,
        R: AsRef<[C]>,
        C: AsRef<str>,
    {
        let layout = self.layout(headers.iter().map(AsRef::as_ref))?;
        let records: Vec<VisitRecord> = rows
            .into_iter()
            .map(|row| {
                let cells: Vec<&str> = row.as_ref().iter().map(AsRef::as_ref).collect();
                self.record(&layout, &cells)
            })
            .collect();
        debug!(rows = records.len(), "loaded visit records");
        Ok(records)
    }
}

/// Convert recorded durations still in seconds to minutes.
///
/// Records already in minutes are left alone, so calling this twice does not double-convert.
pub fn convert_durations_to_minutes(records: &mut [VisitRecord]) {
    for record in records {
        if let Some(duration) = record.duration.as_mut() {
            *duration = duration.to_minutes();
        }
    }
}

fn parse_number(raw: &str) -> Checked<f64> {
    if raw.is_empty() {
        return Checked::Invalid(InvalidReason::Empty);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Checked::Valid(v),
        _ => Checked::Invalid(InvalidReason::Unparsable),
    }
}

fn parse_category(raw: &str) -> Checked<String> {
    if raw.is_empty() {
        Checked::Invalid(InvalidReason::Empty)
    } else {
        Checked::Valid(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{convert_durations_to_minutes, LoaderOptions, RecordLoader, REQUIRED_COLUMNS};
    use crate::columns::ColumnNameTable;
    use crate::types::{Checked, DurationUnit, InvalidReason};

    fn loader(language: &str, options: LoaderOptions) -> RecordLoader {
        RecordLoader::new(ColumnNameTable::builtin().resolver(language).unwrap(), options)
    }

    #[test]
    fn loads_localized_headers_in_any_order() {
        let l = loader("es", LoaderOptions::default());
        let headers = ["servicio", "edad", "sexo", "fecha_salida", "fecha_entrada"];
        let rows = vec![vec!["12", "34", "F", "2021-03-01 11:00", "2021-03-01 10:00"]];
        let records = l.load_rows(&headers, rows).unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.entry_date, "2021-03-01 10:00");
        assert_eq!(r.exit_date, "2021-03-01 11:00");
        assert_eq!(r.age, Checked::Valid(34.0));
        assert_eq!(r.gender, Checked::Valid("F".to_string()));
        assert_eq!(r.department, Checked::Valid("12".to_string()));
        assert_eq!(r.duration, None);
    }

    #[test]
    fn unparsable_and_empty_numbers_become_invalid() {
        let l = loader("en", LoaderOptions::default());
        let headers = ["entry_date", "exit_date", "age", "gender", "department"];
        let rows = vec![
            vec!["a", "b", "forty", "M", ""],
            vec!["a", "b", "", "M", "3"],
        ];
        let records = l.load_rows(&headers, rows).unwrap();

        assert_eq!(records[0].age, Checked::Invalid(InvalidReason::Unparsable));
        assert_eq!(records[0].department, Checked::Invalid(InvalidReason::Empty));
        assert_eq!(records[1].age, Checked::Invalid(InvalidReason::Empty));
    }

    #[test]
    fn short_rows_read_missing_cells_as_empty() {
        let l = loader("en", LoaderOptions::default());
        let headers = ["entry_date", "exit_date", "age", "gender", "department"];
        let records = l.load_rows(&headers, vec![vec!["2021-01-01 08:00"]]).unwrap();
        assert_eq!(records[0].exit_date, "");
        assert_eq!(records[0].gender, Checked::Invalid(InvalidReason::Empty));
    }

    #[test]
    fn missing_required_column_is_a_schema_mismatch() {
        let l = loader("es", LoaderOptions::default());
        let headers = ["fecha_entrada", "fecha_salida", "edad", "sexo"];
        let err = l.load_rows(&headers, Vec::<Vec<String>>::new()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("schema mismatch"));
        assert!(msg.contains("missing required column 'servicio'"));
    }

    #[test]
    fn each_required_column_is_enforced() {
        let l = loader("en", LoaderOptions::default());
        for missing in REQUIRED_COLUMNS {
            let headers: Vec<&str> = REQUIRED_COLUMNS
                .iter()
                .filter(|c| **c != missing)
                .map(|c| c.canonical_id())
                .collect();
            let err = l.layout(headers.iter().copied()).unwrap_err();
            assert!(err.to_string().contains(missing.canonical_id()), "{err}");
        }
        assert!(l.layout(REQUIRED_COLUMNS.iter().map(|c| c.canonical_id())).is_ok());
    }

    #[test]
    fn duration_in_seconds_is_converted_once() {
        let l = loader(
            "en",
            LoaderOptions {
                duration_in_seconds: true,
            },
        );
        let headers = ["entry_date", "exit_date", "age", "gender", "department", "duration"];
        let mut records = l
            .load_rows(&headers, vec![vec!["a", "b", "1", "F", "2", "1800"]])
            .unwrap();

        let d = records[0].duration.clone().unwrap();
        assert_eq!(d.unit, DurationUnit::Seconds);
        assert_eq!(d.value, Checked::Valid(1800.0));

        convert_durations_to_minutes(&mut records);
        convert_durations_to_minutes(&mut records);
        let d = records[0].duration.as_ref().unwrap();
        assert_eq!(d.unit, DurationUnit::Minutes);
        assert_eq!(d.value, Checked::Valid(30.0));
    }
}
