//! CSV loading.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::PipelineResult;
use crate::types::VisitRecord;

use super::loader::RecordLoader;

/// Load a delimited file with a header row into [`VisitRecord`]s.
///
/// Rules:
///
/// - The file must have headers, named in the loader's language or canonically.
/// - Headers must contain every required column (order can differ).
/// - Rows may be shorter than the header; missing cells read as empty.
pub fn load_csv_from_path(
    path: impl AsRef<Path>,
    loader: &RecordLoader,
    delimiter: u8,
) -> PipelineResult<Vec<VisitRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)?;
    load_csv_from_reader(&mut rdr, loader)
}

/// Load records from an existing CSV reader.
pub fn load_csv_from_reader<R: Read>(
    rdr: &mut csv::Reader<R>,
    loader: &RecordLoader,
) -> PipelineResult<Vec<VisitRecord>> {
    let headers = rdr.headers()?.clone();
    let layout = loader.layout(headers.iter())?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let cells: Vec<&str> = row.iter().collect();
        records.push(loader.record(&layout, &cells));
    }
    debug!(rows = records.len(), "loaded visit records from csv");
    Ok(records)
}

impl RecordLoader {
    /// Load delimited text (header row first) from any reader.
    pub fn load<R: Read>(&self, input: R, delimiter: u8) -> PipelineResult<Vec<VisitRecord>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(input);
        load_csv_from_reader(&mut rdr, self)
    }
}
