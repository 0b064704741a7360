//! CSV output.

use std::fs;
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, Value};

/// Write `dataset` as CSV: a header row, then one record per row.
///
/// Missing values become empty fields and dates are written as `YYYY-MM-DD`.
pub fn write_csv(dataset: &DataSet, path: impl AsRef<Path>) -> PipelineResult<()> {
    let bytes = to_csv_bytes(dataset)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn to_csv_bytes(dataset: &DataSet) -> PipelineResult<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(dataset.schema.field_names())?;

    let mut record: Vec<String> = Vec::with_capacity(dataset.schema.len());
    for row in &dataset.rows {
        record.clear();
        record.extend(row.iter().map(Value::to_string));
        wtr.write_record(&record)?;
    }

    wtr.into_inner()
        .map_err(|e| PipelineError::Io(e.into_error()))
}
