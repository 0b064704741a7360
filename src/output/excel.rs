//! Excel (`xlsx`) output via `rust_xlsxwriter`.

use std::fs;
use std::path::Path;

use chrono::Datelike;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};

use crate::error::PipelineResult;
use crate::types::{DataSet, Value};

/// Sheet name used for the single output worksheet.
pub const SHEET_NAME: &str = "Sheet1";

const DATE_FORMAT: &str = "yyyy-mm-dd";

/// Write `dataset` to an `xlsx` workbook at `path`, replacing any existing file.
///
/// Cell mapping:
/// - `Int64` / `Float64` → number cells (non-finite floats are left empty)
/// - `Bool` → boolean cells
/// - `Utf8` → string cells
/// - `Date` → date cells formatted `yyyy-mm-dd`
/// - `Null` → empty cells
///
/// The header row is bold. Fails with [`crate::PipelineError::Io`] if `path` is not writable.
pub fn write_xlsx(dataset: &DataSet, path: impl AsRef<Path>) -> PipelineResult<()> {
    let bytes = to_xlsx_bytes(dataset)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub(crate) fn to_xlsx_bytes(dataset: &DataSet) -> PipelineResult<Vec<u8>> {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name(SHEET_NAME)?;

    let header = Format::new().set_bold();
    let date = Format::new().set_num_format(DATE_FORMAT);

    for (col, name) in dataset.schema.field_names().enumerate() {
        ws.write_string_with_format(0, col_index(col)?, name, &header)?;
    }

    for (r, row) in dataset.rows.iter().enumerate() {
        let r = row_index(r + 1)?;
        for (c, value) in row.iter().enumerate() {
            write_cell(ws, r, col_index(c)?, value, &date)?;
        }
    }

    Ok(wb.save_to_buffer()?)
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    date_format: &Format,
) -> Result<(), XlsxError> {
    match value {
        Value::Null => {}
        Value::Int64(v) => {
            ws.write_number(row, col, *v as f64)?;
        }
        Value::Float64(v) if v.is_finite() => {
            ws.write_number(row, col, *v)?;
        }
        Value::Float64(_) => {}
        Value::Bool(v) => {
            ws.write_boolean(row, col, *v)?;
        }
        Value::Utf8(s) => {
            ws.write_string(row, col, s)?;
        }
        Value::Date(d) => {
            let year = u16::try_from(d.year()).map_err(|_| XlsxError::DateTimeRangeError(d.to_string()))?;
            let dt = ExcelDateTime::from_ymd(year, d.month() as u8, d.day() as u8)?;
            ws.write_datetime_with_format(row, col, &dt, date_format)?;
        }
    }
    Ok(())
}

fn row_index(idx: usize) -> Result<u32, XlsxError> {
    u32::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}

fn col_index(idx: usize) -> Result<u16, XlsxError> {
    u16::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}
