//! Excel ingestion implementation.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, Schema, Value};

use super::infer::{
    empty_schema_error, excel_serial_to_date, header_name, is_missing_str, parse_bool_str,
    parse_date_str, schema_from_observed, widen,
};

type Workbook = Xlsx<BufReader<File>>;

/// Ingest an `xlsx` workbook into an in-memory `DataSet`.
///
/// The file is always read as `xlsx`, whatever its extension.
///
/// Behavior:
/// - Picks `sheet_name` if provided; otherwise uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Validates that all schema fields exist as headers
/// - Reads remaining rows and converts cells into typed `Value`s
pub fn ingest_excel_from_path(
    path: impl AsRef<Path>,
    sheet_name: Option<&str>,
    schema: &Schema,
) -> PipelineResult<DataSet> {
    match sheet_name {
        Some(name) => ingest_excel_workbook_from_path(path, Some(&[name][..]), schema),
        None => {
            let mut workbook = open_xlsx(path)?;
            let first = first_sheet_name(&workbook.sheet_names())?;
            let range = sheet_range(&mut workbook, &first)?;
            let rows = ingest_sheet_range(&first, &range, schema)?;
            Ok(DataSet::new(schema.clone(), rows))
        }
    }
}

/// Ingest multiple sheets from an Excel workbook and concatenate all rows into one `DataSet`.
///
/// - If `sheet_names` is `None`, ingests **all sheets** in workbook order.
/// - If `sheet_names` is `Some(&[...])`, ingests only those sheets (in the provided order).
///
/// All tabs must share the same header schema.
pub fn ingest_excel_workbook_from_path(
    path: impl AsRef<Path>,
    sheet_names: Option<&[&str]>,
    schema: &Schema,
) -> PipelineResult<DataSet> {
    let mut workbook = open_xlsx(path)?;

    let sheets: Vec<String> = match sheet_names {
        Some(names) => names.iter().map(|s| s.to_string()).collect(),
        None => workbook.sheet_names().to_vec(),
    };
    if sheets.is_empty() {
        return Err(PipelineError::SchemaMismatch {
            message: "workbook has no sheets".to_string(),
        });
    }

    let mut all_rows: Vec<Vec<Value>> = Vec::new();
    for sheet in sheets {
        let range = sheet_range(&mut workbook, &sheet)?;
        let mut sheet_rows = ingest_sheet_range(&sheet, &range, schema)?;
        all_rows.append(&mut sheet_rows);
    }

    Ok(DataSet::new(schema.clone(), all_rows))
}

/// Infer a [`Schema`] from one sheet of a workbook (the first sheet when `sheet_name` is `None`).
pub fn infer_excel_schema_from_path(
    path: impl AsRef<Path>,
    sheet_name: Option<&str>,
) -> PipelineResult<Schema> {
    let mut workbook = open_xlsx(path)?;
    let sheet = match sheet_name {
        Some(name) => name.to_string(),
        None => first_sheet_name(&workbook.sheet_names())?,
    };
    let range = sheet_range(&mut workbook, &sheet)?;

    let (header_row_idx, headers) =
        find_header_row(&range).map_err(|e| wrap_schema_err_with_sheet(&sheet, e))?;

    let mut types: Vec<Option<DataType>> = vec![None; headers.len()];
    for row in range.rows().skip(header_row_idx + 1) {
        for (slot, cell) in types.iter_mut().zip(row.iter()) {
            if let Some(observed) = classify_cell(cell) {
                *slot = Some(widen(*slot, observed));
            }
        }
    }

    schema_from_observed(headers, types).map_err(|e| wrap_schema_err_with_sheet(&sheet, e))
}

fn open_xlsx(path: impl AsRef<Path>) -> PipelineResult<Workbook> {
    open_workbook(path).map_err(|e| PipelineError::Excel(calamine::Error::Xlsx(e)))
}

fn sheet_range(workbook: &mut Workbook, sheet: &str) -> PipelineResult<calamine::Range<Data>> {
    workbook
        .worksheet_range(sheet)
        .map_err(|e| PipelineError::Excel(calamine::Error::Xlsx(e)))
}

fn first_sheet_name(names: &[String]) -> PipelineResult<String> {
    names
        .first()
        .cloned()
        .ok_or_else(|| PipelineError::SchemaMismatch {
            message: "workbook has no sheets".to_string(),
        })
}

fn ingest_sheet_range(
    sheet: &str,
    range: &calamine::Range<Data>,
    schema: &Schema,
) -> PipelineResult<Vec<Vec<Value>>> {
    let (header_row_idx, col_idxs) = build_header_projection(range, schema)
        .map_err(|e| wrap_schema_err_with_sheet(sheet, e))?;

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (idx0, row) in range.rows().enumerate() {
        if idx0 <= header_row_idx {
            continue;
        }

        // Report 1-based row number (Excel-like).
        let user_row = idx0 + 1;

        let mut out_row: Vec<Value> = Vec::with_capacity(schema.fields.len());
        for (field, &col_idx) in schema.fields.iter().zip(col_idxs.iter()) {
            let cell = row.get(col_idx).unwrap_or(&Data::Empty);
            let col_label = format!("{sheet}:{name}", name = field.name);
            out_row.push(convert_cell(user_row, &col_label, field.data_type, cell)?);
        }
        rows.push(out_row);
    }

    Ok(rows)
}

fn wrap_schema_err_with_sheet(sheet: &str, err: PipelineError) -> PipelineError {
    match err {
        PipelineError::SchemaMismatch { message } => PipelineError::SchemaMismatch {
            message: format!("sheet '{sheet}': {message}"),
        },
        other => other,
    }
}

fn find_header_row(range: &calamine::Range<Data>) -> PipelineResult<(usize, Vec<String>)> {
    range
        .rows()
        .enumerate()
        .find(|(_, row)| row.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|(idx0, row)| {
            let headers = row
                .iter()
                .enumerate()
                .map(|(i, c)| header_name(&cell_to_header_string(c), i))
                .collect();
            (idx0, headers)
        })
        .ok_or_else(empty_schema_error)
}

fn build_header_projection(
    range: &calamine::Range<Data>,
    schema: &Schema,
) -> PipelineResult<(usize, Vec<usize>)> {
    let (header_row_idx, header_cells) = find_header_row(range)?;

    // Build a projection of schema field -> column index by searching header_cells.
    let mut col_idxs: Vec<usize> = Vec::with_capacity(schema.fields.len());
    for f in &schema.fields {
        match header_cells.iter().position(|h| *h == f.name) {
            Some(idx) => col_idxs.push(idx),
            None => {
                return Err(PipelineError::SchemaMismatch {
                    message: format!(
                        "missing required column '{}'. headers={:?}",
                        f.name, header_cells
                    ),
                });
            }
        }
    }

    Ok((header_row_idx, col_idxs))
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(f) => f.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => "".to_string(),
    }
}

/// Spreadsheet cells carry their own type; text cells stay text.
fn classify_cell(c: &Data) -> Option<DataType> {
    match c {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if is_missing_str(s) => None,
        Data::Int(_) => Some(DataType::Int64),
        Data::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(DataType::Int64),
        Data::Float(_) => Some(DataType::Float64),
        Data::Bool(_) => Some(DataType::Bool),
        Data::DateTime(_) | Data::DateTimeIso(_) => Some(DataType::Date),
        Data::String(_) | Data::DurationIso(_) => Some(DataType::Utf8),
    }
}

fn convert_cell(row: usize, column: &str, data_type: DataType, c: &Data) -> PipelineResult<Value> {
    match c {
        Data::Empty | Data::Error(_) => return Ok(Value::Null),
        Data::String(s) if is_missing_str(s) => return Ok(Value::Null),
        _ => {}
    }

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(cell_to_string(c))),
        DataType::Bool => parse_bool_cell(row, column, c).map(Value::Bool),
        DataType::Int64 => parse_i64_cell(row, column, c).map(Value::Int64),
        DataType::Float64 => parse_f64_cell(row, column, c).map(Value::Float64),
        DataType::Date => parse_date_cell(row, column, c).map(Value::Date),
    }
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        _ => c.to_string(),
    }
}

fn cell_error(row: usize, column: &str, c: &Data, message: impl Into<String>) -> PipelineError {
    PipelineError::ParseError {
        row,
        column: column.to_string(),
        raw: c.to_string(),
        message: message.into(),
    }
}

fn parse_bool_cell(row: usize, column: &str, c: &Data) -> PipelineResult<bool> {
    match c {
        Data::Bool(b) => Ok(*b),
        Data::Int(i) => Ok(*i != 0),
        Data::Float(f) => Ok(*f != 0.0),
        Data::String(s) => parse_bool_str(s).map_err(|message| cell_error(row, column, c, message)),
        _ => Err(cell_error(row, column, c, "expected bool")),
    }
}

fn parse_i64_cell(row: usize, column: &str, c: &Data) -> PipelineResult<i64> {
    match c {
        Data::Int(i) => Ok(*i),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                Ok(*f as i64)
            } else {
                Err(cell_error(
                    row,
                    column,
                    c,
                    "expected integer (got non-integer float)",
                ))
            }
        }
        Data::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| cell_error(row, column, c, e.to_string())),
        _ => Err(cell_error(row, column, c, "expected integer")),
    }
}

fn parse_f64_cell(row: usize, column: &str, c: &Data) -> PipelineResult<f64> {
    match c {
        Data::Float(f) => Ok(*f),
        Data::Int(i) => Ok(*i as f64),
        Data::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| cell_error(row, column, c, e.to_string())),
        _ => Err(cell_error(row, column, c, "expected number")),
    }
}

fn parse_date_cell(row: usize, column: &str, c: &Data) -> PipelineResult<chrono::NaiveDate> {
    let parsed = match c {
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::Float(f) => excel_serial_to_date(*f),
        Data::Int(i) => excel_serial_to_date(*i as f64),
        Data::DateTimeIso(s) | Data::String(s) => parse_date_str(s),
        _ => None,
    };
    parsed.ok_or_else(|| cell_error(row, column, c, "expected date"))
}
