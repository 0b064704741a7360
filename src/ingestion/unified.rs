//! Unified ingestion entrypoint.
//!
//! Most callers should use [`ingest_from_path`], which ingests a file into an in-memory
//! [`crate::types::DataSet`] using a provided [`crate::types::Schema`], or [`load`], which infers
//! the schema from the file when none is declared.
//!
//! The format is always an explicit [`FileFormat`] tag; it is never guessed from the file
//! extension or contents.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, Schema};

use super::{csv, excel};

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum FileFormat {
    /// Comma-separated values (`csv`).
    Csv,
    /// Excel workbook (`xlsx`).
    Xlsx,
}

impl FileFormat {
    /// The tag accepted by [`FileFormat::from_str`].
    pub fn tag(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }
}

impl FromStr for FileFormat {
    type Err = PipelineError;

    /// Parse a format tag (case-insensitive).
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            _ => Err(PipelineError::UnsupportedFormat {
                tag: tag.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for FileFormat {
    type Error = PipelineError;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        tag.parse()
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// How to choose sheet(s) when ingesting an Excel workbook.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcelSheetSelection {
    /// Ingest the first sheet (default).
    First,
    /// Ingest a single named sheet.
    Sheet(String),
    /// Ingest all sheets and concatenate rows.
    AllSheets,
    /// Ingest only the listed sheets (in order) and concatenate rows.
    Sheets(Vec<String>),
}

impl Default for ExcelSheetSelection {
    fn default() -> Self {
        Self::First
    }
}

impl ExcelSheetSelection {
    /// The sheet used for schema inference: the named/first listed sheet, else the first one.
    fn inference_sheet(&self) -> Option<&str> {
        match self {
            Self::First | Self::AllSheets => None,
            Self::Sheet(name) => Some(name.as_str()),
            Self::Sheets(names) => names.first().map(|s| s.as_str()),
        }
    }
}

/// Options controlling unified ingestion behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IngestionOptions {
    /// Input format tag.
    pub format: FileFormat,
    /// Excel-specific options; ignored for CSV.
    #[serde(rename = "sheets")]
    pub excel_sheet_selection: ExcelSheetSelection,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            format: FileFormat::Xlsx,
            excel_sheet_selection: ExcelSheetSelection::default(),
        }
    }
}

impl IngestionOptions {
    /// Options for `format` with default sheet selection.
    pub fn new(format: FileFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }
}

/// Unified ingestion entry point for path-based sources with a declared schema.
///
/// Every schema field must be present in the file's header row (column order may differ).
///
/// # Examples
///
/// ```no_run
/// use data_pipeline::ingestion::{ingest_from_path, FileFormat, IngestionOptions};
/// use data_pipeline::types::{DataType, Field, Schema};
///
/// # fn main() -> Result<(), data_pipeline::PipelineError> {
/// let schema = Schema::new(vec![
///     Field::new("Name", DataType::Utf8),
///     Field::new("Score", DataType::Int64),
///     Field::new("Date", DataType::Date),
/// ]);
///
/// let ds = ingest_from_path("scores.csv", &schema, &IngestionOptions::new(FileFormat::Csv))?;
/// println!("rows={}", ds.row_count());
/// # Ok(())
/// # }
/// ```
pub fn ingest_from_path(
    path: impl AsRef<Path>,
    schema: &Schema,
    options: &IngestionOptions,
) -> PipelineResult<DataSet> {
    let path = path.as_ref();
    schema.validate()?;

    match options.format {
        FileFormat::Csv => csv::ingest_csv_from_path(path, schema),
        FileFormat::Xlsx => ingest_excel_dispatch(path, schema, &options.excel_sheet_selection),
    }
}

/// Infer a [`Schema`] from the file's header row and cell values.
pub fn infer_schema_from_path(
    path: impl AsRef<Path>,
    options: &IngestionOptions,
) -> PipelineResult<Schema> {
    let path = path.as_ref();
    match options.format {
        FileFormat::Csv => csv::infer_csv_schema_from_path(path),
        FileFormat::Xlsx => excel::infer_excel_schema_from_path(
            path,
            options.excel_sheet_selection.inference_sheet(),
        ),
    }
}

/// Load a file, using `schema` when given and inferring one otherwise.
pub fn load(
    path: impl AsRef<Path>,
    schema: Option<&Schema>,
    options: &IngestionOptions,
) -> PipelineResult<DataSet> {
    let path = path.as_ref();
    match schema {
        Some(schema) => ingest_from_path(path, schema, options),
        None => {
            let inferred = infer_schema_from_path(path, options)?;
            ingest_from_path(path, &inferred, options)
        }
    }
}

/// Load a file given a format tag (`"xlsx"` or `"csv"`), inferring the schema.
///
/// Fails with [`PipelineError::UnsupportedFormat`] for any other tag.
pub fn load_data(path: impl AsRef<Path>, format: &str) -> PipelineResult<DataSet> {
    let format: FileFormat = format.parse()?;
    load(path, None, &IngestionOptions::new(format))
}

fn ingest_excel_dispatch(
    path: &Path,
    schema: &Schema,
    sel: &ExcelSheetSelection,
) -> PipelineResult<DataSet> {
    match sel {
        ExcelSheetSelection::First => excel::ingest_excel_from_path(path, None, schema),
        ExcelSheetSelection::Sheet(name) => {
            excel::ingest_excel_from_path(path, Some(name.as_str()), schema)
        }
        ExcelSheetSelection::AllSheets => excel::ingest_excel_workbook_from_path(path, None, schema),
        ExcelSheetSelection::Sheets(names) => {
            let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
            excel::ingest_excel_workbook_from_path(path, Some(refs.as_slice()), schema)
        }
    }
}

/// An owned description of one input: where it lives, how to read it, and optionally its schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IngestionRequest {
    /// Path to the input file.
    pub path: PathBuf,
    /// Declared schema; inferred from the file when `None`.
    #[serde(default)]
    pub schema: Option<Schema>,
    /// Options controlling ingestion.
    #[serde(flatten)]
    pub options: IngestionOptions,
}

impl IngestionRequest {
    /// Request for `path` in `format` with an inferred schema.
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            schema: None,
            options: IngestionOptions::new(format),
        }
    }

    /// Execute the request by calling [`load`].
    pub fn run(&self) -> PipelineResult<DataSet> {
        load(&self.path, self.schema.as_ref(), &self.options)
    }
}
