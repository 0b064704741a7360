//! Serializing a [`crate::types::DataSet`] back to disk.
//!
//! Writers build the whole file in memory and only then replace the target path, so a failed
//! write never leaves a half-written file behind. Existing files are overwritten. No row-index
//! column is written.
//!
//! - [`excel`]: `xlsx` workbook with a single `Sheet1`
//! - [`csv`]: comma-separated values with a header row

pub mod csv;
pub mod excel;

use std::path::Path;

use crate::error::PipelineResult;
use crate::ingestion::FileFormat;
use crate::types::DataSet;

pub use self::csv::write_csv;
pub use self::excel::write_xlsx;

/// Write `dataset` to `path` in `format`.
pub fn write_to_path(
    dataset: &DataSet,
    path: impl AsRef<Path>,
    format: FileFormat,
) -> PipelineResult<()> {
    match format {
        FileFormat::Xlsx => write_xlsx(dataset, path),
        FileFormat::Csv => write_csv(dataset, path),
    }
}
