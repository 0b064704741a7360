//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`load`] / [`ingest_from_path`] (from [`unified`]) which:
//!
//! - dispatch on an explicit [`FileFormat`] tag (`xlsx` or `csv`)
//! - validate cells against a declared [`crate::types::Schema`], or infer one from the file
//! - produce an in-memory [`crate::types::DataSet`]
//!
//! Empty cells and the text markers in [`MISSING_TOKENS`] (`NA`, `N/A`, `NaN`, `null`, ...) load
//! as [`crate::types::Value::Null`] in both formats.
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`excel`]

pub mod csv;
pub mod excel;
pub(crate) mod infer;
pub mod unified;

pub use infer::MISSING_TOKENS;
pub use unified::{
    infer_schema_from_path, ingest_from_path, load, load_data, ExcelSheetSelection, FileFormat,
    IngestionOptions, IngestionRequest,
};
