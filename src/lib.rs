//! `data-pipeline` loads a spreadsheet (`xlsx`) or `csv` file into an in-memory
//! [`types::DataSet`], runs it through a fixed sequence of table-to-table stages, writes the
//! result back out and renders a line chart of two of its columns.
//!
//! ```text
//! load → sort → filter → fill missing → transform column → aggregate → merge? → write, plot
//! ```
//!
//! Each stage is also usable on its own; [`pipeline::Pipeline`] wires them together from a
//! [`config::PipelineConfig`].
//!
//! ## Loading
//!
//! The input format is always an explicit tag (`xlsx` or `csv`); any other tag fails with
//! [`PipelineError::UnsupportedFormat`]. The schema is either declared or inferred from the
//! header row and cell values.
//!
//! ```no_run
//! use data_pipeline::ingestion::load_data;
//!
//! # fn main() -> Result<(), data_pipeline::PipelineError> {
//! let ds = load_data("data/input_data.xlsx", "xlsx")?;
//! println!("columns={:?} rows={}", ds.schema.field_names().collect::<Vec<_>>(), ds.row_count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Processing
//!
//! ```rust
//! use data_pipeline::processing::{
//!     aggregate, apply_transform, fill_missing_values, filter_expr, sort, AggregationSpec,
//!     ColumnTransform, FillStrategy, ReduceOp, SortOrder,
//! };
//! use data_pipeline::types::{DataSet, DataType, Field, Schema, Value};
//!
//! let schema = Schema::new(vec![
//!     Field::new("Name", DataType::Utf8),
//!     Field::new("Score", DataType::Int64),
//! ]);
//! let ds = DataSet::new(
//!     schema,
//!     vec![
//!         vec![Value::Utf8("A".into()), Value::Int64(90)],
//!         vec![Value::Utf8("A".into()), Value::Null],
//!         vec![Value::Utf8("B".into()), Value::Int64(60)],
//!     ],
//! );
//!
//! let ds = sort(&ds, "Score", SortOrder::Descending).unwrap();
//! let ds = fill_missing_values(&ds, FillStrategy::Mean).unwrap();
//! let ds = filter_expr(&ds, "Score >= 75").unwrap();
//! let ds = apply_transform(ds, "Score", &ColumnTransform::Offset { amount: 10.0 }).unwrap();
//! let spec = AggregationSpec::new().with("Score", ReduceOp::Mean);
//! let out = aggregate(&ds, "Name", &spec).unwrap();
//!
//! // A: (90 + 10 + 75 + 10) / 2
//! assert_eq!(out.rows, vec![vec![Value::Utf8("A".into()), Value::Float64(92.5)]]);
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: format-tagged loading with declared or inferred schemas
//! - [`processing`]: sort, filter, fill, transform, aggregate, merge, reduce
//! - [`output`]: `xlsx` / `csv` writers
//! - [`plot`]: PNG line charts and the optional viewer
//! - [`config`] / [`pipeline`]: the configured end-to-end run
//! - [`observability`]: stage observers and alert severities
//! - [`types`]: schema + in-memory dataset types
//! - [`error`]: the error type shared by every stage

pub mod config;
pub mod error;
pub mod ingestion;
pub mod observability;
pub mod output;
pub mod pipeline;
pub mod plot;
pub mod processing;
pub mod types;

pub use error::{PipelineError, PipelineResult};
