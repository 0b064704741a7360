//! In-memory table-to-table transformations.
//!
//! Every stage takes a [`crate::types::DataSet`], validates its parameters against the schema
//! before touching any row, and returns a new dataset (or fails with a single
//! [`crate::PipelineError`]).
//!
//! - [`sort()`]: stable single-column sort, missing values last
//! - [`filter_expr()`] / [`filter()`]: row filtering by expression or closure
//! - [`fill_missing_values()`]: mean/median/mode fill or row drop
//! - [`transform_column()`] / [`apply_transform()`]: per-column value rewrite
//! - [`aggregate()`]: group-by with per-column reductions
//! - [`merge()`]: inner/left/right/outer join on one key column
//! - [`reduce()`]: whole-column reductions
//!
//! ## Example: sort → filter → transform → aggregate
//!
//! ```rust
//! use data_pipeline::processing::{
//!     aggregate, apply_transform, filter_expr, sort, AggregationSpec, ColumnTransform, ReduceOp,
//!     SortOrder,
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
//!         vec![Value::Utf8("A".into()), Value::Int64(70)],
//!         vec![Value::Utf8("A".into()), Value::Int64(90)],
//!         vec![Value::Utf8("B".into()), Value::Int64(100)],
//!     ],
//! );
//!
//! let sorted = sort(&ds, "Score", SortOrder::Descending).unwrap();
//! let filtered = filter_expr(&sorted, "Score > 80").unwrap();
//! let doubled = apply_transform(filtered, "Score", &ColumnTransform::Scale { factor: 2.0 }).unwrap();
//! let spec = AggregationSpec::new().with("Score", ReduceOp::Sum);
//! let totals = aggregate(&doubled, "Name", &spec).unwrap();
//!
//! assert_eq!(totals.rows[0], vec![Value::Utf8("A".into()), Value::Float64(180.0)]);
//! assert_eq!(totals.rows[1], vec![Value::Utf8("B".into()), Value::Float64(200.0)]);
//! ```

pub mod aggregate;
pub mod expr;
pub mod fill;
pub mod filter;
pub mod merge;
pub mod reduce;
pub mod sort;
pub mod transform;

pub use aggregate::{aggregate, AggregationSpec};
pub use expr::{Expr, Predicate};
pub use fill::{fill_missing_values, FillStrategy};
pub use filter::{filter, filter_expr, filter_predicate};
pub use merge::{merge, JoinKind};
pub use reduce::{reduce, ReduceOp};
pub use sort::{sort, SortOrder};
pub use transform::{apply_transform, transform_column, ColumnTransform};
