//! Row filtering for [`crate::types::DataSet`].

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, Value};

use super::expr::{Expr, Predicate};

/// Returns a new [`DataSet`] containing only rows for which `predicate` returns `true`.
///
/// This is a convenience wrapper around [`DataSet::filter_rows`].
pub fn filter<F>(dataset: &DataSet, predicate: F) -> DataSet
where
    F: FnMut(&[Value]) -> bool,
{
    dataset.filter_rows(predicate)
}

/// Returns a new [`DataSet`] containing only rows matching a bound [`Predicate`].
///
/// Fails with [`PipelineError::InvalidExpression`] if the predicate was bound against a
/// different schema.
pub fn filter_predicate(dataset: &DataSet, predicate: &Predicate) -> PipelineResult<DataSet> {
    if predicate.schema() != &dataset.schema {
        return Err(PipelineError::invalid_expression(
            "predicate was bound against a different schema",
        ));
    }
    Ok(dataset.filter_rows(|row| predicate.matches(row)))
}

/// Parse `expression`, bind it to the dataset schema, and filter.
///
/// ```rust
/// use data_pipeline::processing::filter_expr;
/// use data_pipeline::types::{DataSet, DataType, Field, Schema, Value};
///
/// let schema = Schema::new(vec![Field::new("Score", DataType::Int64)]);
/// let ds = DataSet::new(schema, vec![vec![Value::Int64(70)], vec![Value::Int64(90)]]);
/// let out = filter_expr(&ds, "Score > 80").unwrap();
/// assert_eq!(out.rows, vec![vec![Value::Int64(90)]]);
/// ```
pub fn filter_expr(dataset: &DataSet, expression: &str) -> PipelineResult<DataSet> {
    let predicate = Expr::parse(expression)?.bind(&dataset.schema)?;
    filter_predicate(dataset, &predicate)
}
