//! Row ordering for [`crate::types::DataSet`].

use std::cmp::Ordering;

use crate::error::PipelineResult;
use crate::types::{DataSet, Value};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// `Ascending` when `ascending` is true.
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending {
            Self::Ascending
        } else {
            Self::Descending
        }
    }
}

/// Returns a new [`DataSet`] with rows reordered by the values in `column`.
///
/// - The sort is stable: rows with equal keys keep their input order.
/// - Missing values sort last in both directions.
/// - Fails with [`crate::PipelineError::ColumnNotFound`] if `column` is absent.
pub fn sort(dataset: &DataSet, column: &str, order: SortOrder) -> PipelineResult<DataSet> {
    let idx = dataset.schema.require(column)?;

    let mut positions: Vec<usize> = (0..dataset.row_count()).collect();
    // `sort_by` is a stable merge sort.
    positions.sort_by(|&a, &b| {
        compare_nulls_last(
            dataset.rows[a].get(idx).unwrap_or(&Value::Null),
            dataset.rows[b].get(idx).unwrap_or(&Value::Null),
            order,
        )
    });

    Ok(dataset.take_rows(&positions))
}

fn compare_nulls_last(a: &Value, b: &Value, order: SortOrder) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match order {
            SortOrder::Ascending => a.total_cmp(b),
            SortOrder::Descending => b.total_cmp(a),
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{sort, SortOrder};
    use crate::error::PipelineError;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn date(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn sample_dataset() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("score", DataType::Float64),
            Field::new("date", DataType::Date),
        ]);
        DataSet::new(
            schema,
            vec![
                vec![Value::Int64(1), Value::Float64(5.0), date(2024, 1, 3)],
                vec![Value::Int64(2), Value::Null, date(2024, 1, 1)],
                vec![Value::Int64(3), Value::Float64(1.0), date(2024, 1, 2)],
                vec![Value::Int64(4), Value::Float64(5.0), date(2024, 1, 1)],
            ],
        )
    }

    fn ids(ds: &DataSet) -> Vec<i64> {
        ds.rows
            .iter()
            .map(|r| match r[0] {
                Value::Int64(v) => v,
                _ => panic!("id must be int"),
            })
            .collect()
    }

    #[test]
    fn ascending_sort_is_stable_with_nulls_last() {
        let out = sort(&sample_dataset(), "score", SortOrder::Ascending).unwrap();
        assert_eq!(ids(&out), vec![3, 1, 4, 2]);
    }

    #[test]
    fn descending_sort_keeps_ties_in_input_order_and_nulls_last() {
        let out = sort(&sample_dataset(), "score", SortOrder::Descending).unwrap();
        assert_eq!(ids(&out), vec![1, 4, 3, 2]);
    }

    #[test]
    fn sorts_by_date() {
        let ds = sample_dataset();
        let out = sort(&ds, "date", SortOrder::from_ascending(true)).unwrap();
        assert_eq!(ids(&out), vec![2, 4, 3, 1]);
        assert_eq!(out.row_count(), ds.row_count());
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = sort(&sample_dataset(), "nope", SortOrder::Ascending).unwrap_err();
        assert!(matches!(err, PipelineError::ColumnNotFound { column } if column == "nope"));
    }
}
