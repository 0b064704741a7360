//! Missing-value handling.
//!
//! Column-type rules:
//!
//! - `mean` / `median` only touch numeric columns; missing values elsewhere are left as-is. An
//!   `Int64` column that receives a (possibly fractional) fill value becomes `Float64`.
//! - `mode` fills every column type. When several values are equally frequent, the lowest one
//!   wins.
//! - A column without any non-missing value is left unchanged.
//! - `drop` removes every row that has at least one missing value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{DataSet, DataType, OrdValue, Value};

use super::reduce::{reduce_values, ReduceOp};

/// How [`fill_missing_values`] treats missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum FillStrategy {
    Mean,
    Median,
    Mode,
    Drop,
}

impl FromStr for FillStrategy {
    type Err = PipelineError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "mode" => Ok(Self::Mode),
            "drop" => Ok(Self::Drop),
            _ => Err(PipelineError::UnsupportedStrategy {
                tag: tag.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for FillStrategy {
    type Error = PipelineError;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        tag.parse()
    }
}

impl fmt::Display for FillStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Mode => "mode",
            Self::Drop => "drop",
        })
    }
}

/// Returns a new [`DataSet`] with missing values filled (or rows dropped) per `strategy`.
pub fn fill_missing_values(dataset: &DataSet, strategy: FillStrategy) -> PipelineResult<DataSet> {
    if strategy == FillStrategy::Drop {
        let width = dataset.schema.len();
        return Ok(dataset.filter_rows(|row| row.len() >= width && !row.iter().any(Value::is_null)));
    }

    let mut schema = dataset.schema.clone();
    let mut fills: Vec<Option<Value>> = Vec::with_capacity(schema.len());

    for (idx, field) in schema.fields.iter_mut().enumerate() {
        let has_nulls = dataset.column_values(idx).any(Value::is_null);
        let fill = if !has_nulls {
            None
        } else {
            match strategy {
                FillStrategy::Mean | FillStrategy::Median if field.data_type.is_numeric() => {
                    let op = if strategy == FillStrategy::Mean {
                        ReduceOp::Mean
                    } else {
                        ReduceOp::Median
                    };
                    Some(reduce_values(
                        dataset.column_values(idx),
                        &field.name,
                        field.data_type,
                        op,
                    )?)
                }
                FillStrategy::Mode => Some(mode(dataset.column_values(idx))),
                _ => None,
            }
        };

        let fill = fill.filter(|v| !v.is_null());
        if fill.is_some() && field.data_type == DataType::Int64 && strategy != FillStrategy::Mode {
            field.data_type = DataType::Float64;
        }
        fills.push(fill);
    }

    let promoted: Vec<bool> = schema
        .fields
        .iter()
        .zip(&dataset.schema.fields)
        .map(|(new, old)| new.data_type != old.data_type)
        .collect();

    // Rows are rebuilt at schema width; short rows read as missing, extra cells are dropped.
    dataset.map_rows(schema, |row| {
        (0..fills.len())
            .map(|idx| match (row.get(idx).unwrap_or(&Value::Null), &fills[idx]) {
                (Value::Null, Some(fill)) => fill.clone(),
                (Value::Int64(i), _) if promoted[idx] => Value::Float64(*i as f64),
                (v, _) => v.clone(),
            })
            .collect()
    })
}

/// Most frequent non-null value; ties resolve to the lowest value.
fn mode<'a>(values: impl Iterator<Item = &'a Value>) -> Value {
    let mut counts: BTreeMap<OrdValue, usize> = BTreeMap::new();
    for v in values.filter(|v| !v.is_null()) {
        *counts.entry(OrdValue(v.clone())).or_insert(0) += 1;
    }

    let mut best: Option<(&OrdValue, usize)> = None;
    for (value, &count) in &counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.0.clone()).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::{fill_missing_values, FillStrategy};
    use crate::error::PipelineError;
    use crate::types::{DataSet, DataType, Field, Schema, Value};

    fn dataset_with_gaps() -> DataSet {
        let schema = Schema::new(vec![
            Field::new("name", DataType::Utf8),
            Field::new("score", DataType::Int64),
            Field::new("weight", DataType::Float64),
        ]);
        DataSet::new(
            schema,
            vec![
                vec![Value::Utf8("a".into()), Value::Int64(10), Value::Float64(1.0)],
                vec![Value::Null, Value::Null, Value::Float64(2.0)],
                vec![Value::Utf8("b".into()), Value::Int64(15), Value::Null],
                vec![Value::Utf8("b".into()), Value::Int64(20), Value::Float64(6.0)],
            ],
        )
    }

    #[test]
    fn mean_fills_numeric_columns_and_promotes_ints() {
        let out = fill_missing_values(&dataset_with_gaps(), FillStrategy::Mean).unwrap();
        assert_eq!(out.schema.fields[1].data_type, DataType::Float64);
        assert_eq!(out.rows[1][1], Value::Float64(15.0));
        assert_eq!(out.rows[0][1], Value::Float64(10.0));
        assert_eq!(out.rows[2][2], Value::Float64(3.0));
        // Text columns are not touched by mean.
        assert_eq!(out.rows[1][0], Value::Null);
    }

    #[test]
    fn short_rows_are_filled_at_schema_width() {
        let schema = Schema::new(vec![
            Field::new("name", DataType::Utf8),
            Field::new("score", DataType::Float64),
        ]);
        let ds = DataSet::new(
            schema,
            vec![
                vec![Value::Utf8("a".into()), Value::Float64(4.0)],
                vec![Value::Utf8("b".into())],
            ],
        );

        let out = fill_missing_values(&ds, FillStrategy::Mean).unwrap();
        assert_eq!(out.rows[1], vec![Value::Utf8("b".into()), Value::Float64(4.0)]);

        let dropped = fill_missing_values(&ds, FillStrategy::Drop).unwrap();
        assert_eq!(dropped.row_count(), 1);
    }

    #[test]
    fn median_uses_middle_values() {
        let out = fill_missing_values(&dataset_with_gaps(), FillStrategy::Median).unwrap();
        assert_eq!(out.rows[1][1], Value::Float64(15.0));
        assert_eq!(out.rows[2][2], Value::Float64(2.0));
    }

    #[test]
    fn mode_fills_every_type_and_breaks_ties_low() {
        let out = fill_missing_values(&dataset_with_gaps(), FillStrategy::Mode).unwrap();
        assert_eq!(out.rows[1][0], Value::Utf8("b".into()));
        // 10, 15, 20 are equally frequent: lowest wins, type preserved.
        assert_eq!(out.schema.fields[1].data_type, DataType::Int64);
        assert_eq!(out.rows[1][1], Value::Int64(10));
        assert_eq!(out.null_count(), 0);
    }

    #[test]
    fn drop_removes_rows_with_any_missing_value() {
        let ds = dataset_with_gaps();
        let out = fill_missing_values(&ds, FillStrategy::Drop).unwrap();
        assert_eq!(out.null_count(), 0);
        assert!(out.row_count() <= ds.row_count());
        assert_eq!(out.row_count(), 2);
    }

    #[test]
    fn no_missing_values_is_a_no_op() {
        let schema = Schema::new(vec![Field::new("score", DataType::Int64)]);
        let ds = DataSet::new(schema, vec![vec![Value::Int64(1)], vec![Value::Int64(2)]]);
        let out = fill_missing_values(&ds, FillStrategy::Mean).unwrap();
        assert_eq!(out, ds);
    }

    #[test]
    fn unknown_strategy_tag_is_rejected() {
        assert_eq!("Median".parse::<FillStrategy>().unwrap(), FillStrategy::Median);
        assert!(matches!(
            "zero".parse::<FillStrategy>(),
            Err(PipelineError::UnsupportedStrategy { tag }) if tag == "zero"
        ));
    }
}
